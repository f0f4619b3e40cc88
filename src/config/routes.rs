use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{Route, POINT_UNASSIGNED};

/// Last Pingfeng post numbered the same on both routes; the half route
/// branches off after it and rejoins the full route further on
pub const PF_SPLIT_POINT: i8 = 2;

/// Full route waypoints between the split and the rejoin that the half route has no counterpart for
pub const PF_DETOUR_LENGTH: i8 = 2;

/// Waypoint names for one route, index 0 is the start and the last entry the destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteWaypoints {
    pub route: Route,
    pub waypoints: Vec<String>,
}

/// File layout of `data/routes.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RouteCatalogFile {
    routes: Vec<RouteWaypoints>,
}

/// Waypoint tables for every route
#[derive(Debug, Clone)]
pub struct RouteCatalog {
    routes: HashMap<Route, Vec<String>>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for RouteCatalog {
    fn default() -> Self {
        let mut routes = HashMap::new();
        routes.insert(Route::Zh, names(&["Start", "CP1", "CP2", "Finish"]));
        // The half route takes its own CP2 and rejoins the full route at CP5
        routes.insert(
            Route::PfHalf,
            names(&["Start", "CP1", "Half CP2", "CP5", "Finish"]),
        );
        routes.insert(
            Route::PfAll,
            names(&["Start", "CP1", "CP2", "CP3", "CP4", "CP5", "Finish"]),
        );
        routes.insert(Route::MgsHalf, names(&["Start", "CP1", "CP2", "Finish"]));
        routes.insert(
            Route::MgsAll,
            names(&["Start", "CP1", "CP2", "CP3", "CP4", "Finish"]),
        );
        Self { routes }
    }
}

impl RouteCatalog {
    /// Load waypoint tables from a JSON file; routes missing from the file keep their defaults
    pub fn load_from_file(path: &str) -> crate::error::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::error::WalkError::ConfigLoad {
                path: path.to_string(),
                source: e,
            })?;

        let file: RouteCatalogFile =
            serde_json::from_str(&content).map_err(|e| crate::error::WalkError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;

        let mut catalog = Self::default();
        for entry in file.routes {
            if entry.waypoints.len() < 2 {
                return Err(crate::error::WalkError::ConfigValidation {
                    message: format!(
                        "route {} needs at least a start and a destination",
                        entry.route.key()
                    ),
                });
            }
            if entry.waypoints.len() > i8::MAX as usize {
                return Err(crate::error::WalkError::ConfigValidation {
                    message: format!("route {} has too many waypoints", entry.route.key()),
                });
            }
            catalog.routes.insert(entry.route, entry.waypoints);
        }
        Ok(catalog)
    }

    /// Index of the route's last waypoint
    pub fn destination(&self, route: Route) -> i8 {
        self.routes
            .get(&route)
            .map(|w| w.len().saturating_sub(1) as i8)
            .unwrap_or(0)
    }

    pub fn contains_point(&self, route: Route, point: i8) -> bool {
        (0..=self.destination(route)).contains(&point)
    }

    /// Post number of an admin stationed at `waypoint` of `route`.
    ///
    /// Pingfeng admins use the full route numbering, so a half route waypoint
    /// after the split is numbered as the full route waypoint it shares.
    pub fn admin_point(&self, route: Route, waypoint: i8) -> i8 {
        if route == Route::PfHalf && waypoint > PF_SPLIT_POINT {
            waypoint + PF_DETOUR_LENGTH
        } else {
            waypoint
        }
    }

    /// Display name of a waypoint
    pub fn point_name(&self, route: Route, point: i8) -> String {
        if point == POINT_UNASSIGNED {
            return "Not started".to_string();
        }
        usize::try_from(point)
            .ok()
            .and_then(|i| self.routes.get(&route).and_then(|w| w.get(i)))
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_destinations() {
        let catalog = RouteCatalog::default();
        assert_eq!(catalog.destination(Route::Zh), 3);
        assert_eq!(catalog.destination(Route::PfHalf), 4);
        assert_eq!(catalog.destination(Route::PfAll), 6);
        assert_eq!(catalog.destination(Route::MgsAll), 5);
    }

    #[test]
    fn test_point_names() {
        let catalog = RouteCatalog::default();
        assert_eq!(catalog.point_name(Route::Zh, -1), "Not started");
        assert_eq!(catalog.point_name(Route::Zh, 0), "Start");
        assert_eq!(catalog.point_name(Route::Zh, 3), "Finish");
        assert_eq!(catalog.point_name(Route::Zh, 9), "Unknown");
        assert_eq!(catalog.point_name(Route::Zh, -4), "Unknown");
    }

    #[test]
    fn test_pingfeng_half_posts_use_full_numbering() {
        let catalog = RouteCatalog::default();
        assert_eq!(catalog.admin_point(Route::PfHalf, 1), 1);
        assert_eq!(catalog.admin_point(Route::PfHalf, 2), 2);
        assert_eq!(catalog.admin_point(Route::PfHalf, 3), 5);
        assert_eq!(catalog.admin_point(Route::PfHalf, 4), 6);
        assert_eq!(catalog.admin_point(Route::PfAll, 3), 3);
        assert_eq!(catalog.admin_point(Route::Zh, 3), 3);
        // Rejoined waypoints carry the same name on both routes
        assert_eq!(
            catalog.point_name(Route::PfHalf, 3),
            catalog.point_name(Route::PfAll, catalog.admin_point(Route::PfHalf, 3))
        );
    }

    #[test]
    fn test_load_overrides_single_route() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        std::fs::write(
            &path,
            r#"{"routes": [{"route": 1, "waypoints": ["Gate", "Lake", "Hill", "Library", "Gate"]}]}"#,
        )
        .unwrap();

        let catalog = RouteCatalog::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(catalog.destination(Route::Zh), 4);
        assert_eq!(catalog.point_name(Route::Zh, 1), "Lake");
        assert_eq!(catalog.destination(Route::PfAll), 6);
    }

    #[test]
    fn test_load_rejects_short_route() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        std::fs::write(&path, r#"{"routes": [{"route": 2, "waypoints": ["Gate"]}]}"#).unwrap();

        assert!(RouteCatalog::load_from_file(path.to_str().unwrap()).is_err());
    }
}
