use crate::error::{Result, WalkError};
use crate::models::{Admin, Team};

/// An admin may act on teams walking a route of their own campus
pub fn check_route(admin: &Admin, team: &Team) -> Result<()> {
    if admin.route.campus() == team.route.campus() {
        Ok(())
    } else {
        Err(WalkError::OtherRoute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Route, TeamStatus};

    fn admin(route: Route) -> Admin {
        Admin {
            id: 1,
            name: "Wang".to_string(),
            account: "wang".to_string(),
            password: "abc123".to_string(),
            route,
            point: 1,
        }
    }

    fn team(route: Route) -> Team {
        Team {
            id: 1,
            name: "T".to_string(),
            route,
            password: String::new(),
            allow_match: false,
            slogan: String::new(),
            point: 0,
            status: TeamStatus::InProgress,
            start_num: 0,
            num: 1,
            captain: String::new(),
            code: String::new(),
            submit: true,
            time: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_same_campus_allowed() {
        assert!(check_route(&admin(Route::PfAll), &team(Route::PfHalf)).is_ok());
        assert!(check_route(&admin(Route::MgsHalf), &team(Route::MgsAll)).is_ok());
        assert!(check_route(&admin(Route::Zh), &team(Route::Zh)).is_ok());
    }

    #[test]
    fn test_other_campus_rejected() {
        assert!(matches!(
            check_route(&admin(Route::Zh), &team(Route::PfAll)),
            Err(WalkError::OtherRoute)
        ));
        assert!(check_route(&admin(Route::MgsAll), &team(Route::PfHalf)).is_err());
    }
}
