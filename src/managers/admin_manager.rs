use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RouteCatalog;
use crate::error::{Result, WalkError};
use crate::models::{Admin, Route};
use crate::state::SharedEventStore;

const PASSWORD_LENGTH: usize = 6;

/// Name and login account of an admin to create
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub name: String,
    pub account: String,
}

/// Admins to create per route, indexed by waypoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteAdminGroups {
    #[serde(default)]
    pub zh: Vec<Vec<AdminSeed>>,
    #[serde(default)]
    pub pf_half: Vec<Vec<AdminSeed>>,
    #[serde(default)]
    pub pf_all: Vec<Vec<AdminSeed>>,
    #[serde(default)]
    pub mgs_half: Vec<Vec<AdminSeed>>,
    #[serde(default)]
    pub mgs_all: Vec<Vec<AdminSeed>>,
}

impl RouteAdminGroups {
    fn by_route(&self) -> [(Route, &Vec<Vec<AdminSeed>>); 5] {
        [
            (Route::Zh, &self.zh),
            (Route::PfHalf, &self.pf_half),
            (Route::PfAll, &self.pf_all),
            (Route::MgsHalf, &self.mgs_half),
            (Route::MgsAll, &self.mgs_all),
        ]
    }
}

fn generate_password() -> String {
    rand::rngs::OsRng
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

pub struct AdminManager {
    store: SharedEventStore,
    routes: Arc<RouteCatalog>,
}

impl AdminManager {
    pub fn new(store: SharedEventStore, routes: Arc<RouteCatalog>) -> Self {
        Self { store, routes }
    }

    /// Create every admin in `groups`, or none of them
    pub async fn create_route_admins(&self, groups: &RouteAdminGroups) -> Result<Vec<Admin>> {
        let mut db = self.store.begin().await;

        let mut pending = Vec::new();
        let mut accounts = HashSet::new();
        for (route, points) in groups.by_route() {
            for (index, seeds) in points.iter().enumerate() {
                let waypoint = i8::try_from(index).map_err(|_| WalkError::InvalidParameters)?;
                if !self.routes.contains_point(route, waypoint) {
                    warn!("Admin group for {} has no waypoint {}", route.key(), waypoint);
                    return Err(WalkError::InvalidParameters);
                }
                let point = self.routes.admin_point(route, waypoint);
                for seed in seeds {
                    if seed.account.trim().is_empty() {
                        return Err(WalkError::InvalidParameters);
                    }
                    if db.admin_by_account(&seed.account).is_some()
                        || !accounts.insert(seed.account.clone())
                    {
                        return Err(WalkError::DuplicateAccount {
                            account: seed.account.clone(),
                        });
                    }
                    pending.push(Admin {
                        id: 0,
                        name: seed.name.clone(),
                        account: seed.account.clone(),
                        password: generate_password(),
                        route,
                        point,
                    });
                }
            }
        }

        let created: Vec<Admin> = pending
            .into_iter()
            .map(|admin| db.insert_admin(admin))
            .collect();
        db.commit().await?;

        info!("Created {} route admins", created.len());
        Ok(created)
    }

    pub async fn login(&self, account: &str, password: &str) -> Result<Admin> {
        let db = self.store.read().await;
        match db.admin_by_account(account) {
            Some(admin) if admin.password == password => {
                info!("Admin {} logged in", admin.account);
                Ok(admin.clone())
            }
            _ => {
                warn!("Failed admin login for account {}", account);
                Err(WalkError::WrongCredentials)
            }
        }
    }
}

pub type SharedAdminManager = Arc<AdminManager>;

pub fn create_shared_admin_manager(
    store: SharedEventStore,
    routes: Arc<RouteCatalog>,
) -> SharedAdminManager {
    Arc::new(AdminManager::new(store, routes))
}
