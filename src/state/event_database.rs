use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{Admin, Person, Team};

const SCHEMA_VERSION: u32 = 1;

/// All persistent event data: participants, teams and route admins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDatabase {
    /// Schema version for migrations
    pub version: u32,

    /// Last update timestamp
    pub last_updated: u64,

    /// Participants keyed by open id
    pub persons: HashMap<String, Person>,

    pub teams: BTreeMap<u32, Team>,

    pub admins: BTreeMap<u32, Admin>,

    #[serde(default)]
    next_team_id: u32,
    #[serde(default)]
    next_admin_id: u32,
}

impl Default for EventDatabase {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            last_updated: current_timestamp(),
            persons: HashMap::new(),
            teams: BTreeMap::new(),
            admins: BTreeMap::new(),
            next_team_id: 1,
            next_admin_id: 1,
        }
    }
}

impl EventDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file, or create new if not exists
    pub async fn load(path: &str) -> crate::error::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let mut db: Self = serde_json::from_str(&content).map_err(|e| {
                    crate::error::WalkError::ConfigParse {
                        path: path.to_string(),
                        source: e,
                    }
                })?;
                db.repair_counters();
                Ok(db)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(crate::error::WalkError::StateLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Save to a JSON file atomically
    pub async fn save(&self, path: &str) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content).await.map_err(|e| {
            crate::error::WalkError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            crate::error::WalkError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        Ok(())
    }

    /// Keep id counters ahead of hand-edited files
    fn repair_counters(&mut self) {
        let max_team = self.teams.keys().next_back().copied().unwrap_or(0);
        let max_admin = self.admins.keys().next_back().copied().unwrap_or(0);
        self.next_team_id = self.next_team_id.max(max_team + 1);
        self.next_admin_id = self.next_admin_id.max(max_admin + 1);
    }

    pub fn touch(&mut self) {
        self.last_updated = current_timestamp();
    }

    // Persons

    pub fn person(&self, open_id: &str) -> Option<&Person> {
        self.persons.get(open_id)
    }

    pub fn person_mut(&mut self, open_id: &str) -> Option<&mut Person> {
        self.persons.get_mut(open_id)
    }

    /// Find a registration clashing on identity number or phone
    pub fn find_registered(&self, identity: &str, tel: &str) -> Option<&Person> {
        self.persons
            .values()
            .find(|p| p.identity == identity || p.tel == tel)
    }

    pub fn insert_person(&mut self, person: Person) {
        self.persons.insert(person.open_id.clone(), person);
        self.touch();
    }

    /// Members of a team, ordered by open id
    pub fn members(&self, team_id: u32) -> Vec<&Person> {
        let mut members: Vec<&Person> = self
            .persons
            .values()
            .filter(|p| p.team_id == i64::from(team_id))
            .collect();
        members.sort_by(|a, b| a.open_id.cmp(&b.open_id));
        members
    }

    pub fn members_mut(&mut self, team_id: u32) -> impl Iterator<Item = &mut Person> {
        self.persons
            .values_mut()
            .filter(move |p| p.team_id == i64::from(team_id))
    }

    // Teams

    pub fn team(&self, id: u32) -> Option<&Team> {
        self.teams.get(&id)
    }

    pub fn team_mut(&mut self, id: u32) -> Option<&mut Team> {
        self.teams.get_mut(&id)
    }

    /// Team referenced by a person's `team_id`, if any
    pub fn team_of(&self, person: &Person) -> Option<&Team> {
        u32::try_from(person.team_id)
            .ok()
            .and_then(|id| self.teams.get(&id))
    }

    pub fn team_by_code(&self, code: &str) -> Option<&Team> {
        if code.is_empty() {
            return None;
        }
        self.teams.values().find(|t| t.code == code)
    }

    /// Insert a team, assigning it the next id
    pub fn insert_team(&mut self, mut team: Team) -> u32 {
        let id = self.next_team_id;
        self.next_team_id += 1;
        team.id = id;
        self.teams.insert(id, team);
        self.touch();
        id
    }

    pub fn remove_team(&mut self, id: u32) -> Option<Team> {
        let removed = self.teams.remove(&id);
        self.touch();
        removed
    }

    // Admins

    pub fn admin(&self, id: u32) -> Option<&Admin> {
        self.admins.get(&id)
    }

    pub fn admin_by_account(&self, account: &str) -> Option<&Admin> {
        self.admins.values().find(|a| a.account == account)
    }

    /// Insert an admin, assigning it the next id
    pub fn insert_admin(&mut self, mut admin: Admin) -> Admin {
        admin.id = self.next_admin_id;
        self.next_admin_id += 1;
        self.admins.insert(admin.id, admin.clone());
        self.touch();
        admin
    }
}

/// The event database behind a lock, persisted after every mutation
pub struct EventStore {
    db: RwLock<EventDatabase>,
    /// None keeps the store in memory only
    path: Option<String>,
}

impl EventStore {
    pub fn new(db: EventDatabase, path: Option<String>) -> Self {
        Self {
            db: RwLock::new(db),
            path,
        }
    }

    #[cfg(test)]
    pub fn in_memory(db: EventDatabase) -> Self {
        Self::new(db, None)
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, EventDatabase> {
        self.db.read().await
    }

    /// Take the write lock and start editing a working copy of the database
    pub async fn begin(&self) -> EventTransaction<'_> {
        let guard = self.db.write().await;
        let draft = guard.clone();
        EventTransaction {
            guard,
            draft,
            path: self.path.as_deref(),
        }
    }
}

/// Exclusive edit of the event database.
///
/// Changes go to a working copy that replaces the shared database only when
/// [`EventTransaction::commit`] has saved it. Dropping the transaction, or a
/// failed save, leaves the shared database as it was.
pub struct EventTransaction<'a> {
    guard: RwLockWriteGuard<'a, EventDatabase>,
    draft: EventDatabase,
    path: Option<&'a str>,
}

impl EventTransaction<'_> {
    pub async fn commit(self) -> crate::error::Result<()> {
        let EventTransaction {
            mut guard,
            draft,
            path,
        } = self;
        if let Some(path) = path {
            draft.save(path).await?;
        }
        *guard = draft;
        Ok(())
    }
}

impl Deref for EventTransaction<'_> {
    type Target = EventDatabase;

    fn deref(&self) -> &EventDatabase {
        &self.draft
    }
}

impl DerefMut for EventTransaction<'_> {
    fn deref_mut(&mut self) -> &mut EventDatabase {
        &mut self.draft
    }
}

/// Shared event store type
pub type SharedEventStore = Arc<EventStore>;

pub fn create_shared_event_store(db: EventDatabase, path: Option<String>) -> SharedEventStore {
    Arc::new(EventStore::new(db, path))
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
