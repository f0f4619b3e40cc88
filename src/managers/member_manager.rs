use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::route_guard::check_route;
use super::team_manager::load_admin;
use crate::config::EventWindow;
use crate::error::{Result, WalkError};
use crate::models::WalkStatus;
use crate::state::SharedEventStore;

/// What an admin reports about a scanned member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberMark {
    Present,
    Withdrawn,
}

impl TryFrom<u32> for MemberMark {
    type Error = WalkError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(MemberMark::Present),
            2 => Ok(MemberMark::Withdrawn),
            _ => Err(WalkError::InvalidParameters),
        }
    }
}

impl MemberMark {
    fn walk_status(self) -> WalkStatus {
        match self {
            MemberMark::Present => WalkStatus::Unconfirmed,
            MemberMark::Withdrawn => WalkStatus::Withdrawn,
        }
    }
}

/// Per-member walk status updates by route admins
pub struct MemberManager {
    store: SharedEventStore,
    window: EventWindow,
}

impl MemberManager {
    pub fn new(store: SharedEventStore, window: EventWindow) -> Self {
        Self { store, window }
    }

    /// Apply a batch of marks; nothing changes unless every entry is valid
    pub async fn update_member_status(
        &self,
        admin_id: u32,
        marks: &[(String, MemberMark)],
    ) -> Result<()> {
        if marks.is_empty() {
            return Err(WalkError::InvalidParameters);
        }
        self.window
            .check_open(chrono::Local::now().naive_local())?;

        let mut db = self.store.begin().await;
        let admin = load_admin(&db, admin_id)?;

        let mut checked_teams = HashSet::new();
        for (open_id, _) in marks {
            let person = db.person(open_id).ok_or(WalkError::UserNotFound)?;
            if !checked_teams.contains(&person.team_id) {
                let team = db.team_of(person).ok_or(WalkError::TeamInfoUnavailable)?;
                check_route(&admin, team)?;
                checked_teams.insert(person.team_id);
            }
            if person.walk_status == WalkStatus::Finished {
                return Err(WalkError::MemberFinished);
            }
        }

        for (open_id, mark) in marks {
            if let Some(person) = db.person_mut(open_id) {
                person.walk_status = mark.walk_status();
            }
        }
        db.touch();
        db.commit().await?;

        info!(
            "Admin {} updated walk status of {} members",
            admin.account,
            marks.len()
        );
        Ok(())
    }
}

/// Shared member manager type
pub type SharedMemberManager = Arc<MemberManager>;

pub fn create_shared_member_manager(
    store: SharedEventStore,
    window: EventWindow,
) -> SharedMemberManager {
    Arc::new(MemberManager::new(store, window))
}
