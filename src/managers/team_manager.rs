//! Team check-in and progression.
//!
//! A team walks `NotStarted -> StartCheckedIn -> InProgress* -> Finished*`.
//! Member walk status drives the transitions: admins mark members present
//! (`Unconfirmed`) or withdrawn, and every check-in confirms the present
//! members and moves the team to the admin's waypoint.

use chrono::Utc;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use super::route_guard::check_route;
use crate::config::routes::{PF_DETOUR_LENGTH, PF_SPLIT_POINT};
use crate::config::{EventWindow, RouteCatalog};
use crate::error::{Result, WalkError};
use crate::models::{
    Admin, Person, Route, Team, TeamRole, TeamStatus, WalkStatus, POINT_UNASSIGNED,
};
use crate::state::{EventDatabase, SharedEventStore};

/// Posts of full route admins the half route never passes
const PF_FULL_ONLY_POINTS: [i8; 3] = [2, 3, 4];

/// Post of half route admins the full route never passes
const PF_HALF_ONLY_POINT: i8 = 2;

/// How a scanned QR code identifies a team
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamLookup {
    /// Team code, the decimal team id
    Id(u32),
    /// Check-in code bound at the start point
    Code(String),
}

impl TeamLookup {
    pub fn parse(code_type: u32, content: &str) -> Result<Self> {
        match code_type {
            1 => content
                .trim()
                .parse::<u32>()
                .map(TeamLookup::Id)
                .map_err(|_| WalkError::InvalidParameters),
            2 => Ok(TeamLookup::Code(content.to_string())),
            _ => Err(WalkError::InvalidParameters),
        }
    }

    fn find<'a>(&self, db: &'a EventDatabase) -> Option<&'a Team> {
        match self {
            TeamLookup::Id(id) => db.team(*id),
            TeamLookup::Code(code) => db.team_by_code(code),
        }
    }
}

/// Admin's verdict on a team arriving at the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationVerdict {
    Confirmed,
    Rejected,
}

impl TryFrom<u32> for DestinationVerdict {
    type Error = WalkError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(DestinationVerdict::Confirmed),
            2 => Ok(DestinationVerdict::Rejected),
            _ => Err(WalkError::InvalidParameters),
        }
    }
}

/// A team together with its members, as shown to admins
#[derive(Debug, Clone)]
pub struct TeamDetail {
    pub team: Team,
    pub point_name: String,
    pub members: Vec<Person>,
    /// The admin who looked the team up, if any
    pub admin: Option<Admin>,
}

/// Fields of a team created by regrouping
const REGROUP_TEAM_NAME: &str = "New team";
const REGROUP_TEAM_PASSWORD: &str = "123456";
const REGROUP_TEAM_SLOGAN: &str = "A new beginning";

pub(crate) fn load_admin(db: &EventDatabase, admin_id: u32) -> Result<Admin> {
    db.admin(admin_id).cloned().ok_or(WalkError::Unauthorized)
}

fn active_members(db: &EventDatabase, team_id: u32) -> u32 {
    db.members(team_id)
        .iter()
        .filter(|p| p.walk_status.is_active())
        .count() as u32
}

/// Waypoint index a check-in by `admin` puts a team of `team_route` at.
///
/// Pingfeng admin posts are numbered along the full route, see
/// [`RouteCatalog::admin_point`].
pub fn resolve_checkin_point(routes: &RouteCatalog, team_route: Route, admin: &Admin) -> Result<i8> {
    let point = match team_route {
        Route::PfHalf => {
            if admin.route == Route::PfAll && PF_FULL_ONLY_POINTS.contains(&admin.point) {
                return Err(WalkError::HalfRouteContinue);
            }
            if admin.point > PF_SPLIT_POINT {
                admin.point - PF_DETOUR_LENGTH
            } else {
                admin.point
            }
        }
        Route::PfAll => {
            if admin.route == Route::PfHalf && admin.point == PF_HALF_ONLY_POINT {
                return Err(WalkError::FullRouteContinue);
            }
            admin.point
        }
        _ => admin.point,
    };

    if !routes.contains_point(team_route, point) {
        return Err(WalkError::PointOutOfRange {
            route: team_route,
            point,
        });
    }
    Ok(point)
}

/// Runs the team state machine against the event store
pub struct TeamManager {
    store: SharedEventStore,
    routes: Arc<RouteCatalog>,
    window: EventWindow,
}

impl TeamManager {
    pub fn new(store: SharedEventStore, routes: Arc<RouteCatalog>, window: EventWindow) -> Self {
        Self {
            store,
            routes,
            window,
        }
    }

    fn check_window(&self) -> Result<()> {
        self.window.check_open(chrono::Local::now().naive_local())
    }

    fn detail(&self, db: &EventDatabase, team: &Team, admin: Option<Admin>) -> TeamDetail {
        TeamDetail {
            team: team.clone(),
            point_name: self.routes.point_name(team.route, team.point),
            members: db.members(team.id).into_iter().cloned().collect(),
            admin,
        }
    }

    /// Look up a team for an admin scanning its QR code
    pub async fn get_team(&self, admin_id: u32, lookup: &TeamLookup) -> Result<TeamDetail> {
        let db = self.store.read().await;
        let admin = load_admin(&db, admin_id)?;
        let team = lookup.find(&db).ok_or(WalkError::TeamNotFound)?;
        check_route(&admin, team)?;
        Ok(self.detail(&db, team, Some(admin)))
    }

    /// Look up a team for the organisers, without route scope
    pub async fn get_team_by_id(&self, team_id: u32) -> Result<TeamDetail> {
        let db = self.store.read().await;
        let team = db.team(team_id).ok_or(WalkError::TeamNotFound)?;
        Ok(self.detail(&db, team, None))
    }

    /// Bind a check-in code at the start point and start the team
    pub async fn bind_team(
        &self,
        admin_id: u32,
        team_id: u32,
        bind_type: u32,
        code: &str,
    ) -> Result<()> {
        if bind_type != 2 || code.trim().is_empty() {
            return Err(WalkError::InvalidParameters);
        }
        self.check_window()?;

        let mut db = self.store.begin().await;
        let admin = load_admin(&db, admin_id)?;
        let team = db.team(team_id).ok_or(WalkError::TeamNotFound)?;
        check_route(&admin, team)?;
        let required = (u32::from(team.num) + 1) / 2;

        if db.team_by_code(code).is_some() {
            return Err(WalkError::CodeAlreadyBound);
        }

        let mut starters = 0u32;
        for member in db.members(team_id) {
            match member.walk_status {
                WalkStatus::Unconfirmed => starters += 1,
                WalkStatus::Withdrawn => {}
                _ => return Err(WalkError::MembersUnconfirmed),
            }
        }

        if required > starters {
            return Err(WalkError::NotEnoughMembers);
        }

        let team = db.team_mut(team_id).ok_or(WalkError::TeamNotFound)?;
        team.code = code.to_string();
        team.point = 0;
        team.status = TeamStatus::StartCheckedIn;
        team.start_num = starters;
        team.time = Utc::now();
        db.touch();
        db.commit().await?;

        info!(
            "Team {} bound to code '{}' by admin {} with {} starters",
            team_id, code, admin.account, starters
        );
        Ok(())
    }

    /// Check a team in at the admin's waypoint, returns the number of members still walking
    pub async fn update_team_status(&self, admin_id: u32, lookup: &TeamLookup) -> Result<u32> {
        self.check_window()?;

        let mut db = self.store.begin().await;
        let admin = load_admin(&db, admin_id)?;
        let team = lookup.find(&db).ok_or(WalkError::TeamNotFound)?.clone();
        check_route(&admin, &team)?;

        match team.status {
            TeamStatus::NotStarted => return Err(WalkError::StartNotScanned),
            status if status.is_finished() => return Err(WalkError::TeamFinished),
            _ => {}
        }

        let active = active_members(&db, team.id);
        if active == 0 {
            let destination = self.routes.destination(team.route);
            let stored = db.team_mut(team.id).ok_or(WalkError::TeamNotFound)?;
            stored.status = TeamStatus::FinishedUnconfirmed;
            stored.point = destination;
            db.touch();
            db.commit().await?;
            info!("Team {} has no walking members left, marked as ended", team.id);
            return Ok(0);
        }

        let point = resolve_checkin_point(&self.routes, team.route, &admin).map_err(|e| {
            warn!(
                "Admin {} ({}:{}) cannot check in team {} on {}: {}",
                admin.account,
                admin.route.key(),
                admin.point,
                team.id,
                team.route.key(),
                e
            );
            e
        })?;

        for member in db.members_mut(team.id) {
            if member.walk_status == WalkStatus::Unconfirmed {
                member.walk_status = WalkStatus::InProgress;
            }
        }

        let stored = db.team_mut(team.id).ok_or(WalkError::TeamNotFound)?;
        stored.point = point;
        stored.status = TeamStatus::InProgress;
        stored.time = Utc::now();
        db.touch();
        db.commit().await?;

        info!(
            "Team {} checked in at {} ({}) with {} members",
            team.id,
            point,
            self.routes.point_name(team.route, point),
            active
        );
        Ok(active)
    }

    /// Record a team's arrival at the destination
    pub async fn post_destination(
        &self,
        admin_id: u32,
        team_id: u32,
        verdict: DestinationVerdict,
    ) -> Result<()> {
        self.check_window()?;

        let mut db = self.store.begin().await;
        let admin = load_admin(&db, admin_id)?;
        let team = db.team(team_id).ok_or(WalkError::TeamNotFound)?.clone();
        check_route(&admin, &team)?;

        if team.status.is_finished() {
            return Err(WalkError::StatusAlreadyConfirmed);
        }

        let destination = self.routes.destination(team.route);
        let active = active_members(&db, team_id);

        if active > 0 && verdict == DestinationVerdict::Confirmed {
            for member in db.members_mut(team_id) {
                if member.walk_status.is_active() {
                    member.walk_status = WalkStatus::Finished;
                }
            }
        }

        let stored = db.team_mut(team_id).ok_or(WalkError::TeamNotFound)?;
        stored.point = destination;
        stored.status = if active > 0 && verdict == DestinationVerdict::Confirmed {
            TeamStatus::FinishedConfirmed
        } else {
            TeamStatus::FinishedUnconfirmed
        };
        if active > 0 {
            stored.time = Utc::now();
        }
        let status = stored.status;
        db.touch();
        db.commit().await?;

        info!(
            "Team {} reached the destination of {}: {:?} ({} members)",
            team_id,
            team.route.key(),
            status,
            active
        );
        Ok(())
    }

    /// Dissolve the scanned participants' teams and form a new one, the first scan becomes captain
    pub async fn regroup(&self, open_ids: &[String], route: u8) -> Result<u32> {
        let route = Route::try_from(route).map_err(|_| WalkError::InvalidParameters)?;
        if open_ids.is_empty() {
            return Err(WalkError::EmptyGroup);
        }
        let num = u8::try_from(open_ids.len()).map_err(|_| WalkError::InvalidParameters)?;

        let mut db = self.store.begin().await;

        let mut seen = HashSet::new();
        let mut old_teams = BTreeSet::new();
        for open_id in open_ids {
            if !seen.insert(open_id.as_str()) {
                return Err(WalkError::DuplicateScan);
            }
            let person = db.person(open_id).ok_or(WalkError::ScanError)?;
            if let Some(team) = db.team_of(person) {
                if team.status != TeamStatus::NotStarted {
                    return Err(WalkError::TeamAlreadyStarted {
                        name: person.name.clone(),
                    });
                }
                old_teams.insert(team.id);
            }
        }

        for team_id in &old_teams {
            for member in db.members_mut(*team_id) {
                member.leave_team();
            }
            db.remove_team(*team_id);
            info!("Team {} dissolved for regrouping", team_id);
        }
        // Persons pointing at a team that no longer exists
        for open_id in open_ids {
            if let Some(person) = db.person_mut(open_id) {
                if person.has_team() {
                    person.leave_team();
                }
            }
        }

        let captain = open_ids[0].clone();
        let team_id = db.insert_team(Team {
            id: 0,
            name: REGROUP_TEAM_NAME.to_string(),
            route,
            password: REGROUP_TEAM_PASSWORD.to_string(),
            allow_match: true,
            slogan: REGROUP_TEAM_SLOGAN.to_string(),
            point: POINT_UNASSIGNED,
            status: TeamStatus::NotStarted,
            start_num: 0,
            num,
            captain,
            code: String::new(),
            submit: true,
            time: Utc::now(),
        });

        for (i, open_id) in open_ids.iter().enumerate() {
            if let Some(person) = db.person_mut(open_id) {
                person.team_id = i64::from(team_id);
                person.status = if i == 0 {
                    TeamRole::Captain
                } else {
                    TeamRole::Member
                };
            }
        }
        db.commit().await?;

        info!(
            "Regrouped {} participants into team {} on {}",
            num,
            team_id,
            route.key()
        );
        Ok(team_id)
    }

    /// Mark a team as submitted for the event
    pub async fn submit_team(&self, team_id: u32) -> Result<()> {
        let mut db = self.store.begin().await;
        let team = db.team_mut(team_id).ok_or(WalkError::TeamNotFound)?;
        team.submit = true;
        db.touch();
        db.commit().await?;
        info!("Team {} submitted", team_id);
        Ok(())
    }
}

/// Shared team manager type
pub type SharedTeamManager = Arc<TeamManager>;

pub fn create_shared_team_manager(
    store: SharedEventStore,
    routes: Arc<RouteCatalog>,
    window: EventWindow,
) -> SharedTeamManager {
    Arc::new(TeamManager::new(store, routes, window))
}
