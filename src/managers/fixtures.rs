//! Builders shared by the manager tests

use std::sync::Arc;

use crate::models::{
    Admin, Person, PersonType, Route, Team, TeamRole, TeamStatus, WalkStatus, NO_TEAM,
    POINT_UNASSIGNED,
};
use crate::state::{EventDatabase, EventStore, SharedEventStore};

pub fn person(open_id: &str, team_id: u32, walk_status: WalkStatus) -> Person {
    Person {
        open_id: open_id.to_string(),
        name: open_id.to_uppercase(),
        gender: 1,
        stu_id: format!("stu-{}", open_id),
        campus: 1,
        identity: format!("id-{}", open_id),
        status: TeamRole::Member,
        qq: String::new(),
        wechat: String::new(),
        college: "Computer Science".to_string(),
        tel: format!("tel-{}", open_id),
        created_op: 2,
        join_op: 5,
        team_id: i64::from(team_id),
        walk_status,
        person_type: PersonType::Student,
    }
}

/// A registered participant without a team
pub fn loner(open_id: &str) -> Person {
    let mut p = person(open_id, 0, WalkStatus::NotStarted);
    p.team_id = NO_TEAM;
    p.status = TeamRole::Unassigned;
    p
}

pub fn team(route: Route, status: TeamStatus) -> Team {
    Team {
        id: 0,
        name: "Morning Walkers".to_string(),
        route,
        password: "123456".to_string(),
        allow_match: true,
        slogan: "Keep walking".to_string(),
        point: POINT_UNASSIGNED,
        status,
        start_num: 0,
        num: 1,
        captain: String::new(),
        code: String::new(),
        submit: true,
        time: chrono::Utc::now(),
    }
}

pub fn admin(id: u32, route: Route, point: i8) -> Admin {
    Admin {
        id,
        name: format!("Admin {}", route.key()),
        account: format!("{}-{}-{}", route.key(), point, id),
        password: "pa55wd".to_string(),
        route,
        point,
    }
}

/// In-memory store prepared by `seed`
pub fn seeded_store(seed: impl FnOnce(&mut EventDatabase)) -> SharedEventStore {
    let mut db = EventDatabase::new();
    seed(&mut db);
    Arc::new(EventStore::in_memory(db))
}

/// Store prepared by `seed` that saves every commit to `path`
pub fn store_at(path: &std::path::Path, seed: impl FnOnce(&mut EventDatabase)) -> SharedEventStore {
    let mut db = EventDatabase::new();
    seed(&mut db);
    Arc::new(EventStore::new(db, Some(path.to_string_lossy().into_owned())))
}
