use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::RouteCatalog;
use crate::models::{Person, PersonType, Route, Team, WalkStatus};
use crate::state::{EventDatabase, SharedEventStore};

/// Headcount at one position along a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointCount {
    pub count: u32,
    pub label: String,
}

/// Kind of team, decided by its captain and members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamType {
    Student,
    Teacher,
    Mixed,
    Alumni,
}

impl TeamType {
    pub const ALL: [TeamType; 4] = [
        TeamType::Student,
        TeamType::Teacher,
        TeamType::Mixed,
        TeamType::Alumni,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TeamType::Student => "Student team",
            TeamType::Teacher => "Teacher team",
            TeamType::Mixed => "Teacher and student team",
            TeamType::Alumni => "Alumni team",
        }
    }

    /// None when the captain record is missing
    fn classify(captain: Option<&Person>, members: &[&Person]) -> Option<TeamType> {
        match captain?.person_type {
            PersonType::Student => Some(TeamType::Student),
            PersonType::Alumnus => Some(TeamType::Alumni),
            PersonType::Teacher => {
                if members
                    .iter()
                    .any(|p| p.person_type == PersonType::Student)
                {
                    Some(TeamType::Mixed)
                } else {
                    Some(TeamType::Teacher)
                }
            }
        }
    }
}

/// Submitted teams of one type on one route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitCount {
    pub route: String,
    pub team_type: String,
    pub team_num: u32,
    pub total_num: u32,
}

pub struct ReportManager {
    store: SharedEventStore,
    routes: Arc<RouteCatalog>,
}

impl ReportManager {
    pub fn new(store: SharedEventStore, routes: Arc<RouteCatalog>) -> Self {
        Self { store, routes }
    }

    /// Where everyone is, per route key
    pub async fn route_detail(&self) -> BTreeMap<&'static str, Vec<PointCount>> {
        let db = self.store.read().await;
        Route::ALL
            .iter()
            .map(|&route| (route.key(), self.route_counts(&db, route)))
            .collect()
    }

    fn route_counts(&self, db: &EventDatabase, route: Route) -> Vec<PointCount> {
        let destination = self.routes.destination(route);
        let waypoints = usize::try_from(destination).unwrap_or(0);

        let mut not_started = 0;
        let mut at_point = vec![0u32; waypoints];
        let mut finished = 0;
        let mut withdrawn = 0;

        for person in db.persons.values() {
            let Some(team) = db.team_of(person).filter(|t| t.route == route) else {
                continue;
            };
            match person.walk_status {
                WalkStatus::NotStarted if team.submit => not_started += 1,
                WalkStatus::Finished => finished += 1,
                WalkStatus::Withdrawn => withdrawn += 1,
                status if status.is_active() && team.status.is_walking() => {
                    if let Some(slot) = usize::try_from(team.point)
                        .ok()
                        .and_then(|p| at_point.get_mut(p))
                    {
                        *slot += 1;
                    }
                }
                _ => {}
            }
        }

        let mut counts = Vec::with_capacity(waypoints + 3);
        counts.push(PointCount {
            count: not_started,
            label: "Not started".to_string(),
        });
        for (point, count) in (0..destination).zip(at_point) {
            counts.push(PointCount {
                count,
                label: self.routes.point_name(route, point),
            });
        }
        counts.push(PointCount {
            count: finished,
            label: "Finished".to_string(),
        });
        counts.push(PointCount {
            count: withdrawn,
            label: "Withdrawn".to_string(),
        });
        counts
    }

    /// Submitted team and member totals per route and team type
    pub async fn submit_detail(&self) -> BTreeMap<&'static str, Vec<SubmitCount>> {
        let db = self.store.read().await;

        let mut tallies: HashMap<(Route, TeamType), (u32, u32)> = HashMap::new();
        for team in db.teams.values().filter(|t| t.submit) {
            let members = db.members(team.id);
            let captain = db.person(&team.captain);
            let Some(team_type) = TeamType::classify(captain, &members) else {
                continue;
            };
            let tally = tallies.entry((team.route, team_type)).or_default();
            tally.0 += 1;
            tally.1 += members.len() as u32;
        }

        Route::ALL
            .iter()
            .map(|&route| {
                let rows = TeamType::ALL
                    .iter()
                    .map(|&team_type| {
                        let (team_num, total_num) = tallies
                            .get(&(route, team_type))
                            .copied()
                            .unwrap_or_default();
                        SubmitCount {
                            route: route.display_name().to_string(),
                            team_type: team_type.label().to_string(),
                            team_num,
                            total_num,
                        }
                    })
                    .collect();
                (route.key(), rows)
            })
            .collect()
    }
}

/// Count teams by route, used for startup logging
pub fn team_totals(teams: &BTreeMap<u32, Team>) -> BTreeMap<&'static str, usize> {
    let mut totals = BTreeMap::new();
    for team in teams.values() {
        *totals.entry(team.route.key()).or_insert(0) += 1;
    }
    totals
}

pub type SharedReportManager = Arc<ReportManager>;

pub fn create_shared_report_manager(
    store: SharedEventStore,
    routes: Arc<RouteCatalog>,
) -> SharedReportManager {
    Arc::new(ReportManager::new(store, routes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::fixtures::{person, seeded_store, team};
    use crate::models::TeamStatus;

    fn manager(store: SharedEventStore) -> ReportManager {
        ReportManager::new(store, Arc::new(RouteCatalog::default()))
    }

    #[tokio::test]
    async fn test_route_detail_counts() {
        let store = seeded_store(|db| {
            let waiting = db.insert_team(team(Route::Zh, TeamStatus::NotStarted));
            db.insert_person(person("w1", waiting, WalkStatus::NotStarted));
            db.insert_person(person("w2", waiting, WalkStatus::NotStarted));

            let mut unsubmitted = team(Route::Zh, TeamStatus::NotStarted);
            unsubmitted.submit = false;
            let unsubmitted = db.insert_team(unsubmitted);
            db.insert_person(person("u1", unsubmitted, WalkStatus::NotStarted));

            let mut walking = team(Route::Zh, TeamStatus::InProgress);
            walking.point = 1;
            let walking = db.insert_team(walking);
            db.insert_person(person("m1", walking, WalkStatus::InProgress));
            db.insert_person(person("m2", walking, WalkStatus::Unconfirmed));
            db.insert_person(person("m3", walking, WalkStatus::Withdrawn));

            let done = db.insert_team(team(Route::Zh, TeamStatus::FinishedConfirmed));
            db.insert_person(person("f1", done, WalkStatus::Finished));

            let elsewhere = db.insert_team(team(Route::MgsAll, TeamStatus::NotStarted));
            db.insert_person(person("e1", elsewhere, WalkStatus::NotStarted));
        });

        let detail = manager(store).route_detail().await;
        let zh = &detail["zh"];

        // Zhaohui has destination 3: not started, points 0..3, finished, withdrawn
        assert_eq!(zh.len(), 6);
        assert_eq!(zh[0], PointCount { count: 2, label: "Not started".to_string() });
        assert_eq!(zh[1].count, 0);
        assert_eq!(zh[2].count, 2);
        assert_eq!(zh[4], PointCount { count: 1, label: "Finished".to_string() });
        assert_eq!(zh[5], PointCount { count: 1, label: "Withdrawn".to_string() });

        assert_eq!(detail["mgsAll"][0].count, 1);
        assert_eq!(detail.len(), 5);
    }

    #[tokio::test]
    async fn test_submit_detail_by_team_type() {
        let store = seeded_store(|db| {
            let students = db.insert_team(team(Route::PfHalf, TeamStatus::NotStarted));
            db.insert_person(person("s1", students, WalkStatus::NotStarted));
            db.insert_person(person("s2", students, WalkStatus::NotStarted));
            db.team_mut(students).unwrap().captain = "s1".to_string();

            let mixed = db.insert_team(team(Route::PfHalf, TeamStatus::NotStarted));
            let mut teacher = person("t1", mixed, WalkStatus::NotStarted);
            teacher.person_type = PersonType::Teacher;
            db.insert_person(teacher);
            db.insert_person(person("s3", mixed, WalkStatus::NotStarted));
            db.team_mut(mixed).unwrap().captain = "t1".to_string();

            let staff = db.insert_team(team(Route::PfHalf, TeamStatus::NotStarted));
            let mut teacher = person("t2", staff, WalkStatus::NotStarted);
            teacher.person_type = PersonType::Teacher;
            db.insert_person(teacher);
            db.team_mut(staff).unwrap().captain = "t2".to_string();

            let mut draft = team(Route::PfHalf, TeamStatus::NotStarted);
            draft.submit = false;
            let draft = db.insert_team(draft);
            db.insert_person(person("d1", draft, WalkStatus::NotStarted));
            db.team_mut(draft).unwrap().captain = "d1".to_string();
        });

        let detail = manager(store).submit_detail().await;
        let pf_half = &detail["pfHalf"];

        assert_eq!(pf_half.len(), 4);
        assert_eq!((pf_half[0].team_num, pf_half[0].total_num), (1, 2));
        assert_eq!((pf_half[1].team_num, pf_half[1].total_num), (1, 1));
        assert_eq!((pf_half[2].team_num, pf_half[2].total_num), (1, 2));
        assert_eq!((pf_half[3].team_num, pf_half[3].total_num), (0, 0));
        assert_eq!(pf_half[2].team_type, TeamType::Mixed.label());
        assert!(detail["zh"].iter().all(|row| row.team_num == 0));
    }

    #[test]
    fn test_team_totals() {
        let mut teams = BTreeMap::new();
        teams.insert(1, team(Route::Zh, TeamStatus::NotStarted));
        teams.insert(2, team(Route::Zh, TeamStatus::InProgress));
        teams.insert(3, team(Route::MgsHalf, TeamStatus::NotStarted));
        let totals = team_totals(&teams);
        assert_eq!(totals["zh"], 2);
        assert_eq!(totals["mgsHalf"], 1);
    }
}
