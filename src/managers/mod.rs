pub mod admin_manager;
pub mod member_manager;
pub mod registration_manager;
pub mod report_manager;
pub mod route_guard;
pub mod team_manager;

#[cfg(test)]
pub mod fixtures;

pub use admin_manager::{create_shared_admin_manager, RouteAdminGroups, SharedAdminManager};
pub use member_manager::{create_shared_member_manager, MemberMark, SharedMemberManager};
pub use registration_manager::{
    create_shared_registration_manager, SharedRegistrationManager, StudentRegistration,
};
pub use report_manager::{create_shared_report_manager, SharedReportManager};
pub use team_manager::{
    create_shared_team_manager, DestinationVerdict, SharedTeamManager, TeamDetail, TeamLookup,
};
