//! JSON shapes returned to the mini program and the organisers' tools

use serde_json::{json, Value};

use crate::managers::registration_manager::UserInfo;
use crate::managers::TeamDetail;
use crate::models::{Admin, Person, Team};

pub fn admin_view(admin: &Admin) -> Value {
    json!({
        "id": admin.id,
        "name": admin.name,
        "account": admin.account,
        "route": admin.route,
        "point": admin.point,
    })
}

/// Includes the generated password, only for freshly created admins
pub fn created_admin_view(admin: &Admin) -> Value {
    let mut view = admin_view(admin);
    view["password"] = json!(admin.password);
    view
}

fn member_view(person: &Person, with_role: bool) -> Value {
    let mut view = json!({
        "name": person.name,
        "gender": person.gender,
        "open_id": person.open_id,
        "campus": person.campus,
        "type": person.person_type,
        "contact": person.contact(),
        "walk_status": person.walk_status,
    });
    if with_role {
        view["status"] = json!(person.status);
    }
    view
}

fn team_view(team: &Team, point_name: &str) -> Value {
    json!({
        "id": team.id,
        "name": team.name,
        "route": team.route,
        "password": team.password,
        "allow_match": team.allow_match,
        "slogan": team.slogan,
        "point": point_name,
        "status": team.status,
        "start_num": team.start_num,
        "code": team.code,
    })
}

/// Team as seen by the admin who scanned it
pub fn scanned_team_view(detail: &TeamDetail) -> Value {
    json!({
        "team": team_view(&detail.team, &detail.point_name),
        "admin": detail.admin.as_ref().map(admin_view),
        "member": detail
            .members
            .iter()
            .map(|p| member_view(p, false))
            .collect::<Vec<_>>(),
    })
}

/// Team as seen by the organisers, with submission and member roles
pub fn organiser_team_view(detail: &TeamDetail) -> Value {
    let mut team = team_view(&detail.team, &detail.point_name);
    team["submit"] = json!(detail.team.submit);
    json!({
        "team": team,
        "member": detail
            .members
            .iter()
            .map(|p| member_view(p, true))
            .collect::<Vec<_>>(),
    })
}

/// A participant's own record
pub fn user_info_view(info: &UserInfo) -> Value {
    let person = &info.person;
    json!({
        "name": person.name,
        "stu_id": person.stu_id,
        "gender": person.gender,
        "campus": person.campus,
        "college": person.college,
        "type": person.person_type,
        "contact": person.contact(),
        "status": person.status,
        "walk_status": person.walk_status,
        "team": info.team.as_ref().map(|team| json!({
            "id": team.id,
            "name": team.name,
            "route": team.route,
            "slogan": team.slogan,
            "status": team.status,
            "num": team.num,
            "captain": team.captain,
            "submit": team.submit,
        })),
    })
}
