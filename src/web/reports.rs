use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::response::{success, ApiResult};
use super::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/detail", get(route_detail))
        .route("/admin/detail/submit", get(submit_detail))
}

#[derive(Deserialize)]
struct SecretQuery {
    secret: String,
}

/// GET /admin/detail?secret=
async fn route_detail(
    State(state): State<AppState>,
    query: Result<Query<SecretQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    state.config.check_secret(&query.secret)?;
    Ok(success(state.reports.route_detail().await))
}

/// GET /admin/detail/submit?secret=
async fn submit_detail(
    State(state): State<AppState>,
    query: Result<Query<SecretQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    state.config.check_secret(&query.secret)?;
    let results = state.reports.submit_detail().await;
    Ok(success(json!({ "results": results })))
}

#[cfg(test)]
mod tests {
    use crate::error::WalkError;
    use crate::managers::fixtures::{person, seeded_store, team};
    use crate::models::{Route, TeamStatus, WalkStatus};
    use crate::web::server::build_router;
    use crate::web::server::tests::{call, test_state, SECRET};

    #[tokio::test]
    async fn test_reports_behind_secret() {
        let store = seeded_store(|db| {
            let id = db.insert_team(team(Route::Zh, TeamStatus::NotStarted));
            db.insert_person(person("a", id, WalkStatus::NotStarted));
            db.team_mut(id).unwrap().captain = "a".to_string();
        });
        let app = build_router(test_state(store));

        let uri = format!("/api/v1/admin/detail?secret={}", SECRET);
        let (_, body) = call(&app, "GET", &uri, None, None).await;
        assert_eq!(body["data"]["zh"][0]["count"], 1);
        assert_eq!(body["data"]["zh"][0]["label"], "Not started");

        let uri = format!("/api/v1/admin/detail/submit?secret={}", SECRET);
        let (_, body) = call(&app, "GET", &uri, None, None).await;
        assert_eq!(body["data"]["results"]["zh"][0]["team_num"], 1);
        assert_eq!(body["data"]["results"]["mgsAll"].as_array().unwrap().len(), 4);

        let (_, body) = call(&app, "GET", "/api/v1/admin/detail", None, None).await;
        assert_eq!(body["msg"], WalkError::InvalidParameters.to_string());
    }
}
