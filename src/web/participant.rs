//! Participant login, registration and profile

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::auth::{Session, SessionSubject};
use super::response::{success, ApiResult};
use super::server::AppState;
use super::views::user_info_view;
use crate::error::WalkError;
use crate::managers::StudentRegistration;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login/wechat", post(wechat_login))
        .route("/register/student", post(register_student))
        .route("/user/info", get(user_info))
}

#[derive(Deserialize)]
struct WechatLoginForm {
    code: String,
}

/// POST /login/wechat
async fn wechat_login(
    State(state): State<AppState>,
    payload: Result<Json<WechatLoginForm>, JsonRejection>,
) -> ApiResult {
    let Json(form) = payload?;
    if form.code.trim().is_empty() {
        return Err(WalkError::InvalidParameters);
    }

    let open_id = state.wechat.open_id(&form.code).await.map_err(|e| {
        warn!("WeChat login failed: {}", e);
        WalkError::Upstream {
            message: e.to_string(),
        }
    })?;

    let registered = state.registration.user_info(&open_id).await.is_ok();
    let token = state
        .sessions
        .create_session(Session::new(SessionSubject::Participant(open_id)))
        .await;
    Ok(success(json!({ "token": token, "registered": registered })))
}

/// POST /register/student
async fn register_student(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<StudentRegistration>, JsonRejection>,
) -> ApiResult {
    let open_id = state.sessions.require_participant(&headers).await?;
    let Json(form) = payload?;
    let person = state.registration.register_student(&open_id, form).await?;
    info!("Participant {} completed registration", person.open_id);
    Ok(success(json!({ "open_id": person.open_id })))
}

/// GET /user/info
async fn user_info(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let open_id = state.sessions.require_participant(&headers).await?;
    let info = state.registration.user_info(&open_id).await?;
    Ok(success(user_info_view(&info)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::fixtures::seeded_store;
    use crate::web::server::build_router;
    use crate::web::server::tests::{call, test_state};
    use axum::http::StatusCode;

    fn registration(password: &str) -> serde_json::Value {
        json!({
            "name": "Zhou",
            "stu_id": "202301",
            "password": password,
            "id": "330102200001010000",
            "campus": 1,
            "contact": { "qq": "", "wechat": "zhou_w", "tel": "13900000000" }
        })
    }

    #[tokio::test]
    async fn test_login_register_and_profile() {
        let store = seeded_store(|_| {});
        let app = build_router(test_state(store.clone()));

        let (_, body) = call(
            &app,
            "POST",
            "/api/v1/login/wechat",
            None,
            Some(json!({ "code": "c1" })),
        )
        .await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"]["registered"], false);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (_, body) = call(
            &app,
            "POST",
            "/api/v1/register/student",
            Some(&token),
            Some(registration("wrong")),
        )
        .await;
        assert_eq!(body["msg"], WalkError::WrongCredentials.to_string());

        let (_, body) = call(
            &app,
            "POST",
            "/api/v1/register/student",
            Some(&token),
            Some(registration("right")),
        )
        .await;
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"]["open_id"], "o-c1");

        let (_, body) = call(
            &app,
            "POST",
            "/api/v1/register/student",
            Some(&token),
            Some(registration("right")),
        )
        .await;
        assert_eq!(body["msg"], WalkError::AlreadyRegistered.to_string());

        let (_, body) = call(&app, "GET", "/api/v1/user/info", Some(&token), None).await;
        assert_eq!(body["data"]["name"], "Zhou");
        assert_eq!(body["data"]["gender"], 1);
        assert_eq!(body["data"]["college"], "Design");
        assert!(body["data"]["team"].is_null());
    }

    #[tokio::test]
    async fn test_failed_wechat_login() {
        let app = build_router(test_state(seeded_store(|_| {})));
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/login/wechat",
            None,
            Some(json!({ "code": "bad" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], -1);
    }

    #[tokio::test]
    async fn test_profile_requires_participant_token() {
        let app = build_router(test_state(seeded_store(|_| {})));
        let (status, _) = call(&app, "GET", "/api/v1/user/info", Some("unknown"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
