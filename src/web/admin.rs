//! Route admin and organiser endpoints
//!
//! Admin endpoints take the bearer token issued by `/admin/login`;
//! organiser endpoints take the server secret instead.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use super::auth::{Session, SessionSubject};
use super::response::{done, success, ApiResult};
use super::server::AppState;
use super::views::{admin_view, created_admin_view, organiser_team_view, scanned_team_view};
use crate::error::WalkError;
use crate::managers::{DestinationVerdict, MemberMark, RouteAdminGroups, TeamLookup};

const DEFAULT_LOG_COUNT: usize = 200;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/team", get(get_team))
        .route("/admin/team/bind", post(bind_team))
        .route("/admin/team/update", post(update_team_status))
        .route("/admin/team/destination", post(post_destination))
        .route("/admin/user/status", post(update_member_status))
        .route("/admin/team/regroup", post(regroup))
        .route("/admin/team/submit", post(submit_team))
        .route("/admin/team/secret", get(get_team_by_secret))
        .route("/admin/create", post(create_route_admins))
        .route("/admin/logs", get(recent_logs))
        .route("/admin/logs/stream", get(logs_stream))
}

#[derive(Deserialize)]
struct LoginForm {
    account: String,
    password: String,
}

/// POST /admin/login
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginForm>, JsonRejection>,
) -> ApiResult {
    let Json(form) = payload?;
    let admin = state.admins.login(&form.account, &form.password).await?;
    let token = state
        .sessions
        .create_session(Session::new(SessionSubject::Admin(admin.id)))
        .await;
    Ok(success(json!({ "token": token, "admin": admin_view(&admin) })))
}

#[derive(Deserialize)]
struct ScanForm {
    code_type: u32,
    content: String,
}

/// GET /admin/team?code_type=&content=
async fn get_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ScanForm>, QueryRejection>,
) -> ApiResult {
    let admin_id = state.sessions.require_admin(&headers).await?;
    let Query(form) = query?;
    let lookup = TeamLookup::parse(form.code_type, &form.content)?;
    let detail = state.teams.get_team(admin_id, &lookup).await?;
    Ok(success(scanned_team_view(&detail)))
}

#[derive(Deserialize)]
struct BindForm {
    team_id: u32,
    #[serde(rename = "type")]
    bind_type: u32,
    code: String,
}

/// POST /admin/team/bind
async fn bind_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<BindForm>, JsonRejection>,
) -> ApiResult {
    let admin_id = state.sessions.require_admin(&headers).await?;
    let Json(form) = payload?;
    state
        .teams
        .bind_team(admin_id, form.team_id, form.bind_type, &form.code)
        .await?;
    Ok(done())
}

/// POST /admin/team/update
async fn update_team_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ScanForm>, JsonRejection>,
) -> ApiResult {
    let admin_id = state.sessions.require_admin(&headers).await?;
    let Json(form) = payload?;
    let lookup = TeamLookup::parse(form.code_type, &form.content)?;
    let progress = state.teams.update_team_status(admin_id, &lookup).await?;
    Ok(success(json!({ "progress_num": progress })))
}

#[derive(Deserialize)]
struct DestinationForm {
    team_id: u32,
    status: u32,
}

/// POST /admin/team/destination
async fn post_destination(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DestinationForm>, JsonRejection>,
) -> ApiResult {
    let admin_id = state.sessions.require_admin(&headers).await?;
    let Json(form) = payload?;
    let verdict = DestinationVerdict::try_from(form.status)?;
    state
        .teams
        .post_destination(admin_id, form.team_id, verdict)
        .await?;
    Ok(done())
}

#[derive(Deserialize)]
struct MemberStatusEntry {
    user_id: String,
    status: u32,
}

#[derive(Deserialize)]
struct MemberStatusForm {
    list: Vec<MemberStatusEntry>,
}

/// POST /admin/user/status
async fn update_member_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<MemberStatusForm>, JsonRejection>,
) -> ApiResult {
    let admin_id = state.sessions.require_admin(&headers).await?;
    let Json(form) = payload?;
    let marks = form
        .list
        .into_iter()
        .map(|entry| -> Result<(String, MemberMark), WalkError> {
            Ok((entry.user_id, MemberMark::try_from(entry.status)?))
        })
        .collect::<Result<Vec<_>, _>>()?;
    state.members.update_member_status(admin_id, &marks).await?;
    Ok(done())
}

#[derive(Deserialize)]
struct RegroupForm {
    jwts: Vec<String>,
    secret: String,
    route: u8,
}

/// POST /admin/team/regroup
async fn regroup(
    State(state): State<AppState>,
    payload: Result<Json<RegroupForm>, JsonRejection>,
) -> ApiResult {
    let Json(form) = payload?;
    state.config.check_secret(&form.secret)?;
    if form.jwts.is_empty() {
        return Err(WalkError::EmptyGroup);
    }

    let mut seen = HashSet::new();
    if !form.jwts.iter().all(|token| seen.insert(token.as_str())) {
        warn!("Regroup request scanned the same code twice");
        return Err(WalkError::DuplicateScan);
    }

    let mut open_ids = Vec::with_capacity(form.jwts.len());
    for scanned in &form.jwts {
        let open_id = state
            .sessions
            .resolve_participant(scanned)
            .await
            .ok_or(WalkError::ScanError)?;
        open_ids.push(open_id);
    }

    let team_id = state.teams.regroup(&open_ids, form.route).await?;
    Ok(success(json!({ "team_id": team_id })))
}

#[derive(Deserialize)]
struct SecretTeamForm {
    secret: String,
    team_id: u32,
}

/// POST /admin/team/submit
async fn submit_team(
    State(state): State<AppState>,
    payload: Result<Json<SecretTeamForm>, JsonRejection>,
) -> ApiResult {
    let Json(form) = payload?;
    state.config.check_secret(&form.secret)?;
    state.teams.submit_team(form.team_id).await?;
    Ok(done())
}

/// GET /admin/team/secret?secret=&team_id=
async fn get_team_by_secret(
    State(state): State<AppState>,
    query: Result<Query<SecretTeamForm>, QueryRejection>,
) -> ApiResult {
    let Query(form) = query?;
    state.config.check_secret(&form.secret)?;
    let detail = state.teams.get_team_by_id(form.team_id).await?;
    Ok(success(organiser_team_view(&detail)))
}

#[derive(Deserialize)]
struct CreateAdminsForm {
    secret: String,
    #[serde(flatten)]
    groups: RouteAdminGroups,
}

/// POST /admin/create
async fn create_route_admins(
    State(state): State<AppState>,
    payload: Result<Json<CreateAdminsForm>, JsonRejection>,
) -> ApiResult {
    let Json(form) = payload?;
    state.config.check_secret(&form.secret)?;
    let created = state.admins.create_route_admins(&form.groups).await?;
    let views: Vec<_> = created.iter().map(created_admin_view).collect();
    Ok(success(views))
}

#[derive(Deserialize)]
struct LogsQuery {
    secret: String,
    count: Option<usize>,
    /// Minimum level, e.g. "warn"
    level: Option<String>,
}

/// GET /admin/logs?secret=&count=&level=
async fn recent_logs(
    State(state): State<AppState>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    state.config.check_secret(&query.secret)?;
    let min_level = match query.level.as_deref() {
        Some(level) => Some(
            level
                .parse::<tracing::Level>()
                .map_err(|_| WalkError::InvalidParameters)?,
        ),
        None => None,
    };
    let entries = state
        .log_buffer
        .recent(query.count.unwrap_or(DEFAULT_LOG_COUNT), min_level);
    Ok(success(entries))
}

#[derive(Deserialize)]
struct SecretQuery {
    secret: String,
}

/// GET /admin/logs/stream?secret= (SSE)
async fn logs_stream(
    State(state): State<AppState>,
    query: Result<Query<SecretQuery>, QueryRejection>,
) -> Response {
    let checked = query
        .map_err(WalkError::from)
        .and_then(|Query(q)| state.config.check_secret(&q.secret));
    if let Err(e) = checked {
        return e.into_response();
    }

    info!("Log stream client connected");
    let rx = state.log_buffer.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => Some(Ok::<_, Infallible>(Event::default().data(entry.to_json()))),
        // Lagged receivers skip missed entries
        Err(_) => None,
    });

    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("ping"),
        )
        .into_response()
}
