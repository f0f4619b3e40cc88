//! HTTP server wiring: shared state, router and listener

use axum::{extract::State, response::Response, routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use super::auth::SharedSessionStore;
use super::response::success;
use super::{admin, participant, reports};
use crate::config::ServerConfig;
use crate::identity::OpenIdProvider;
use crate::logging::SharedLogBuffer;
use crate::managers::{
    SharedAdminManager, SharedMemberManager, SharedRegistrationManager, SharedReportManager,
    SharedTeamManager,
};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub sessions: SharedSessionStore,
    pub teams: SharedTeamManager,
    pub members: SharedMemberManager,
    pub registration: SharedRegistrationManager,
    pub admins: SharedAdminManager,
    pub reports: SharedReportManager,
    pub log_buffer: SharedLogBuffer,
    pub wechat: Arc<dyn OpenIdProvider>,
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(participant::routes())
        .merge(admin::routes())
        .merge(reports::routes());

    Router::new()
        .route("/", get(health))
        .nest("/api/v1", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET / reports the event window as seen by the server clock
async fn health(State(state): State<AppState>) -> Response {
    let now = chrono::Local::now().naive_local();
    let window = &state.config.window;
    success(serde_json::json!({
        "status": "ok",
        "event_day": window.day_index(now),
        "check_in_open": window.can_open_api(now),
        "submit_open": window.can_submit(now),
    }))
}

/// Serve the API until the process is stopped
pub async fn start_web_server(state: AppState) -> anyhow::Result<()> {
    let config = state.config.clone();
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired().await;
            if removed > 0 {
                debug!("Removed {} expired sessions", removed);
            }
        }
    });

    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    match (&config.cert_path, &config.key_path) {
        (Some(cert_path), Some(key_path)) => {
            if !cert_path.exists() {
                return Err(anyhow::anyhow!(
                    "Certificate file not found: {}",
                    cert_path.display()
                ));
            }
            if !key_path.exists() {
                return Err(anyhow::anyhow!(
                    "Private key file not found: {}",
                    key_path.display()
                ));
            }

            let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
                .await
                .map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to load TLS certificates: {}\n  Certificate: {}\n  Private key: {}",
                        e,
                        cert_path.display(),
                        key_path.display()
                    )
                })?;

            info!("Web server listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Web server listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
