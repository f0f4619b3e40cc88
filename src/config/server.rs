use std::path::PathBuf;
use tracing::warn;

use super::event_window::EventWindow;

/// Server settings read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shared secret for the event organisers' endpoints
    pub secret: String,
    pub port: u16,
    pub state_path: String,
    pub data_path: String,
    /// TLS is used when both paths are set
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub wechat_app_id: String,
    pub wechat_secret: String,
    pub identity_service_url: String,
    pub window: EventWindow,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            port: 8080,
            state_path: "state".to_string(),
            data_path: "data".to_string(),
            cert_path: None,
            key_path: None,
            wechat_app_id: String::new(),
            wechat_secret: String::new(),
            identity_service_url: "http://localhost:9000".to_string(),
            window: EventWindow::default(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let start = std::env::var("EVENT_START_DATE").ok().and_then(|value| {
            EventWindow::parse_start(&value)
                .map_err(|e| warn!("Ignoring EVENT_START_DATE: {}", e))
                .ok()
        });
        let enforce = std::env::var("EVENT_ENFORCE_WINDOW")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let secret = std::env::var("SERVER_SECRET").unwrap_or_default();
        if secret.is_empty() {
            warn!("SERVER_SECRET is not set, organiser endpoints will reject every request");
        }

        Self {
            secret,
            port: std::env::var("WEB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            state_path: std::env::var("STATE_PATH").unwrap_or(defaults.state_path),
            data_path: std::env::var("DATA_PATH").unwrap_or(defaults.data_path),
            cert_path: std::env::var("TLS_CERT_PATH").ok().map(PathBuf::from),
            key_path: std::env::var("TLS_KEY_PATH").ok().map(PathBuf::from),
            wechat_app_id: std::env::var("WECHAT_APPID").unwrap_or_default(),
            wechat_secret: std::env::var("WECHAT_SECRET").unwrap_or_default(),
            identity_service_url: std::env::var("IDENTITY_SERVICE_URL")
                .unwrap_or(defaults.identity_service_url),
            window: EventWindow::new(start, enforce),
        }
    }

    /// Organiser endpoints compare against the configured secret; an unset secret never matches
    pub fn check_secret(&self, provided: &str) -> crate::error::Result<()> {
        if self.secret.is_empty() || provided != self.secret {
            return Err(crate::error::WalkError::WrongSecret);
        }
        Ok(())
    }

    pub fn database_path(&self) -> String {
        format!("{}/event_database.json", self.state_path)
    }

    pub fn routes_path(&self) -> String {
        format!("{}/routes.json", self.data_path)
    }
}
