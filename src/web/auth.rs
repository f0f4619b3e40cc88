//! Bearer session tokens for route admins and participants
//!
//! Admins log in with account and password, participants through WeChat
//! OAuth. Both receive an opaque token that expires after 24 hours.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{Result, WalkError};

const SESSION_LIFETIME_SECS: u64 = 86400;

/// Who a session belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSubject {
    Admin(u32),
    Participant(String),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub subject: SessionSubject,
    pub created_at: u64,
    pub expires_at: u64,
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl Session {
    pub fn new(subject: SessionSubject) -> Self {
        let now = now_secs();
        Self {
            subject,
            created_at: now,
            expires_at: now + SESSION_LIFETIME_SECS,
        }
    }

    pub fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at
    }
}

/// Maps session tokens to sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_session(&self, session: Session) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    /// None if expired or unknown
    pub async fn get_session(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(token).filter(|s| !s.is_expired()).cloned()
    }

    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn insert(&self, token: &str, session: Session) {
        self.sessions.write().await.insert(token.to_string(), session);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedSessionStore = Arc<SessionStore>;

pub fn create_session_store() -> SharedSessionStore {
    Arc::new(SessionStore::new())
}

/// Token from a `Bearer <token>` value
pub fn parse_bearer(value: &str) -> Option<&str> {
    let token = value.trim().strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_bearer)
}

impl SessionStore {
    async fn subject(&self, headers: &HeaderMap) -> Result<SessionSubject> {
        let token = bearer_token(headers).ok_or(WalkError::Unauthorized)?;
        self.get_session(token)
            .await
            .map(|s| s.subject)
            .ok_or(WalkError::Unauthorized)
    }

    /// Admin id behind the request's bearer token
    pub async fn require_admin(&self, headers: &HeaderMap) -> Result<u32> {
        match self.subject(headers).await? {
            SessionSubject::Admin(id) => Ok(id),
            SessionSubject::Participant(_) => Err(WalkError::Unauthorized),
        }
    }

    /// Participant open id behind the request's bearer token
    pub async fn require_participant(&self, headers: &HeaderMap) -> Result<String> {
        match self.subject(headers).await? {
            SessionSubject::Participant(open_id) => Ok(open_id),
            SessionSubject::Admin(_) => Err(WalkError::Unauthorized),
        }
    }

    /// Open id of a participant from a scanned `Bearer <token>` code
    pub async fn resolve_participant(&self, scanned: &str) -> Option<String> {
        let token = parse_bearer(scanned)?;
        match self.get_session(token).await?.subject {
            SessionSubject::Participant(open_id) => Some(open_id),
            SessionSubject::Admin(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("  Bearer  abc "), Some("abc"));
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("abc"), None);
    }

    #[tokio::test]
    async fn test_subject_kinds_are_enforced() {
        let store = SessionStore::new();
        let admin = store
            .create_session(Session::new(SessionSubject::Admin(4)))
            .await;
        let walker = store
            .create_session(Session::new(SessionSubject::Participant("o1".to_string())))
            .await;

        let admin_headers = headers(&format!("Bearer {}", admin));
        let walker_headers = headers(&format!("Bearer {}", walker));

        assert_eq!(store.require_admin(&admin_headers).await.unwrap(), 4);
        assert!(store.require_admin(&walker_headers).await.is_err());
        assert_eq!(
            store.require_participant(&walker_headers).await.unwrap(),
            "o1"
        );
        assert!(store.require_participant(&admin_headers).await.is_err());
        assert!(store.require_admin(&HeaderMap::new()).await.is_err());

        assert_eq!(
            store.resolve_participant(&format!("Bearer {}", walker)).await,
            Some("o1".to_string())
        );
        assert_eq!(
            store.resolve_participant(&format!("Bearer {}", admin)).await,
            None
        );
    }

    #[tokio::test]
    async fn test_expired_sessions() {
        let store = SessionStore::new();
        let mut stale = Session::new(SessionSubject::Admin(1));
        stale.expires_at = stale.created_at.saturating_sub(1);
        store.insert("stale", stale).await;
        store
            .insert("fresh", Session::new(SessionSubject::Admin(2)))
            .await;

        assert!(store.get_session("stale").await.is_none());
        assert_eq!(store.cleanup_expired().await, 1);
        assert!(store.get_session("fresh").await.is_some());
    }
}
