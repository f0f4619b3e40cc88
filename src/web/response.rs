//! JSON envelope shared by every endpoint

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::WalkError;

const CODE_OK: i32 = 200;
const CODE_ERROR: i32 = -1;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    pub data: Option<T>,
}

/// Successful envelope around `data`
pub fn success<T: Serialize>(data: T) -> Response {
    Json(ApiResponse {
        code: CODE_OK,
        msg: "ok".to_string(),
        data: Some(data),
    })
    .into_response()
}

/// Successful envelope with `data: null`
pub fn done() -> Response {
    success(serde_json::Value::Null)
}

pub type ApiResult = std::result::Result<Response, WalkError>;

impl IntoResponse for WalkError {
    fn into_response(self) -> Response {
        let status = if self.is_auth_failure() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::OK
        };

        match &self {
            WalkError::Internal { .. }
            | WalkError::StateSave { .. }
            | WalkError::StateLoad { .. }
            | WalkError::Upstream { .. } => error!("Request failed: {}", self),
            _ => debug!("Request rejected: {}", self),
        }

        let body = ApiResponse::<()> {
            code: CODE_ERROR,
            msg: self.to_string(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for WalkError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Malformed JSON body: {}", rejection.body_text());
        WalkError::InvalidParameters
    }
}

impl From<QueryRejection> for WalkError {
    fn from(rejection: QueryRejection) -> Self {
        debug!("Malformed query: {}", rejection.body_text());
        WalkError::InvalidParameters
    }
}
