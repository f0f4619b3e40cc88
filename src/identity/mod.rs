//! Clients for the external identity services
//!
//! The school credential service confirms a student's account and provides
//! gender and college; WeChat OAuth turns a login code into an open id.

mod school;
mod wechat;

use async_trait::async_trait;
use thiserror::Error;

pub use school::HttpStudentVerifier;
pub use wechat::WechatClient;

/// Profile returned by the school credential service
#[derive(Debug, Clone, PartialEq)]
pub struct StudentInfo {
    /// "male" or "female"
    pub gender: String,
    pub college: String,
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("wrong account")]
    WrongAccount,

    #[error("wrong password")]
    WrongPassword,

    #[error("service closed at night")]
    Closed,

    #[error("account not activated")]
    NotActivated,

    #[error("identity service error: {0}")]
    Service(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::Service(err.to_string())
    }
}

/// Verifies student credentials against the school
#[async_trait]
pub trait StudentVerifier: Send + Sync {
    async fn verify(&self, stu_id: &str, password: &str) -> Result<StudentInfo, IdentityError>;
}

/// Resolves a WeChat OAuth code to the user's open id
#[async_trait]
pub trait OpenIdProvider: Send + Sync {
    async fn open_id(&self, code: &str) -> Result<String, IdentityError>;
}
