use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{IdentityError, StudentInfo, StudentVerifier};

// Business codes of the credential service
const CODE_OK: i64 = 0;
const CODE_WRONG_ACCOUNT: i64 = 410;
const CODE_WRONG_PASSWORD: i64 = 411;
const CODE_CLOSED: i64 = 412;
const CODE_NOT_ACTIVATED: i64 = 413;

#[derive(Serialize)]
struct InfoRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct InfoResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<InfoData>,
}

#[derive(Deserialize)]
struct InfoData {
    gender: String,
    #[serde(default)]
    college: String,
}

/// reqwest client for the school credential service
#[derive(Clone)]
pub struct HttpStudentVerifier {
    pub base_url: String,
    pub http_client: reqwest::Client,
}

impl HttpStudentVerifier {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    fn info_url(&self) -> String {
        format!("{}/api/student/info", self.base_url)
    }
}

fn interpret(response: InfoResponse) -> Result<StudentInfo, IdentityError> {
    match response.code {
        CODE_OK => {
            let data = response
                .data
                .ok_or_else(|| IdentityError::Service("response without data".to_string()))?;
            Ok(StudentInfo {
                gender: data.gender,
                college: data.college,
            })
        }
        CODE_WRONG_ACCOUNT => Err(IdentityError::WrongAccount),
        CODE_WRONG_PASSWORD => Err(IdentityError::WrongPassword),
        CODE_CLOSED => Err(IdentityError::Closed),
        CODE_NOT_ACTIVATED => Err(IdentityError::NotActivated),
        other => Err(IdentityError::Service(format!("code {}: {}", other, response.msg))),
    }
}

#[async_trait]
impl StudentVerifier for HttpStudentVerifier {
    async fn verify(&self, stu_id: &str, password: &str) -> Result<StudentInfo, IdentityError> {
        debug!("Verifying student {} against {}", stu_id, self.base_url);

        let response = self
            .http_client
            .post(self.info_url())
            .json(&InfoRequest {
                username: stu_id,
                password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Identity service returned {}: {}", status, text);
            return Err(IdentityError::Service(format!("HTTP {}", status)));
        }

        let body: InfoResponse = response.json().await?;
        interpret(body)
    }
}
