use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, warn};

use super::{IdentityError, OpenIdProvider};

const ACCESS_TOKEN_URL: &str = "https://api.weixin.qq.com/sns/oauth2/access_token";

/// WeChat OAuth access token response
#[derive(Deserialize)]
struct AccessTokenResponse {
    #[serde(default)]
    openid: String,
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// WeChat web OAuth configuration
#[derive(Clone)]
pub struct WechatClient {
    pub app_id: String,
    pub app_secret: String,
    pub http_client: reqwest::Client,
}

impl WechatClient {
    pub fn new(app_id: &str, app_secret: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            http_client: reqwest::Client::new(),
        }
    }
}

fn interpret(response: AccessTokenResponse) -> Result<String, IdentityError> {
    if response.errcode != 0 {
        return Err(IdentityError::Service(format!(
            "wechat error {}: {}",
            response.errcode, response.errmsg
        )));
    }
    if response.openid.is_empty() {
        return Err(IdentityError::Service("wechat returned no openid".to_string()));
    }
    Ok(response.openid)
}

#[async_trait]
impl OpenIdProvider for WechatClient {
    async fn open_id(&self, code: &str) -> Result<String, IdentityError> {
        if self.app_id.is_empty() {
            warn!("WECHAT_APPID is not set, WeChat login will fail");
        }

        let response = self
            .http_client
            .get(ACCESS_TOKEN_URL)
            .query(&[
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("Failed to exchange WeChat code: {}", e);
                IdentityError::from(e)
            })?;

        let token: AccessTokenResponse = response.json().await?;
        interpret(token)
    }
}
