//! IAM 授权码交换 HTTP 客户端

use std::time::Duration;

use async_trait::async_trait;
use keel_config::IamConfig;
use keel_errors::{AppError, AppResult};
use secrecy::ExposeSecret;

use crate::domain::{IamExchangeRequest, IamTokenExchange, IamUserProfile};

/// 以表单 POST `{server_url}/oauth2/token` 交换授权码
#[derive(Debug, Clone)]
pub struct HttpIamTokenExchange {
    client: reqwest::Client,
    token_url: String,
}

impl HttpIamTokenExchange {
    pub fn new(config: &IamConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build IAM client: {}", e)))?;

        Ok(Self {
            client,
            token_url: token_url(&config.server_url),
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

fn token_url(server_url: &str) -> String {
    format!("{}/oauth2/token", server_url.trim_end_matches('/'))
}

#[async_trait]
impl IamTokenExchange for HttpIamTokenExchange {
    async fn exchange(&self, request: &IamExchangeRequest) -> AppResult<IamUserProfile> {
        let form = [
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.expose_secret().as_str()),
            ("code", request.code.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::external_service(format!("IAM request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, client_id = %request.client_id, "IAM rejected authorization code");
            return Err(AppError::unauthorized(format!(
                "IAM authentication failed with status {}",
                status
            )));
        }

        response
            .json::<IamUserProfile>()
            .await
            .map_err(|e| AppError::external_service(format!("Invalid IAM response: {}", e)))
    }
}
