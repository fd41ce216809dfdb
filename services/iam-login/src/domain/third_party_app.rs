//! 第三方应用

use async_trait::async_trait;
use keel_errors::AppResult;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// OAuth2 登录所需权限
pub const PERMISSION_OAUTH2_LOGIN: &str = "OAUTH2_LOGIN";
/// IAM 登录所需权限
pub const PERMISSION_IAM_LOGIN: &str = "IAM_LOGIN";

/// 已注册的第三方应用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThirdPartyApp {
    pub id: String,
    pub app_key: String,
    #[serde(skip_serializing)]
    pub app_secret: String,
    pub app_name: String,
    pub enabled: bool,
    pub permissions: Vec<String>,
}

impl ThirdPartyApp {
    pub fn new(
        id: impl Into<String>,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            app_name: app_name.into(),
            enabled: true,
            permissions: Vec::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// 比较密钥摘要，长度固定
    pub fn secret_matches(&self, candidate: &str) -> bool {
        let expected = Sha256::digest(self.app_secret.as_bytes());
        let actual = Sha256::digest(candidate.as_bytes());
        expected
            .iter()
            .zip(actual.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// 第三方应用仓储
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ThirdPartyAppRepository: Send + Sync {
    async fn find_by_app_key(&self, app_key: &str) -> AppResult<Option<ThirdPartyApp>>;
}
