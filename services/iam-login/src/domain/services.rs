//! 外部协作接口

use async_trait::async_trait;
use keel_errors::AppResult;
#[cfg(test)]
use mockall::automock;
use secrecy::Secret;

/// 密码比对
#[cfg_attr(test, automock)]
pub trait PasswordMatcher: Send + Sync {
    /// 明文与哈希是否匹配
    fn matches(&self, plain: &str, hash: &str) -> AppResult<bool>;
}

/// 短信发送
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// 发送验证码短信，返回是否发送成功
    async fn send_verification_code(&self, phone: &str, code: &str) -> AppResult<bool>;
}

/// IAM 授权码交换请求
#[derive(Debug)]
pub struct IamExchangeRequest {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub code: String,
}

/// IAM 返回的用户资料
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct IamUserProfile {
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// IAM 授权码交换
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IamTokenExchange: Send + Sync {
    async fn exchange(&self, request: &IamExchangeRequest) -> AppResult<IamUserProfile>;
}
