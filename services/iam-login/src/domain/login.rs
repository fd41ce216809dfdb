//! 登录请求与响应

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use keel_common::TenantId;
use keel_errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 登录方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum LoginType {
    #[display("PASSWORD")]
    #[serde(rename = "PASSWORD")]
    Password,
    #[display("SMS")]
    #[serde(rename = "SMS")]
    Sms,
    #[display("OAUTH2")]
    #[serde(rename = "OAUTH2")]
    OAuth2,
    #[display("IAM")]
    #[serde(rename = "IAM")]
    Iam,
}

impl LoginType {
    pub const ALL: [LoginType; 4] = [
        LoginType::Password,
        LoginType::Sms,
        LoginType::OAuth2,
        LoginType::Iam,
    ];

    /// 登录方式标签（区分大小写）
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "PASSWORD",
            Self::Sms => "SMS",
            Self::OAuth2 => "OAUTH2",
            Self::Iam => "IAM",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl FromStr for LoginType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| AppError::unsupported_login_type(s))
    }
}

/// 登录请求
///
/// `identifier` 随登录方式表示用户名、手机号、提供商或应用标识，
/// `secret` 表示密码、验证码或授权码。
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
    pub device_id: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub tenant_code: Option<String>,
    #[serde(default)]
    pub custom_params: HashMap<String, Value>,
}

impl LoginRequest {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_client(mut self, ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_params.insert(key.into(), value.into());
        self
    }

    /// 标识与凭证都非空
    pub fn has_credentials(&self) -> bool {
        !self.identifier.trim().is_empty() && !self.secret.is_empty()
    }

    /// 设备 ID，为空时使用默认值
    pub fn device_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.device_id.as_deref() {
            Some(device) if !device.is_empty() => device,
            _ => default,
        }
    }

    /// 读取字符串类型的自定义参数
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.custom_params.get(key).and_then(Value::as_str)
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("secret", &"[REDACTED]")
            .field("device_id", &self.device_id)
            .field("client_ip", &self.client_ip)
            .field("tenant_id", &self.tenant_id)
            .field("tenant_code", &self.tenant_code)
            .finish_non_exhaustive()
    }
}

/// 用户信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dept_id: Option<String>,
}

/// 登录响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserInfo,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// 访问令牌有效期（秒）
    pub expires_in: i64,
}
