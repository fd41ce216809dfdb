//! keel-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范，每个错误带有稳定的错误码。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// 用户不存在与密码错误对外一致，避免用户枚举
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is locked, please retry in {retry_after_minutes} minutes")]
    AccountLocked { retry_after_minutes: i64 },

    #[error("Account disabled: {0}")]
    AccountDisabled(String),

    #[error("Verification code is invalid or expired")]
    InvalidOrExpiredCode,

    #[error("Too many requests, please retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: i64 },

    #[error("Unsupported login type: {0}")]
    UnsupportedLoginType(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Identity not found")]
    IdentityNotFound,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn account_locked(retry_after_minutes: i64) -> Self {
        Self::AccountLocked {
            retry_after_minutes,
        }
    }

    pub fn account_disabled(msg: impl Into<String>) -> Self {
        Self::AccountDisabled(msg.into())
    }

    pub fn rate_limited(retry_after_secs: i64) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn unsupported_login_type(login_type: impl Into<String>) -> Self {
        Self::UnsupportedLoginType(login_type.into())
    }

    pub fn unsupported_provider(provider: impl Into<String>) -> Self {
        Self::UnsupportedProvider(provider.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 稳定的错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountLocked { .. } => "ACCOUNT_LOCKED",
            Self::AccountDisabled(_) => "ACCOUNT_DISABLED",
            Self::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::UnsupportedLoginType(_) => "UNSUPPORTED_LOGIN_TYPE",
            Self::UnsupportedProvider(_) => "UNSUPPORTED_PROVIDER",
            Self::IdentityNotFound => "IDENTITY_NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::InvalidCredentials => 401,
            Self::AccountLocked { .. } => 423,
            Self::AccountDisabled(_) => 403,
            Self::InvalidOrExpiredCode => 401,
            Self::RateLimited { .. } => 429,
            Self::UnsupportedLoginType(_) => 400,
            Self::UnsupportedProvider(_) => 400,
            Self::IdentityNotFound => 404,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::ExternalService(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// 对调用方可见的消息
    ///
    /// 内部错误不透出下游细节。
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Request failed, please try again later".to_string(),
            Self::ExternalService(_) => "Upstream service unavailable".to_string(),
            other => other.to_string(),
        }
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: self.problem_type(),
            title: self.problem_title().to_string(),
            status: self.status_code(),
            code: self.code().to_string(),
            detail: self.public_message(),
            instance: None,
        }
    }

    /// 转换为线上错误体
    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_string(),
            message: self.public_message(),
        }
    }

    fn problem_type(&self) -> String {
        let slug = self.code().to_ascii_lowercase().replace('_', "-");
        format!("https://api.keel.dev/problems/{}", slug)
    }

    fn problem_title(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::InvalidCredentials => "Invalid Credentials",
            Self::AccountLocked { .. } => "Account Locked",
            Self::AccountDisabled(_) => "Account Disabled",
            Self::InvalidOrExpiredCode => "Invalid Or Expired Code",
            Self::RateLimited { .. } => "Too Many Requests",
            Self::UnsupportedLoginType(_) => "Unsupported Login Type",
            Self::UnsupportedProvider(_) => "Unsupported Provider",
            Self::IdentityNotFound => "Identity Not Found",
            Self::Unauthorized(_) => "Unauthorized",
            Self::Forbidden(_) => "Forbidden",
            Self::ExternalService(_) => "External Service Error",
            Self::Internal(_) => "Internal Server Error",
        }
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    /// 扩展字段：稳定错误码
    pub code: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// 线上错误体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
