//! 登录策略
//!
//! 每种登录方式一个策略：先 `validate` 校验请求（不改变任何状态），
//! 再 `authenticate` 完成认证。每次认证无论成败都恰好写一条审计记录。

mod iam;
mod local;
mod oauth2;
mod password;
mod sms;

use std::sync::Arc;

use async_trait::async_trait;
use keel_common::Clock;
use keel_errors::{AppError, AppResult};

use crate::application::providers::{ThirdPartyLoginProvider, ThirdPartyLoginRequest};
use crate::application::token_issuer::ensure_user_device;
use crate::domain::{AuditSink, LoginAuditEntry, LoginRequest, LoginResponse, LoginType};

pub use iam::IamLoginStrategy;
pub use local::{CredentialCheck, LocalLoginStrategy, LoginRejection};
pub use oauth2::OAuth2LoginStrategy;
pub use password::{PasswordCheck, PasswordLoginStrategy};
pub use sms::{SmsCodeCheck, SmsLoginStrategy};

/// 登录策略
#[async_trait]
pub trait LoginStrategy: Send + Sync {
    fn login_type(&self) -> LoginType;

    /// 校验请求参数
    fn validate(&self, request: &LoginRequest) -> AppResult<()>;

    /// 认证并签发令牌
    async fn authenticate(&self, request: &LoginRequest) -> AppResult<LoginResponse>;

    async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        self.validate(request)?;
        self.authenticate(request).await
    }
}

/// 审计写入
///
/// 写入失败只记录日志，不影响认证结果。
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>, clock: Arc<dyn Clock>) -> Self {
        Self { sink, clock }
    }

    pub async fn record(
        &self,
        request: &LoginRequest,
        login_type: LoginType,
        success: bool,
        message: &str,
    ) {
        let entry = LoginAuditEntry::new(
            request.identifier.clone(),
            success,
            message,
            login_type,
            request.tenant_id.clone(),
            request.client_ip.clone(),
            request.user_agent.clone(),
            self.clock.now(),
        );

        if let Err(e) = self.sink.record(entry).await {
            tracing::warn!(
                identifier = %request.identifier,
                login_type = %login_type,
                error = %e,
                "Failed to write login audit entry"
            );
        }
    }

    pub async fn success(&self, request: &LoginRequest, login_type: LoginType, message: &str) {
        self.record(request, login_type, true, message).await;
    }

    pub async fn failure(&self, request: &LoginRequest, login_type: LoginType, message: &str) {
        self.record(request, login_type, false, message).await;
    }
}

/// 请求携带的设备 ID 不能是保留受众
pub(crate) fn validate_device(request: &LoginRequest) -> AppResult<()> {
    match request.device_id.as_deref() {
        Some(device) => ensure_user_device(device),
        None => Ok(()),
    }
}

/// 委托第三方提供方完成登录并写审计
pub(crate) async fn delegate_to_provider(
    provider: &dyn ThirdPartyLoginProvider,
    audit: &AuditRecorder,
    login_type: LoginType,
    request: &LoginRequest,
    provider_request: ThirdPartyLoginRequest,
) -> AppResult<LoginResponse> {
    match provider.login(&provider_request).await {
        Ok(response) => {
            audit
                .success(request, login_type, &format!("{} login succeeded", login_type))
                .await;
            Ok(response)
        }
        Err(e) => {
            let (error, audit_message) = public_error(login_type, e);
            audit.failure(request, login_type, &audit_message).await;
            Err(error)
        }
    }
}

/// 认证阶段对外的错误
///
/// 协作方的意外错误转换为 `Internal`，原始信息只进入日志与审计。
pub(crate) fn public_error(login_type: LoginType, error: AppError) -> (AppError, String) {
    match error {
        AppError::Internal(detail) | AppError::ExternalService(detail) => {
            tracing::error!(login_type = %login_type, error = %detail, "Login collaborator failed");
            let audit = format!("Login error: {}", detail);
            (AppError::internal(detail), audit)
        }
        other => {
            let audit = other.to_string();
            (other, audit)
        }
    }
}
