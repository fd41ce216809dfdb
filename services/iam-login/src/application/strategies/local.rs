//! 本地凭证登录模板
//!
//! 密码与短信验证码登录共用同一流程：
//! 校验凭证 → 检查账户状态 → 更新登录信息 → 签发令牌 → 写审计。

use std::sync::Arc;

use async_trait::async_trait;
use keel_common::Clock;
use keel_errors::{AppError, AppResult};

use super::{AuditRecorder, LoginStrategy, public_error, validate_device};
use crate::application::token_issuer::{DEFAULT_DEVICE, TokenIssuer};
use crate::domain::{Identity, IdentityRepository, LoginRequest, LoginResponse, LoginType};

/// 认证被拒绝
///
/// `error` 返回给调用方，`audit_message` 只写入审计。
/// 用户不存在与密码错误对外是同一个错误，只有审计信息不同。
#[derive(Debug)]
pub struct LoginRejection {
    pub error: AppError,
    pub audit_message: String,
}

impl LoginRejection {
    pub fn new(error: AppError, audit_message: impl Into<String>) -> Self {
        Self {
            error,
            audit_message: audit_message.into(),
        }
    }

    /// 协作方（仓储、锁定存储等）返回的错误
    pub fn collaborator(login_type: LoginType, error: AppError) -> Self {
        let (error, audit_message) = public_error(login_type, error);
        Self {
            error,
            audit_message,
        }
    }
}

/// 凭证校验
#[async_trait]
pub trait CredentialCheck: Send + Sync {
    fn login_type(&self) -> LoginType;

    fn validate(&self, request: &LoginRequest) -> AppResult<()>;

    /// 校验凭证并返回身份
    async fn verify(&self, request: &LoginRequest) -> Result<Identity, LoginRejection>;

    /// 凭证校验通过后的处理
    async fn on_verified(&self, _request: &LoginRequest, _identity: &Identity) -> AppResult<()> {
        Ok(())
    }

    fn success_message(&self) -> &'static str;
}

/// 本地凭证登录策略
pub struct LocalLoginStrategy<C> {
    check: C,
    identities: Arc<dyn IdentityRepository>,
    audit: AuditRecorder,
    issuer: TokenIssuer,
    clock: Arc<dyn Clock>,
}

impl<C: CredentialCheck> LocalLoginStrategy<C> {
    pub fn new(
        check: C,
        identities: Arc<dyn IdentityRepository>,
        audit: AuditRecorder,
        issuer: TokenIssuer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            check,
            identities,
            audit,
            issuer,
            clock,
        }
    }

    async fn reject(&self, request: &LoginRequest, rejection: LoginRejection) -> AppError {
        self.audit
            .failure(request, self.check.login_type(), &rejection.audit_message)
            .await;
        rejection.error
    }

    /// 更新最后登录时间与 IP，失败不影响登录
    async fn touch_login(&self, request: &LoginRequest, identity: &mut Identity) {
        identity.record_login(self.clock.now(), request.client_ip.as_deref());
        if let Err(e) = self.identities.update(identity).await {
            tracing::warn!(
                username = %identity.username,
                error = %e,
                "Failed to update login metadata"
            );
        }
    }
}

#[async_trait]
impl<C: CredentialCheck> LoginStrategy for LocalLoginStrategy<C> {
    fn login_type(&self) -> LoginType {
        self.check.login_type()
    }

    fn validate(&self, request: &LoginRequest) -> AppResult<()> {
        self.check.validate(request)?;
        validate_device(request)
    }

    async fn authenticate(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        let login_type = self.check.login_type();

        let mut identity = match self.check.verify(request).await {
            Ok(identity) => identity,
            Err(rejection) => return Err(self.reject(request, rejection).await),
        };

        if let Err(e) = self.check.on_verified(request, &identity).await {
            let rejection = LoginRejection::collaborator(login_type, e);
            return Err(self.reject(request, rejection).await);
        }

        if let Some(reason) = identity.status.rejection_reason() {
            tracing::info!(username = %identity.username, status = ?identity.status, "Inactive account rejected");
            let rejection = LoginRejection::new(AppError::account_disabled(reason), reason);
            return Err(self.reject(request, rejection).await);
        }

        self.touch_login(request, &mut identity).await;

        let device = request.device_or(DEFAULT_DEVICE);
        match self
            .issuer
            .issue(&identity, login_type, device, request.tenant_id.as_ref())
        {
            Ok(response) => {
                self.audit
                    .success(request, login_type, self.check.success_message())
                    .await;
                Ok(response)
            }
            Err(e) => {
                let rejection = LoginRejection::collaborator(login_type, e);
                Err(self.reject(request, rejection).await)
            }
        }
    }
}
