//! 登录服务
//!
//! 登录、验证码发送、会话刷新与访问令牌认证的入口。
//! 租户与客户端信息来自调用方显式传入的 `RequestContext`。

use std::sync::Arc;

use keel_common::{Principal, RequestContext, TenantId};
use keel_errors::{AppError, AppResult};
use tracing::Instrument;

use super::sms_code_service::SmsCodeService;
use super::strategy_factory::LoginStrategyFactory;
use super::token_issuer::{
    CLAIM_LOGIN_TYPE, CLAIM_TENANT_ID, CLAIM_USER_ID, DEFAULT_DEVICE, TokenIssuer,
    ensure_user_device,
};
use crate::domain::{IdentityRepository, LoginRequest, LoginResponse, LoginType};
use crate::infrastructure::observability::metrics;

pub struct LoginService {
    factory: Arc<LoginStrategyFactory>,
    sms: Arc<SmsCodeService>,
    issuer: TokenIssuer,
    identities: Arc<dyn IdentityRepository>,
}

impl LoginService {
    pub fn new(
        factory: Arc<LoginStrategyFactory>,
        sms: Arc<SmsCodeService>,
        issuer: TokenIssuer,
        identities: Arc<dyn IdentityRepository>,
    ) -> Self {
        Self {
            factory,
            sms,
            issuer,
            identities,
        }
    }

    pub fn factory(&self) -> &LoginStrategyFactory {
        &self.factory
    }

    /// 按登录方式登录
    pub async fn login(
        &self,
        ctx: &RequestContext,
        login_type: &str,
        request: LoginRequest,
    ) -> AppResult<LoginResponse> {
        let span = tracing::info_span!(
            "login",
            login_type = %login_type,
            tenant_id = ?ctx.tenant().tenant_id(),
            request_id = %ctx.request_id(),
        );

        async move {
            let strategy = self.factory.resolve(login_type)?;
            let request = merge_context(ctx, request);

            let result = strategy.login(&request).await;

            metrics::record_login_attempt(strategy.login_type().as_str(), result.is_ok());
            match &result {
                Ok(response) => {
                    tracing::info!(username = %response.user.username, "Login succeeded")
                }
                Err(e) => tracing::info!(error_code = e.code(), "Login rejected"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// 发送短信验证码
    pub async fn send_sms_code(&self, ctx: &RequestContext, phone: &str) -> AppResult<bool> {
        let span = tracing::info_span!("send_sms_code", request_id = %ctx.request_id());
        self.sms.issue_code(phone).instrument(span).await
    }

    /// 用刷新令牌换取新的令牌对
    ///
    /// 重新读取身份并检查状态；设备须与签发时一致。
    pub async fn refresh(
        &self,
        refresh_token: &str,
        device_id: Option<&str>,
    ) -> AppResult<LoginResponse> {
        let device = device_or_default(device_id);
        ensure_user_device(device)?;
        let claims = self.issuer.provider().verify(refresh_token, device)?;
        if !claims.is_refresh_token() {
            return Err(AppError::unauthorized("Not a refresh token"));
        }

        let tenant_id = claims
            .claim_str(CLAIM_TENANT_ID)
            .and_then(|t| TenantId::from_string(t).ok());

        let identity = self
            .identities
            .find_by_username(&claims.sub, tenant_id.as_ref())
            .await?
            .ok_or_else(|| AppError::unauthorized("Identity no longer exists"))?;
        if let Some(reason) = identity.status.rejection_reason() {
            return Err(AppError::account_disabled(reason));
        }

        let login_type = claims
            .claim_str(CLAIM_LOGIN_TYPE)
            .and_then(LoginType::from_tag)
            .unwrap_or(LoginType::Password);

        tracing::info!(username = %identity.username, device = %device, "Session refreshed");
        self.issuer
            .issue(&identity, login_type, device, tenant_id.as_ref())
    }

    /// 校验访问令牌，返回带调用者身份的上下文
    pub fn authenticate_bearer(
        &self,
        ctx: RequestContext,
        token: &str,
        device_id: Option<&str>,
    ) -> AppResult<RequestContext> {
        let device = device_or_default(device_id);
        ensure_user_device(device)?;
        let claims = self.issuer.provider().verify(token, device)?;
        if !claims.is_access_token() {
            return Err(AppError::unauthorized("Not an access token"));
        }

        let principal = Principal {
            subject: claims.sub.clone(),
            audience: claims.aud.clone(),
            user_id: claims.claim_str(CLAIM_USER_ID).map(str::to_string),
        };

        let mut ctx = ctx.with_principal(principal);
        if !ctx.tenant().has_tenant_id() {
            if let Some(tenant_id) = claims
                .claim_str(CLAIM_TENANT_ID)
                .and_then(|t| TenantId::from_string(t).ok())
            {
                let tenant = ctx.tenant().clone().with_tenant_id(tenant_id);
                ctx = ctx.with_tenant(tenant);
            }
        }
        Ok(ctx)
    }
}

fn device_or_default(device_id: Option<&str>) -> &str {
    device_id
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DEVICE)
}

/// 请求中未携带的租户与客户端信息从上下文补齐
fn merge_context(ctx: &RequestContext, mut request: LoginRequest) -> LoginRequest {
    if request.tenant_id.is_none() {
        request.tenant_id = ctx.tenant().tenant_id().cloned();
    }
    if request.tenant_code.is_none() {
        request.tenant_code = ctx.tenant().tenant_code().map(str::to_string);
    }
    if request.client_ip.is_none() {
        request.client_ip = ctx.client_ip().map(str::to_string);
    }
    if request.user_agent.is_none() {
        request.user_agent = ctx.user_agent().map(str::to_string);
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_common::TenantContext;

    #[test]
    fn test_merge_context_fills_missing_fields_only() {
        let tenant_id = TenantId::new();
        let ctx = RequestContext::new(
            TenantContext::anonymous()
                .with_tenant_id(tenant_id.clone())
                .with_tenant_code("acme"),
        )
        .with_client(Some("10.0.0.1".to_string()), Some("curl/8".to_string()));

        let merged = merge_context(&ctx, LoginRequest::new("alice", "pw"));
        assert_eq!(merged.tenant_id, Some(tenant_id));
        assert_eq!(merged.tenant_code.as_deref(), Some("acme"));
        assert_eq!(merged.client_ip.as_deref(), Some("10.0.0.1"));

        let explicit = LoginRequest::new("alice", "pw").with_client("192.168.1.1", "Firefox");
        let merged = merge_context(&ctx, explicit);
        assert_eq!(merged.client_ip.as_deref(), Some("192.168.1.1"));
        assert_eq!(merged.user_agent.as_deref(), Some("Firefox"));
    }

    #[test]
    fn test_device_defaults_to_issuing_default() {
        assert_eq!(device_or_default(None), DEFAULT_DEVICE);
        assert_eq!(device_or_default(Some("")), DEFAULT_DEVICE);
        assert_eq!(device_or_default(Some("ios")), "ios");
    }
}
