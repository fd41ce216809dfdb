//! 第三方登录提供方
//!
//! OAuth2 与 IAM 登录的外部交换由提供方完成，策略只负责参数校验、委托与审计。

mod iam;
mod oauth2;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use keel_common::TenantId;
use keel_errors::{AppError, AppResult};
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use crate::domain::{
    Identity, IdentityRepository, LoginRequest, LoginResponse, ThirdPartyApp,
    ThirdPartyAppRepository,
};

pub use iam::IamLoginProvider;
pub use oauth2::AppCredentialOAuth2Provider;

/// 提供方登录请求
#[derive(Debug, Clone, PartialEq)]
pub struct ThirdPartyLoginRequest {
    /// 应用标识（OAuth2 为提供方名称）
    pub app_id: String,
    /// 授权码
    pub auth_code: String,
    pub device_id: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub custom_params: HashMap<String, Value>,
}

impl ThirdPartyLoginRequest {
    pub fn from_login(request: &LoginRequest) -> Self {
        Self {
            app_id: request.identifier.trim().to_string(),
            auth_code: request.secret.clone(),
            device_id: request.device_id.clone(),
            tenant_id: request.tenant_id.clone(),
            client_ip: request.client_ip.clone(),
            user_agent: request.user_agent.clone(),
            custom_params: request.custom_params.clone(),
        }
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.custom_params.get(key).and_then(Value::as_str)
    }

    pub fn device_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.device_id.as_deref() {
            Some(device) if !device.is_empty() => device,
            _ => default,
        }
    }
}

/// 第三方登录提供方
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ThirdPartyLoginProvider: Send + Sync {
    async fn login(&self, request: &ThirdPartyLoginRequest) -> AppResult<LoginResponse>;
}

/// 取出已启用且具备指定权限的应用
pub(crate) async fn require_app(
    apps: &dyn ThirdPartyAppRepository,
    app_key: &str,
    permission: &str,
) -> AppResult<ThirdPartyApp> {
    let app = apps
        .find_by_app_key(app_key)
        .await?
        .ok_or_else(|| AppError::unauthorized("Unknown application"))?;

    if !app.enabled {
        return Err(AppError::unauthorized("Application is disabled"));
    }
    if !app.has_permission(permission) {
        tracing::warn!(app_key = %app_key, permission, "Application lacks login permission");
        return Err(AppError::forbidden(format!(
            "Application is not allowed to perform {}",
            permission
        )));
    }
    Ok(app)
}

/// 查找本地身份，首次登录时创建
///
/// 已存在但被停用的身份返回 `AccountDisabled`。
pub(crate) async fn find_or_provision(
    identities: &Arc<dyn IdentityRepository>,
    username: &str,
    nickname: &str,
    tenant_id: Option<&TenantId>,
) -> AppResult<Identity> {
    if let Some(identity) = identities.find_by_username(username, tenant_id).await? {
        if let Some(reason) = identity.status.rejection_reason() {
            return Err(AppError::account_disabled(reason));
        }
        return Ok(identity);
    }

    let identity = Identity::provisioned(username, nickname, tenant_id.cloned());
    identities.create(&identity).await?;
    tracing::info!(username = %username, "Provisioned identity for third-party login");
    Ok(identity)
}
