//! 登录令牌签发

use std::sync::Arc;

use keel_auth_core::{ClaimMap, TokenProvider};
use keel_common::TenantId;
use keel_errors::{AppError, AppResult};
use serde_json::json;

use super::app_token_service::APP_AUDIENCE;
use crate::domain::{Identity, LoginResponse, LoginType, UserInfo};

/// 未指定设备时的受众，签发与校验共用
pub const DEFAULT_DEVICE: &str = "default_device";
/// IAM 登录未指定设备时的受众
pub const IAM_DEVICE: &str = "iam_device";

pub const CLAIM_USER_ID: &str = "userId";
pub const CLAIM_USERNAME: &str = "username";
pub const CLAIM_NICKNAME: &str = "nickname";
pub const CLAIM_LOGIN_TYPE: &str = "loginType";
pub const CLAIM_TENANT_ID: &str = "tenantId";

/// 用户令牌的设备不能是应用令牌的受众
pub fn ensure_user_device(device_id: &str) -> AppResult<()> {
    if device_id == APP_AUDIENCE {
        return Err(AppError::validation(format!(
            "Device id '{}' is reserved",
            device_id
        )));
    }
    Ok(())
}

/// 为登录成功的身份签发令牌并组装响应
#[derive(Clone)]
pub struct TokenIssuer {
    provider: Arc<TokenProvider>,
}

impl TokenIssuer {
    pub fn new(provider: Arc<TokenProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &TokenProvider {
        &self.provider
    }

    /// 签发访问令牌与刷新令牌，受众为设备 ID
    pub fn issue(
        &self,
        identity: &Identity,
        login_type: LoginType,
        device_id: &str,
        tenant_id: Option<&TenantId>,
    ) -> AppResult<LoginResponse> {
        ensure_user_device(device_id)?;
        let tenant_id = tenant_id.or(identity.tenant_id.as_ref());

        let mut claims = ClaimMap::new();
        claims.insert(CLAIM_USER_ID.to_string(), json!(identity.id.to_string()));
        claims.insert(CLAIM_USERNAME.to_string(), json!(identity.username));
        claims.insert(CLAIM_NICKNAME.to_string(), json!(identity.nickname));
        claims.insert(CLAIM_LOGIN_TYPE.to_string(), json!(login_type.as_str()));
        if let Some(tenant_id) = tenant_id {
            claims.insert(CLAIM_TENANT_ID.to_string(), json!(tenant_id.to_string()));
        }

        let pair = self
            .provider
            .issue_pair(&identity.username, device_id, claims)?;

        Ok(LoginResponse {
            user: UserInfo {
                id: identity.id.to_string(),
                username: identity.username.clone(),
                nickname: identity.nickname.clone(),
                avatar: identity.avatar.clone(),
                tenant_id: tenant_id.map(ToString::to_string),
                dept_id: identity.dept_id.clone(),
            },
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
        })
    }
}
