//! 登录身份

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keel_common::{TenantId, UserId};
use keel_errors::AppResult;
use serde::{Deserialize, Serialize};

/// 账户状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityStatus {
    Enabled,
    Disabled,
    /// 已离职
    Resigned,
}

impl IdentityStatus {
    /// 从存储状态码转换（0 禁用，1 启用，2 离职）
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Disabled,
            2 => Self::Resigned,
            _ => Self::Enabled,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
            Self::Resigned => 2,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// 拒绝登录时的原因
    pub fn rejection_reason(&self) -> Option<&'static str> {
        match self {
            Self::Enabled => None,
            Self::Disabled => Some("Account has been disabled"),
            Self::Resigned => Some("Account owner has resigned"),
        }
    }
}

/// 登录身份
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub tenant_id: Option<TenantId>,
    pub username: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub dept_id: Option<String>,
    pub phone: Option<String>,
    /// Argon2 PHC 字符串，第三方开通的身份为空
    pub password_hash: String,
    pub status: IdentityStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id: UserId::new(),
            tenant_id: None,
            nickname: username.clone(),
            username,
            avatar: None,
            dept_id: None,
            phone: None,
            password_hash: password_hash.into(),
            status: IdentityStatus::Enabled,
            last_login_at: None,
            last_login_ip: None,
        }
    }

    /// 第三方登录首次使用时开通的本地身份
    pub fn provisioned(
        username: impl Into<String>,
        nickname: impl Into<String>,
        tenant_id: Option<TenantId>,
    ) -> Self {
        let mut identity = Self::new(username, "");
        identity.nickname = nickname.into();
        identity.tenant_id = tenant_id;
        identity
    }

    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = nickname.into();
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_status(mut self, status: IdentityStatus) -> Self {
        self.status = status;
        self
    }

    pub fn has_password(&self) -> bool {
        !self.password_hash.is_empty()
    }

    /// 记录登录时间与 IP
    pub fn record_login(&mut self, at: DateTime<Utc>, ip: Option<&str>) {
        self.last_login_at = Some(at);
        self.last_login_ip = ip.map(str::to_string);
    }
}

/// 身份仓储
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// 按用户名查找，指定租户时只在该租户内查找
    async fn find_by_username(
        &self,
        username: &str,
        tenant_id: Option<&TenantId>,
    ) -> AppResult<Option<Identity>>;

    async fn update(&self, identity: &Identity) -> AppResult<()>;

    async fn create(&self, identity: &Identity) -> AppResult<()>;
}
