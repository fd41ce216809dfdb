//! 请求上下文
//!
//! 租户与调用者身份以值的形式沿调用链显式传递，不使用线程局部或全局状态。
//! 上下文由请求入口创建并随请求 future 一起被持有，请求结束（包括出错）时随之释放。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TenantId;

/// 租户上下文
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    tenant_id: Option<TenantId>,
    tenant_code: Option<String>,
}

impl TenantContext {
    pub fn new(tenant_id: Option<TenantId>, tenant_code: Option<String>) -> Self {
        Self {
            tenant_id,
            tenant_code,
        }
    }

    /// 无租户信息
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_tenant_id(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_tenant_code(mut self, tenant_code: impl Into<String>) -> Self {
        self.tenant_code = Some(tenant_code.into());
        self
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    pub fn tenant_code(&self) -> Option<&str> {
        self.tenant_code.as_deref()
    }

    pub fn has_tenant_id(&self) -> bool {
        self.tenant_id.is_some()
    }

    pub fn has_tenant_code(&self) -> bool {
        self.tenant_code.is_some()
    }
}

/// 已认证的调用者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// 令牌主体（用户名或应用标识）
    pub subject: String,
    /// 令牌受众（设备 ID 或应用类型标签）
    pub audience: String,
    /// 用户 ID（第三方应用令牌中不存在）
    pub user_id: Option<String>,
}

/// 请求上下文
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    tenant: TenantContext,
    principal: Option<Principal>,
    client_ip: Option<String>,
    user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(tenant: TenantContext) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            tenant,
            principal: None,
            client_ip: None,
            user_agent: None,
        }
    }

    /// 无租户、未认证的上下文
    pub fn anonymous() -> Self {
        Self::new(TenantContext::anonymous())
    }

    pub fn with_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.client_ip = ip;
        self.user_agent = user_agent;
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_tenant(mut self, tenant: TenantContext) -> Self {
        self.tenant = tenant;
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}
