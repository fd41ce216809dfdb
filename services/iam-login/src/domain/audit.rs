//! 登录审计

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keel_common::TenantId;
use keel_errors::AppResult;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use super::login::LoginType;

/// 登录审计记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAuditEntry {
    pub identifier: String,
    pub success: bool,
    pub message: String,
    pub login_type: LoginType,
    pub tenant_id: Option<TenantId>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub browser: String,
    pub os: String,
    pub occurred_at: DateTime<Utc>,
}

impl LoginAuditEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identifier: impl Into<String>,
        success: bool,
        message: impl Into<String>,
        login_type: LoginType,
        tenant_id: Option<TenantId>,
        ip: Option<String>,
        user_agent: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let browser = browser_family(user_agent.as_deref()).to_string();
        let os = os_family(user_agent.as_deref()).to_string();
        Self {
            identifier: identifier.into(),
            success,
            message: message.into(),
            login_type,
            tenant_id,
            ip,
            user_agent,
            browser,
            os,
            occurred_at,
        }
    }
}

/// 从 User-Agent 解析浏览器
pub fn browser_family(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent.filter(|ua| !ua.trim().is_empty()) else {
        return "Unknown";
    };

    if ua.contains("MSIE") || ua.contains("Trident") {
        "Internet Explorer"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Opera") || ua.contains("OPR/") {
        "Opera"
    } else if ua.contains("Chrome") {
        "Chrome"
    } else if ua.contains("Safari") {
        "Safari"
    } else {
        "Other"
    }
}

/// 从 User-Agent 解析操作系统
pub fn os_family(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent.filter(|ua| !ua.trim().is_empty()) else {
        return "Unknown";
    };

    // Android 的 UA 同时包含 Linux，iOS 的 UA 同时包含 Mac OS X
    if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iOS") {
        "iOS"
    } else if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Macintosh") {
        "Mac OS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Other"
    }
}

/// 审计接口
///
/// 写入失败由调用方记录日志后忽略，不影响登录结果。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: LoginAuditEntry) -> AppResult<()>;
}
