//! 审计实现

use async_trait::async_trait;
use keel_errors::AppResult;
use parking_lot::Mutex;

use crate::domain::{AuditSink, LoginAuditEntry};

/// 输出到 tracing 的审计
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: LoginAuditEntry) -> AppResult<()> {
        tracing::info!(
            target: "audit.login",
            identifier = %entry.identifier,
            success = entry.success,
            login_type = %entry.login_type,
            tenant_id = ?entry.tenant_id.as_ref().map(ToString::to_string),
            ip = ?entry.ip,
            browser = %entry.browser,
            os = %entry.os,
            message = %entry.message,
            "Login attempt recorded"
        );
        Ok(())
    }
}

/// 保存在内存中的审计，用于测试与本地调试
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<LoginAuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LoginAuditEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn last(&self) -> Option<LoginAuditEntry> {
        self.entries.lock().last().cloned()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, entry: LoginAuditEntry) -> AppResult<()> {
        self.entries.lock().push(entry);
        Ok(())
    }
}
