//! 登录失败锁定追踪服务

use std::sync::Arc;

use chrono::{DateTime, Utc};
use keel_common::{Clock, TenantId};
use keel_errors::{AppError, AppResult};

use crate::domain::{LockState, LockoutPolicy, LockoutRecord, LockoutStore};
use crate::infrastructure::observability::metrics;

/// 登录失败锁定追踪服务
pub struct LockoutTracker {
    store: Arc<dyn LockoutStore>,
    policy: LockoutPolicy,
    clock: Arc<dyn Clock>,
}

impl LockoutTracker {
    pub fn new(store: Arc<dyn LockoutStore>, policy: LockoutPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    /// 锁定键，有租户时按租户隔离
    pub fn key(username: &str, tenant_id: Option<&TenantId>) -> String {
        match tenant_id {
            Some(tenant_id) => format!("{}:{}", tenant_id, username),
            None => username.to_string(),
        }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// 当前状态，锁定到期时顺带解锁
    pub async fn check(&self, key: &str) -> AppResult<LockState> {
        let now = self.clock.now();
        let state = self.store.check(key, &self.policy, now).await?;
        Ok(state)
    }

    /// 已锁定时返回 `AccountLocked`
    pub async fn ensure_unlocked(&self, key: &str) -> AppResult<()> {
        match self.check(key).await? {
            LockState::Unlocked { .. } => Ok(()),
            state @ LockState::Locked { .. } => Err(AppError::account_locked(
                state.retry_after_minutes(self.clock.now()),
            )),
        }
    }

    /// 记录一次失败
    pub async fn record_failure(&self, key: &str) -> AppResult<LockoutRecord> {
        let now = self.clock.now();
        let record = self.store.record_failure(key, &self.policy, now).await?;

        if record.locked && record.attempts == self.policy.max_retry_count {
            metrics::record_account_locked();
            tracing::warn!(
                key = %key,
                attempt_count = record.attempts,
                locked_until = ?record.locked_until(&self.policy),
                "Account locked after repeated login failures"
            );
        } else {
            tracing::warn!(
                key = %key,
                attempt_count = record.attempts,
                "Login attempt failed"
            );
        }

        Ok(record)
    }

    /// 清除失败记录（登录成功后）
    pub async fn reset(&self, key: &str) -> AppResult<()> {
        self.store.clear(key).await?;
        tracing::debug!(key = %key, "Login attempt counter cleared");
        Ok(())
    }

    /// 锁定前剩余的尝试次数
    pub async fn remaining_attempts(&self, key: &str) -> AppResult<u32> {
        match self.check(key).await? {
            LockState::Locked { .. } => Ok(0),
            LockState::Unlocked { attempts } => {
                Ok(self.policy.max_retry_count.saturating_sub(attempts))
            }
        }
    }

    /// 锁定到期时间
    pub async fn locked_until(&self, key: &str) -> AppResult<Option<DateTime<Utc>>> {
        match self.check(key).await? {
            LockState::Locked { until } => Ok(Some(until)),
            LockState::Unlocked { .. } => Ok(None),
        }
    }
}
