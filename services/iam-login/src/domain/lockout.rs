//! 登录失败锁定
//!
//! 连续失败达到上限后锁定，锁定到期后在下一次检查时解锁（不使用后台清理任务）。
//! 不存在记录等同于从未失败。

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use keel_config::LoginConfig;
use keel_errors::AppResult;
use serde::{Deserialize, Serialize};

/// 锁定策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_retry_count: u32,
    pub lock_duration: Duration,
}

impl LockoutPolicy {
    pub fn new(max_retry_count: u32, lock_duration: Duration) -> Self {
        Self {
            max_retry_count: max_retry_count.max(1),
            lock_duration,
        }
    }

    pub fn from_config(config: &LoginConfig) -> Self {
        Self::new(
            config.max_retry_count,
            Duration::minutes(config.lock_duration_minutes),
        )
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from_config(&LoginConfig::default())
    }
}

/// 单个身份的失败记录
///
/// `locked` 为真时 `locked_at` 一定有值。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutRecord {
    pub attempts: u32,
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
}

impl LockoutRecord {
    /// 记录一次失败，返回本次是否触发锁定
    pub fn register_failure(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) -> bool {
        self.attempts = self.attempts.saturating_add(1);
        if !self.locked && self.attempts >= policy.max_retry_count {
            self.locked = true;
            self.locked_at = Some(now);
            return true;
        }
        false
    }

    /// 锁定到期时间
    pub fn locked_until(&self, policy: &LockoutPolicy) -> Option<DateTime<Utc>> {
        match (self.locked, self.locked_at) {
            (true, Some(at)) => Some(at + policy.lock_duration),
            _ => None,
        }
    }

    /// 锁定是否已过期
    pub fn lock_expired(&self, policy: &LockoutPolicy, now: DateTime<Utc>) -> bool {
        self.locked_until(policy).is_some_and(|until| now > until)
    }

    pub fn state(&self, policy: &LockoutPolicy) -> LockState {
        match self.locked_until(policy) {
            Some(until) => LockState::Locked { until },
            None => LockState::Unlocked {
                attempts: self.attempts,
            },
        }
    }
}

/// 锁定状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked { attempts: u32 },
    Locked { until: DateTime<Utc> },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// 剩余锁定分钟数，向上取整
    pub fn retry_after_minutes(&self, now: DateTime<Utc>) -> i64 {
        match self {
            Self::Unlocked { .. } => 0,
            Self::Locked { until } => {
                let secs = (*until - now).num_seconds().max(0);
                (secs + 59) / 60
            }
        }
    }
}

/// 锁定记录存储
///
/// 每个方法对同一个键都是原子的读改写。
#[async_trait]
pub trait LockoutStore: Send + Sync {
    /// 累加失败次数（不存在则创建），返回更新后的记录
    async fn record_failure(
        &self,
        key: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<LockoutRecord>;

    /// 读取状态，锁定已过期时删除记录并返回未锁定
    async fn check(
        &self,
        key: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<LockState>;

    async fn clear(&self, key: &str) -> AppResult<()>;

    async fn get(&self, key: &str) -> AppResult<Option<LockoutRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::new(3, Duration::minutes(10))
    }

    #[test]
    fn test_locks_at_max_retry() {
        let policy = policy();
        let now = Utc::now();
        let mut record = LockoutRecord::default();

        assert!(!record.register_failure(&policy, now));
        assert!(!record.register_failure(&policy, now));
        assert!(record.register_failure(&policy, now));
        assert!(record.locked);
        assert_eq!(record.locked_at, Some(now));
    }

    #[test]
    fn test_further_failures_do_not_extend_lock() {
        let policy = policy();
        let start = Utc::now();
        let mut record = LockoutRecord::default();
        for _ in 0..3 {
            record.register_failure(&policy, start);
        }

        assert!(!record.register_failure(&policy, start + Duration::minutes(5)));
        assert_eq!(record.locked_at, Some(start));
        assert_eq!(record.attempts, 4);
    }

    #[test]
    fn test_lock_expires_strictly_after_duration() {
        let policy = policy();
        let start = Utc::now();
        let mut record = LockoutRecord::default();
        for _ in 0..3 {
            record.register_failure(&policy, start);
        }

        assert!(!record.lock_expired(&policy, start + Duration::minutes(10)));
        assert!(record.lock_expired(&policy, start + Duration::minutes(10) + Duration::seconds(1)));
    }

    #[test]
    fn test_retry_after_minutes_rounds_up() {
        let now = Utc::now();
        let state = LockState::Locked {
            until: now + Duration::seconds(61),
        };
        assert_eq!(state.retry_after_minutes(now), 2);
        assert_eq!(LockState::Unlocked { attempts: 1 }.retry_after_minutes(now), 0);
    }
}
