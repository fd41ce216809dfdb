//! 锁定记录内存存储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use keel_errors::AppResult;

use crate::domain::{LockState, LockoutPolicy, LockoutRecord, LockoutStore};

/// 基于 DashMap 的锁定记录存储，读改写都在单个 entry 守卫内完成
#[derive(Debug, Default)]
pub struct InMemoryLockoutStore {
    records: DashMap<String, LockoutRecord>,
}

impl InMemoryLockoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LockoutStore for InMemoryLockoutStore {
    async fn record_failure(
        &self,
        key: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<LockoutRecord> {
        let mut record = self.records.entry(key.to_string()).or_default();
        if record.lock_expired(policy, now) {
            *record = LockoutRecord::default();
        }
        record.register_failure(policy, now);
        Ok(record.clone())
    }

    async fn check(
        &self,
        key: &str,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<LockState> {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                if entry.get().lock_expired(policy, now) {
                    entry.remove();
                    Ok(LockState::Unlocked { attempts: 0 })
                } else {
                    Ok(entry.get().state(policy))
                }
            }
            Entry::Vacant(_) => Ok(LockState::Unlocked { attempts: 0 }),
        }
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        self.records.remove(key);
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<LockoutRecord>> {
        Ok(self.records.get(key).map(|record| record.value().clone()))
    }
}
