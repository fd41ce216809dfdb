//! 验证码内存存储

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use keel_errors::AppResult;

use crate::domain::{ConsumeOutcome, OneTimeCode, OneTimeCodeStore, SendSlot};

#[derive(Debug, Default)]
pub struct InMemoryOneTimeCodeStore {
    codes: DashMap<String, OneTimeCode>,
    last_sent: DashMap<String, DateTime<Utc>>,
}

impl InMemoryOneTimeCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OneTimeCodeStore for InMemoryOneTimeCodeStore {
    async fn put(&self, destination: &str, code: OneTimeCode) -> AppResult<()> {
        self.codes.insert(destination.to_string(), code);
        Ok(())
    }

    async fn get(&self, destination: &str) -> AppResult<Option<OneTimeCode>> {
        Ok(self.codes.get(destination).map(|code| code.value().clone()))
    }

    async fn remove(&self, destination: &str) -> AppResult<()> {
        self.codes.remove(destination);
        Ok(())
    }

    async fn consume(
        &self,
        destination: &str,
        candidate: &str,
        expiry: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<ConsumeOutcome> {
        let outcome = match self.codes.entry(destination.to_string()) {
            Entry::Occupied(entry) => {
                if entry.get().is_expired(expiry, now) {
                    entry.remove();
                    ConsumeOutcome::Expired
                } else if entry.get().matches(candidate) {
                    entry.remove();
                    ConsumeOutcome::Consumed
                } else {
                    ConsumeOutcome::Mismatch
                }
            }
            Entry::Vacant(_) => ConsumeOutcome::Missing,
        };
        Ok(outcome)
    }

    async fn try_reserve_send(
        &self,
        destination: &str,
        min_interval: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<SendSlot> {
        // 超过发送间隔的记录已无作用
        self.last_sent
            .retain(|_, sent_at| now - *sent_at < min_interval);

        let slot = match self.last_sent.entry(destination.to_string()) {
            Entry::Occupied(mut entry) => {
                let elapsed = now - *entry.get();
                if elapsed < min_interval {
                    let remaining_ms = (min_interval - elapsed).num_milliseconds();
                    SendSlot::TooSoon {
                        retry_after_secs: (remaining_ms + 999) / 1000,
                    }
                } else {
                    entry.insert(now);
                    SendSlot::Reserved
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                SendSlot::Reserved
            }
        };
        Ok(slot)
    }

    async fn release_send(&self, destination: &str, reserved_at: DateTime<Utc>) -> AppResult<()> {
        self.last_sent
            .remove_if(destination, |_, sent_at| *sent_at == reserved_at);
        Ok(())
    }
}
