//! 一次性验证码

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use keel_errors::AppResult;
use rand::Rng;

/// 一次性验证码
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeCode {
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn new(code: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            created_at,
        }
    }

    /// 生成指定位数的数字验证码
    pub fn generate(length: usize, created_at: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..length.max(1))
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect::<String>();
        Self::new(code, created_at)
    }

    pub fn expires_at(&self, expiry: Duration) -> DateTime<Utc> {
        self.created_at + expiry
    }

    pub fn is_expired(&self, expiry: Duration, now: DateTime<Utc>) -> bool {
        now > self.expires_at(expiry)
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.code.len() == candidate.len()
            && self
                .code
                .bytes()
                .zip(candidate.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

/// 核销结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// 匹配成功，验证码已移除
    Consumed,
    /// 不匹配，验证码保留
    Mismatch,
    /// 已过期，验证码已移除
    Expired,
    Missing,
}

impl ConsumeOutcome {
    pub fn is_consumed(&self) -> bool {
        matches!(self, Self::Consumed)
    }
}

/// 发送间隔占位结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendSlot {
    Reserved,
    TooSoon { retry_after_secs: i64 },
}

/// 验证码存储
///
/// 同一目标只保留最新的一个验证码；核销与发送占位对同一目标是原子的。
#[async_trait]
pub trait OneTimeCodeStore: Send + Sync {
    /// 写入验证码，覆盖旧值
    async fn put(&self, destination: &str, code: OneTimeCode) -> AppResult<()>;

    async fn get(&self, destination: &str) -> AppResult<Option<OneTimeCode>>;

    async fn remove(&self, destination: &str) -> AppResult<()>;

    /// 比对并核销，过期的验证码在此时移除
    async fn consume(
        &self,
        destination: &str,
        candidate: &str,
        expiry: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<ConsumeOutcome>;

    /// 检查发送间隔并占位
    async fn try_reserve_send(
        &self,
        destination: &str,
        min_interval: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<SendSlot>;

    /// 释放占位，仅当占位仍是 `reserved_at` 那一次时生效
    async fn release_send(&self, destination: &str, reserved_at: DateTime<Utc>) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_numeric_code() {
        let code = OneTimeCode::generate(6, Utc::now());
        assert_eq!(code.code.len(), 6);
        assert!(code.code.chars().all(|c| c.is_ascii_digit()));

        let long = OneTimeCode::generate(12, Utc::now());
        assert_eq!(long.code.len(), 12);
    }

    #[test]
    fn test_expiry_boundary() {
        let start = Utc::now();
        let code = OneTimeCode::new("123456", start);
        let expiry = Duration::minutes(5);

        assert!(!code.is_expired(expiry, start + expiry));
        assert!(code.is_expired(expiry, start + expiry + Duration::milliseconds(1)));
    }

    #[test]
    fn test_matches() {
        let code = OneTimeCode::new("123456", Utc::now());
        assert!(code.matches("123456"));
        assert!(!code.matches("123457"));
        assert!(!code.matches("12345"));
    }
}
