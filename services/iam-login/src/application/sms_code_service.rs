//! 短信验证码服务
//!
//! 负责验证码的发送频率控制、生成、存储与核销。同一手机号只保留最新的验证码，
//! 过期验证码在核销时发现并移除，不做后台清理。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use keel_common::Clock;
use keel_common::utils::mask_identifier;
use keel_config::SmsConfig;
use keel_errors::{AppError, AppResult};

use crate::domain::{ConsumeOutcome, OneTimeCode, OneTimeCodeStore, PhoneNumber, SendSlot, SmsSender};
use crate::infrastructure::observability::metrics;

/// 验证码参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmsCodeSettings {
    pub code_length: usize,
    pub code_expiry: Duration,
    pub min_interval: Duration,
}

impl SmsCodeSettings {
    pub fn from_config(config: &SmsConfig) -> Self {
        Self {
            code_length: config.code_length,
            code_expiry: Duration::minutes(config.code_expiry_minutes),
            min_interval: Duration::minutes(config.min_interval_minutes),
        }
    }
}

impl Default for SmsCodeSettings {
    fn default() -> Self {
        Self::from_config(&SmsConfig::default())
    }
}

pub struct SmsCodeService {
    store: Arc<dyn OneTimeCodeStore>,
    sender: Arc<dyn SmsSender>,
    settings: SmsCodeSettings,
    clock: Arc<dyn Clock>,
}

impl SmsCodeService {
    pub fn new(
        store: Arc<dyn OneTimeCodeStore>,
        sender: Arc<dyn SmsSender>,
        settings: SmsCodeSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sender,
            settings,
            clock,
        }
    }

    pub fn settings(&self) -> &SmsCodeSettings {
        &self.settings
    }

    /// 发送验证码，返回短信是否发送成功
    ///
    /// 发送间隔内重复请求返回 `RateLimited`；发送失败时撤销验证码并释放发送占位。
    pub async fn issue_code(&self, destination: &str) -> AppResult<bool> {
        let phone = PhoneNumber::parse(destination)?;
        let now = self.clock.now();

        let slot = self
            .store
            .try_reserve_send(phone.as_str(), self.settings.min_interval, now)
            .await?;
        if let SendSlot::TooSoon { retry_after_secs } = slot {
            metrics::record_sms_code_issued("rate_limited");
            tracing::info!(
                phone = %mask_identifier(phone.as_str()),
                retry_after_secs,
                "Verification code requested too frequently"
            );
            return Err(AppError::rate_limited(retry_after_secs));
        }

        let code = OneTimeCode::generate(self.settings.code_length, now);
        let value = code.code.clone();
        if let Err(e) = self.store.put(phone.as_str(), code).await {
            self.release(&phone, now).await;
            return Err(e);
        }

        let sent = match self.sender.send_verification_code(phone.as_str(), &value).await {
            Ok(sent) => sent,
            Err(e) => {
                tracing::warn!(
                    phone = %mask_identifier(phone.as_str()),
                    error = %e,
                    "SMS sender failed"
                );
                false
            }
        };

        if sent {
            metrics::record_sms_code_issued("sent");
            tracing::info!(
                phone = %mask_identifier(phone.as_str()),
                "Verification code issued"
            );
        } else {
            metrics::record_sms_code_issued("failed");
            tracing::warn!(
                phone = %mask_identifier(phone.as_str()),
                "Verification code dispatch failed"
            );
            if let Err(e) = self.store.remove(phone.as_str()).await {
                tracing::warn!(error = %e, "Failed to revoke undelivered verification code");
            }
            self.release(&phone, now).await;
        }

        Ok(sent)
    }

    /// 比对并核销验证码
    pub async fn verify_code(&self, destination: &str, candidate: &str) -> AppResult<ConsumeOutcome> {
        let now = self.clock.now();
        self.store
            .consume(destination, candidate, self.settings.code_expiry, now)
            .await
    }

    async fn release(&self, phone: &PhoneNumber, reserved_at: DateTime<Utc>) {
        if let Err(e) = self.store.release_send(phone.as_str(), reserved_at).await {
            tracing::warn!(error = %e, "Failed to release verification code send slot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::MockSmsSender;
    use crate::infrastructure::memory::InMemoryOneTimeCodeStore;
    use keel_common::ManualClock;
    use std::sync::atomic::{AtomicBool, Ordering};

    const PHONE: &str = "13800138000";

    fn service(
        sender: MockSmsSender,
        clock: Arc<ManualClock>,
    ) -> (SmsCodeService, Arc<InMemoryOneTimeCodeStore>) {
        let store = Arc::new(InMemoryOneTimeCodeStore::new());
        let service = SmsCodeService::new(
            store.clone(),
            Arc::new(sender),
            SmsCodeSettings::default(),
            clock,
        );
        (service, store)
    }

    #[tokio::test]
    async fn test_issue_code_stores_six_digit_code() {
        let mut sender = MockSmsSender::new();
        sender
            .expect_send_verification_code()
            .withf(|phone, code| phone == PHONE && code.len() == 6)
            .times(1)
            .returning(|_, _| Ok(true));
        let (service, store) = service(sender, Arc::new(ManualClock::starting_now()));

        assert!(service.issue_code(PHONE).await.unwrap());
        let stored = store.get(PHONE).await.unwrap().unwrap();
        assert!(stored.code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_invalid_phone_is_rejected_before_sending() {
        let mut sender = MockSmsSender::new();
        sender.expect_send_verification_code().never();
        let (service, _) = service(sender, Arc::new(ManualClock::starting_now()));

        let err = service.issue_code("12345").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rate_limited_within_interval() {
        let mut sender = MockSmsSender::new();
        sender
            .expect_send_verification_code()
            .times(2)
            .returning(|_, _| Ok(true));
        let clock = Arc::new(ManualClock::starting_now());
        let (service, _) = service(sender, clock.clone());

        service.issue_code(PHONE).await.unwrap();

        clock.advance(Duration::seconds(15));
        let err = service.issue_code(PHONE).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited { retry_after_secs: 45 }));

        clock.advance(Duration::seconds(45));
        assert!(service.issue_code(PHONE).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_dispatch_revokes_code_and_slot() {
        let first_call = AtomicBool::new(true);
        let mut sender = MockSmsSender::new();
        sender
            .expect_send_verification_code()
            .times(2)
            .returning(move |_, _| {
                if first_call.swap(false, Ordering::SeqCst) {
                    Err(AppError::external_service("gateway down"))
                } else {
                    Ok(true)
                }
            });
        let (service, store) = service(sender, Arc::new(ManualClock::starting_now()));

        assert!(!service.issue_code(PHONE).await.unwrap());
        assert!(store.get(PHONE).await.unwrap().is_none());

        assert!(service.issue_code(PHONE).await.unwrap());
    }
}
