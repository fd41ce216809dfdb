//! 短信发送实现

use async_trait::async_trait;
use keel_common::utils::mask_identifier;
use keel_errors::AppResult;

use crate::domain::SmsSender;

/// 只写日志的短信发送器，开发环境使用
#[derive(Debug, Clone, Default)]
pub struct LoggingSmsSender;

#[async_trait]
impl SmsSender for LoggingSmsSender {
    async fn send_verification_code(&self, phone: &str, code: &str) -> AppResult<bool> {
        tracing::info!(
            phone = %mask_identifier(phone),
            code_length = code.len(),
            "Verification code dispatched"
        );
        Ok(true)
    }
}
