//! 短信验证码登录
//!
//! 手机号即用户名。验证码只能使用一次，不匹配时保留以便重试。

use std::sync::Arc;

use async_trait::async_trait;
use keel_errors::{AppError, AppResult};

use super::local::{CredentialCheck, LocalLoginStrategy, LoginRejection};
use crate::application::sms_code_service::SmsCodeService;
use crate::domain::{
    ConsumeOutcome, Identity, IdentityRepository, LoginRequest, LoginType, PhoneNumber,
};

pub type SmsLoginStrategy = LocalLoginStrategy<SmsCodeCheck>;

pub struct SmsCodeCheck {
    identities: Arc<dyn IdentityRepository>,
    codes: Arc<SmsCodeService>,
}

impl SmsCodeCheck {
    pub fn new(identities: Arc<dyn IdentityRepository>, codes: Arc<SmsCodeService>) -> Self {
        Self { identities, codes }
    }
}

#[async_trait]
impl CredentialCheck for SmsCodeCheck {
    fn login_type(&self) -> LoginType {
        LoginType::Sms
    }

    fn validate(&self, request: &LoginRequest) -> AppResult<()> {
        PhoneNumber::parse(&request.identifier)?;
        if request.secret.trim().is_empty() {
            return Err(AppError::validation("Verification code is required"));
        }
        Ok(())
    }

    async fn verify(&self, request: &LoginRequest) -> Result<Identity, LoginRejection> {
        let collaborator = |e| LoginRejection::collaborator(LoginType::Sms, e);

        let outcome = self
            .codes
            .verify_code(&request.identifier, request.secret.trim())
            .await
            .map_err(collaborator)?;

        let audit_message = match outcome {
            ConsumeOutcome::Consumed => None,
            ConsumeOutcome::Mismatch => Some("Verification code mismatch"),
            ConsumeOutcome::Expired => Some("Verification code expired"),
            ConsumeOutcome::Missing => Some("Verification code not found"),
        };
        if let Some(message) = audit_message {
            return Err(LoginRejection::new(AppError::InvalidOrExpiredCode, message));
        }

        self.identities
            .find_by_username(&request.identifier, request.tenant_id.as_ref())
            .await
            .map_err(collaborator)?
            .ok_or_else(|| LoginRejection::new(AppError::IdentityNotFound, "User not found"))
    }

    fn success_message(&self) -> &'static str {
        "SMS login succeeded"
    }
}
