//! IAM 登录
//!
//! `identifier` 为在应用注册表中登记的 appKey，`secret` 为 IAM 授权码。

use std::sync::Arc;

use async_trait::async_trait;
use keel_errors::{AppError, AppResult};

use super::{AuditRecorder, LoginStrategy, delegate_to_provider, validate_device};
use crate::application::providers::{ThirdPartyLoginProvider, ThirdPartyLoginRequest};
use crate::domain::{LoginRequest, LoginResponse, LoginType};

pub struct IamLoginStrategy {
    provider: Arc<dyn ThirdPartyLoginProvider>,
    audit: AuditRecorder,
}

impl IamLoginStrategy {
    pub fn new(provider: Arc<dyn ThirdPartyLoginProvider>, audit: AuditRecorder) -> Self {
        Self { provider, audit }
    }
}

#[async_trait]
impl LoginStrategy for IamLoginStrategy {
    fn login_type(&self) -> LoginType {
        LoginType::Iam
    }

    fn validate(&self, request: &LoginRequest) -> AppResult<()> {
        if request.identifier.trim().is_empty() {
            return Err(AppError::validation("Application key is required"));
        }
        if request.secret.is_empty() {
            return Err(AppError::validation("Authorization code is required"));
        }
        validate_device(request)
    }

    async fn authenticate(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        delegate_to_provider(
            self.provider.as_ref(),
            &self.audit,
            LoginType::Iam,
            request,
            ThirdPartyLoginRequest::from_login(request),
        )
        .await
    }
}
