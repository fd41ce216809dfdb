//! OAuth2 登录
//!
//! `identifier` 为提供商名称，`secret` 为授权码。

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use keel_errors::{AppError, AppResult};

use super::{AuditRecorder, LoginStrategy, delegate_to_provider, validate_device};
use crate::application::providers::{ThirdPartyLoginProvider, ThirdPartyLoginRequest};
use crate::domain::{LoginRequest, LoginResponse, LoginType};

pub struct OAuth2LoginStrategy {
    provider: Arc<dyn ThirdPartyLoginProvider>,
    /// 小写的提供商名称
    allowed_providers: HashSet<String>,
    audit: AuditRecorder,
}

impl OAuth2LoginStrategy {
    pub fn new<I, S>(
        provider: Arc<dyn ThirdPartyLoginProvider>,
        allowed_providers: I,
        audit: AuditRecorder,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            provider,
            allowed_providers: allowed_providers
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .collect(),
            audit,
        }
    }

    pub fn is_allowed(&self, provider: &str) -> bool {
        self.allowed_providers
            .contains(&provider.trim().to_lowercase())
    }
}

#[async_trait]
impl LoginStrategy for OAuth2LoginStrategy {
    fn login_type(&self) -> LoginType {
        LoginType::OAuth2
    }

    fn validate(&self, request: &LoginRequest) -> AppResult<()> {
        if request.identifier.trim().is_empty() {
            return Err(AppError::validation("OAuth2 provider is required"));
        }
        if request.secret.is_empty() {
            return Err(AppError::validation("Authorization code is required"));
        }
        if !self.is_allowed(&request.identifier) {
            return Err(AppError::unsupported_provider(request.identifier.trim()));
        }
        validate_device(request)
    }

    async fn authenticate(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        // 提供商名称同时是应用注册表中的 appKey，统一为小写
        let mut provider_request = ThirdPartyLoginRequest::from_login(request);
        provider_request.app_id = provider_request.app_id.to_lowercase();

        delegate_to_provider(
            self.provider.as_ref(),
            &self.audit,
            LoginType::OAuth2,
            request,
            provider_request,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::providers::MockThirdPartyLoginProvider;
    use crate::infrastructure::audit::InMemoryAuditSink;
    use keel_common::ManualClock;

    fn strategy(provider: MockThirdPartyLoginProvider) -> (OAuth2LoginStrategy, Arc<InMemoryAuditSink>) {
        let audit = Arc::new(InMemoryAuditSink::new());
        let strategy = OAuth2LoginStrategy::new(
            Arc::new(provider),
            ["github", "Google", "wechat"],
            AuditRecorder::new(audit.clone(), Arc::new(ManualClock::starting_now())),
        );
        (strategy, audit)
    }

    #[test]
    fn test_provider_allow_list_is_case_insensitive() {
        let (strategy, _) = strategy(MockThirdPartyLoginProvider::new());

        assert!(strategy.validate(&LoginRequest::new("GitHub", "code")).is_ok());
        assert!(strategy.validate(&LoginRequest::new("google", "code")).is_ok());
        assert!(matches!(
            strategy.validate(&LoginRequest::new("myspace", "code")),
            Err(AppError::UnsupportedProvider(_))
        ));
        assert!(matches!(
            strategy.validate(&LoginRequest::new("github", "")),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_failure_is_audited_and_converted() {
        let mut provider = MockThirdPartyLoginProvider::new();
        provider
            .expect_login()
            .withf(|req| req.app_id == "github" && req.auth_code == "code")
            .times(1)
            .returning(|_| Err(AppError::external_service("upstream timeout")));
        let (strategy, audit) = strategy(provider);

        let err = strategy
            .login(&LoginRequest::new("github", "code"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        let entry = audit.last().unwrap();
        assert!(!entry.success);
        assert_eq!(entry.login_type, LoginType::OAuth2);
        assert!(entry.message.contains("upstream timeout"));
    }

    #[tokio::test]
    async fn test_rejected_provider_never_calls_out() {
        let mut provider = MockThirdPartyLoginProvider::new();
        provider.expect_login().never();
        let (strategy, audit) = strategy(provider);

        assert!(strategy.login(&LoginRequest::new("bogus", "code")).await.is_err());
        assert!(audit.is_empty());
    }
}
