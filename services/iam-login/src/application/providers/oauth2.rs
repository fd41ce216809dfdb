//! 基于应用凭证的 OAuth2 登录

use std::sync::Arc;

use async_trait::async_trait;
use keel_errors::{AppError, AppResult};

use super::{ThirdPartyLoginProvider, ThirdPartyLoginRequest, find_or_provision, require_app};
use crate::application::app_token_service::{AppTokenService, CLAIM_APP_KEY, CLAIM_APP_NAME};
use crate::application::token_issuer::{DEFAULT_DEVICE, TokenIssuer};
use crate::domain::third_party_app::PERMISSION_OAUTH2_LOGIN;
use crate::domain::{IdentityRepository, LoginResponse, LoginType, ThirdPartyAppRepository};

/// 自定义参数中的应用密钥
pub const PARAM_APP_SECRET: &str = "appSecret";

/// 以 appKey/appSecret 换取应用令牌，再映射为本地身份 `oauth2_{appKey}`
pub struct AppCredentialOAuth2Provider {
    apps: Arc<dyn ThirdPartyAppRepository>,
    app_tokens: Arc<AppTokenService>,
    identities: Arc<dyn IdentityRepository>,
    issuer: TokenIssuer,
}

impl AppCredentialOAuth2Provider {
    pub fn new(
        apps: Arc<dyn ThirdPartyAppRepository>,
        app_tokens: Arc<AppTokenService>,
        identities: Arc<dyn IdentityRepository>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            apps,
            app_tokens,
            identities,
            issuer,
        }
    }
}

#[async_trait]
impl ThirdPartyLoginProvider for AppCredentialOAuth2Provider {
    async fn login(&self, request: &ThirdPartyLoginRequest) -> AppResult<LoginResponse> {
        let app_secret = request
            .param_str(PARAM_APP_SECRET)
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::validation("appSecret is required"))?;

        require_app(self.apps.as_ref(), &request.app_id, PERMISSION_OAUTH2_LOGIN).await?;

        let pair = self
            .app_tokens
            .generate_token(&request.app_id, app_secret)
            .await?;
        let claims = self.app_tokens.validate_token(&pair.access_token)?;

        let app_key = claims.claim_str(CLAIM_APP_KEY).unwrap_or(&request.app_id);
        let nickname = claims.claim_str(CLAIM_APP_NAME).unwrap_or(app_key);
        let username = format!("oauth2_{}", app_key);

        let identity = find_or_provision(
            &self.identities,
            &username,
            nickname,
            request.tenant_id.as_ref(),
        )
        .await?;

        tracing::info!(app_key = %app_key, username = %identity.username, "OAuth2 login exchanged");
        self.issuer.issue(
            &identity,
            LoginType::OAuth2,
            request.device_or(DEFAULT_DEVICE),
            request.tenant_id.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ThirdPartyApp;
    use crate::infrastructure::memory::{
        InMemoryIdentityRepository, InMemoryThirdPartyAppRepository,
    };
    use keel_auth_core::TokenProvider;
    use std::collections::HashMap;

    fn provider_with(apps: Vec<ThirdPartyApp>) -> (AppCredentialOAuth2Provider, Arc<TokenProvider>) {
        let tokens = Arc::new(TokenProvider::new("secret", "keel", 3600, 86400));
        let apps: Arc<dyn ThirdPartyAppRepository> =
            Arc::new(InMemoryThirdPartyAppRepository::with_apps(apps));
        let provider = AppCredentialOAuth2Provider::new(
            apps.clone(),
            Arc::new(AppTokenService::new(apps, tokens.clone())),
            Arc::new(InMemoryIdentityRepository::new()),
            TokenIssuer::new(tokens.clone()),
        );
        (provider, tokens)
    }

    fn request(app_id: &str, secret: Option<&str>) -> ThirdPartyLoginRequest {
        let mut custom_params = HashMap::new();
        if let Some(secret) = secret {
            custom_params.insert(PARAM_APP_SECRET.to_string(), secret.into());
        }
        ThirdPartyLoginRequest {
            app_id: app_id.to_string(),
            auth_code: "code".to_string(),
            device_id: None,
            tenant_id: None,
            client_ip: None,
            user_agent: None,
            custom_params,
        }
    }

    fn github() -> ThirdPartyApp {
        ThirdPartyApp::new("app-1", "github", "s3cret", "GitHub")
            .with_permissions(&[PERMISSION_OAUTH2_LOGIN])
    }

    #[tokio::test]
    async fn test_login_provisions_oauth2_identity() {
        let (provider, tokens) = provider_with(vec![github()]);

        let response = provider
            .login(&request("github", Some("s3cret")))
            .await
            .unwrap();

        assert_eq!(response.user.username, "oauth2_github");
        assert_eq!(response.user.nickname, "GitHub");
        assert!(tokens.verify(&response.access_token, DEFAULT_DEVICE).is_ok());
    }

    #[tokio::test]
    async fn test_missing_or_wrong_secret_is_rejected() {
        let (provider, _) = provider_with(vec![github()]);

        assert!(matches!(
            provider.login(&request("github", None)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            provider.login(&request("github", Some("nope"))).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_app_without_permission_is_forbidden() {
        let app = ThirdPartyApp::new("app-2", "google", "s3cret", "Google");
        let (provider, _) = provider_with(vec![app]);

        let err = provider
            .login(&request("google", Some("s3cret")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
