//! 第三方应用令牌服务
//!
//! 应用以 appKey/appSecret 换取访问令牌，用于机器间调用。
//! 刷新时重新读取应用状态，已停用的应用不能续期。

use std::sync::Arc;

use keel_auth_core::{ClaimMap, TokenClaims, TokenPair, TokenProvider};
use keel_errors::{AppError, AppResult};
use serde_json::json;

use crate::domain::{ThirdPartyApp, ThirdPartyAppRepository};
use crate::infrastructure::observability::metrics;

/// 应用令牌的受众
pub const APP_AUDIENCE: &str = "third_party_app";

pub const CLAIM_APP_ID: &str = "appId";
pub const CLAIM_APP_KEY: &str = "appKey";
pub const CLAIM_APP_NAME: &str = "appName";
pub const CLAIM_PERMISSIONS: &str = "permissions";

pub struct AppTokenService {
    apps: Arc<dyn ThirdPartyAppRepository>,
    provider: Arc<TokenProvider>,
}

impl AppTokenService {
    pub fn new(apps: Arc<dyn ThirdPartyAppRepository>, provider: Arc<TokenProvider>) -> Self {
        Self { apps, provider }
    }

    /// 校验应用凭证并签发令牌
    pub async fn generate_token(&self, app_key: &str, app_secret: &str) -> AppResult<TokenPair> {
        let app = self
            .apps
            .find_by_app_key(app_key)
            .await?
            .filter(|app| app.enabled)
            .ok_or_else(|| AppError::unauthorized("Invalid application credentials"))?;

        if !app.secret_matches(app_secret) {
            tracing::warn!(app_key = %app_key, "Application secret mismatch");
            return Err(AppError::unauthorized("Invalid application credentials"));
        }

        self.issue_for(&app)
    }

    /// 校验访问令牌并返回其中的声明
    pub fn validate_token(&self, token: &str) -> AppResult<TokenClaims> {
        let claims = self.provider.verify(token, APP_AUDIENCE)?;
        if !claims.is_access_token() {
            return Err(AppError::unauthorized("Not an access token"));
        }
        // 应用令牌的主体即 appKey
        if claims.claim_str(CLAIM_APP_KEY) != Some(claims.sub.as_str()) {
            return Err(AppError::unauthorized("Not an application token"));
        }
        Ok(claims)
    }

    /// 用刷新令牌换取新的令牌对
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.provider.decode_claims(refresh_token)?;

        if !claims.is_refresh_token() || claims.aud != APP_AUDIENCE {
            return Err(AppError::unauthorized("Not an application refresh token"));
        }
        if self.provider.is_expired(&claims) {
            return Err(AppError::unauthorized("Refresh token expired"));
        }

        let app = self
            .apps
            .find_by_app_key(&claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("Application not found"))?;
        if !app.enabled {
            return Err(AppError::unauthorized("Application is disabled"));
        }

        self.issue_for(&app)
    }

    /// 令牌所属的应用
    pub async fn app_from_token(&self, token: &str) -> AppResult<ThirdPartyApp> {
        let claims = self.validate_token(token)?;
        let app_key = claims
            .claim_str(CLAIM_APP_KEY)
            .ok_or_else(|| AppError::unauthorized("Token carries no application"))?;

        self.apps
            .find_by_app_key(app_key)
            .await?
            .ok_or_else(|| AppError::unauthorized("Application not found"))
    }

    fn issue_for(&self, app: &ThirdPartyApp) -> AppResult<TokenPair> {
        let mut claims = ClaimMap::new();
        claims.insert(CLAIM_APP_ID.to_string(), json!(app.id));
        claims.insert(CLAIM_APP_KEY.to_string(), json!(app.app_key));
        claims.insert(CLAIM_APP_NAME.to_string(), json!(app.app_name));
        claims.insert(CLAIM_PERMISSIONS.to_string(), json!(app.permissions));

        let pair = self.provider.issue_pair(&app.app_key, APP_AUDIENCE, claims)?;

        metrics::record_app_token_issued();
        tracing::info!(app_key = %app.app_key, "Application token issued");
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::third_party_app::MockThirdPartyAppRepository;
    use keel_auth_core::TokenType;

    fn provider() -> Arc<TokenProvider> {
        Arc::new(TokenProvider::new("secret", "keel", 3600, 86400))
    }

    fn repo_with(app: ThirdPartyApp) -> MockThirdPartyAppRepository {
        let mut repo = MockThirdPartyAppRepository::new();
        repo.expect_find_by_app_key()
            .returning(move |key| Ok((key == app.app_key).then(|| app.clone())));
        repo
    }

    fn demo_app() -> ThirdPartyApp {
        ThirdPartyApp::new("app-1", "demo", "s3cret", "Demo App").with_permissions(&["READ"])
    }

    #[tokio::test]
    async fn test_generate_and_validate() {
        let service = AppTokenService::new(Arc::new(repo_with(demo_app())), provider());

        let pair = service.generate_token("demo", "s3cret").await.unwrap();
        let claims = service.validate_token(&pair.access_token).unwrap();

        assert_eq!(claims.aud, APP_AUDIENCE);
        assert_eq!(claims.claim_str(CLAIM_APP_ID), Some("app-1"));
        assert_eq!(claims.claim_str(CLAIM_APP_NAME), Some("Demo App"));
        assert_eq!(claims.claim_strings(CLAIM_PERMISSIONS), vec!["READ"]);

        let app = service.app_from_token(&pair.access_token).await.unwrap();
        assert_eq!(app.id, "app-1");
    }

    #[tokio::test]
    async fn test_wrong_secret_or_disabled_app_is_rejected() {
        let service = AppTokenService::new(Arc::new(repo_with(demo_app())), provider());
        assert!(matches!(
            service.generate_token("demo", "wrong").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(service.generate_token("missing", "s3cret").await.is_err());

        let service = AppTokenService::new(Arc::new(repo_with(demo_app().disabled())), provider());
        assert!(service.generate_token("demo", "s3cret").await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let service = AppTokenService::new(Arc::new(repo_with(demo_app())), provider());
        let pair = service.generate_token("demo", "s3cret").await.unwrap();

        assert!(service.refresh_token(&pair.access_token).await.is_err());
        let refreshed = service.refresh_token(&pair.refresh_token).await.unwrap();
        assert!(service.validate_token(&refreshed.access_token).is_ok());
        assert!(service.validate_token(&pair.refresh_token).is_err());
    }

    #[tokio::test]
    async fn test_refresh_rechecks_app_state() {
        let provider = provider();
        let issuing = AppTokenService::new(Arc::new(repo_with(demo_app())), provider.clone());
        let pair = issuing.generate_token("demo", "s3cret").await.unwrap();

        let after_disable =
            AppTokenService::new(Arc::new(repo_with(demo_app().disabled())), provider);
        let err = after_disable.refresh_token(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg.contains("disabled")));
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_rejected() {
        let provider = provider();
        let service = AppTokenService::new(Arc::new(repo_with(demo_app())), provider.clone());
        let expired = provider
            .issue_with_ttl("demo", APP_AUDIENCE, ClaimMap::new(), TokenType::Refresh, -5)
            .unwrap();

        let err = service.refresh_token(&expired).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg.contains("expired")));
    }

    #[test]
    fn test_token_without_app_key_is_not_an_app_token() {
        let provider = provider();
        let service = AppTokenService::new(Arc::new(repo_with(demo_app())), provider.clone());

        let mut claims = ClaimMap::new();
        claims.insert("username".to_string(), json!("alice"));
        let foreign = provider.issue("alice", APP_AUDIENCE, claims).unwrap();

        assert!(matches!(
            service.validate_token(&foreign),
            Err(AppError::Unauthorized(_))
        ));
    }
}
