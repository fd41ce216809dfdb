//! IAM 授权码登录

use std::sync::Arc;

use async_trait::async_trait;
use keel_errors::AppResult;
use secrecy::Secret;

use super::{ThirdPartyLoginProvider, ThirdPartyLoginRequest, find_or_provision, require_app};
use crate::application::token_issuer::{IAM_DEVICE, TokenIssuer};
use crate::domain::third_party_app::PERMISSION_IAM_LOGIN;
use crate::domain::{
    IamExchangeRequest, IamTokenExchange, IdentityRepository, LoginResponse, LoginType,
    ThirdPartyAppRepository,
};

pub struct IamLoginProvider {
    apps: Arc<dyn ThirdPartyAppRepository>,
    exchange: Arc<dyn IamTokenExchange>,
    identities: Arc<dyn IdentityRepository>,
    issuer: TokenIssuer,
}

impl IamLoginProvider {
    pub fn new(
        apps: Arc<dyn ThirdPartyAppRepository>,
        exchange: Arc<dyn IamTokenExchange>,
        identities: Arc<dyn IdentityRepository>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            apps,
            exchange,
            identities,
            issuer,
        }
    }
}

#[async_trait]
impl ThirdPartyLoginProvider for IamLoginProvider {
    async fn login(&self, request: &ThirdPartyLoginRequest) -> AppResult<LoginResponse> {
        let app = require_app(self.apps.as_ref(), &request.app_id, PERMISSION_IAM_LOGIN).await?;

        let profile = self
            .exchange
            .exchange(&IamExchangeRequest {
                client_id: app.app_key.clone(),
                client_secret: Secret::new(app.app_secret.clone()),
                code: request.auth_code.clone(),
            })
            .await?;

        let nickname = profile.nickname.as_deref().unwrap_or(&profile.username);
        let identity = find_or_provision(
            &self.identities,
            &profile.username,
            nickname,
            request.tenant_id.as_ref(),
        )
        .await?;

        tracing::info!(app_key = %app.app_key, username = %identity.username, "IAM login exchanged");
        self.issuer.issue(
            &identity,
            LoginType::Iam,
            request.device_or(IAM_DEVICE),
            request.tenant_id.as_ref(),
        )
    }
}
