//! 用户名密码登录

use std::sync::Arc;

use async_trait::async_trait;
use keel_errors::{AppError, AppResult};

use super::local::{CredentialCheck, LocalLoginStrategy, LoginRejection};
use crate::application::lockout_tracker::LockoutTracker;
use crate::domain::{Identity, IdentityRepository, LoginRequest, LoginType, PasswordMatcher};

pub type PasswordLoginStrategy = LocalLoginStrategy<PasswordCheck>;

/// 密码校验，连续失败达到上限后锁定账户
pub struct PasswordCheck {
    identities: Arc<dyn IdentityRepository>,
    matcher: Arc<dyn PasswordMatcher>,
    lockout: Arc<LockoutTracker>,
}

impl PasswordCheck {
    pub fn new(
        identities: Arc<dyn IdentityRepository>,
        matcher: Arc<dyn PasswordMatcher>,
        lockout: Arc<LockoutTracker>,
    ) -> Self {
        Self {
            identities,
            matcher,
            lockout,
        }
    }

    fn lock_key(request: &LoginRequest) -> String {
        LockoutTracker::key(&request.identifier, request.tenant_id.as_ref())
    }

    fn collaborator(error: AppError) -> LoginRejection {
        LoginRejection::collaborator(LoginType::Password, error)
    }

    /// 记录失败；用户不存在与密码错误对外返回同一错误
    async fn fail(&self, key: &str, audit_message: &str) -> LoginRejection {
        if let Err(e) = self.lockout.record_failure(key).await {
            return Self::collaborator(e);
        }
        LoginRejection::new(AppError::InvalidCredentials, audit_message)
    }
}

#[async_trait]
impl CredentialCheck for PasswordCheck {
    fn login_type(&self) -> LoginType {
        LoginType::Password
    }

    fn validate(&self, request: &LoginRequest) -> AppResult<()> {
        if request.identifier.trim().is_empty() {
            return Err(AppError::validation("Username is required"));
        }
        if request.secret.is_empty() {
            return Err(AppError::validation("Password is required"));
        }
        Ok(())
    }

    async fn verify(&self, request: &LoginRequest) -> Result<Identity, LoginRejection> {
        let key = Self::lock_key(request);

        if let Err(e) = self.lockout.ensure_unlocked(&key).await {
            return Err(match e {
                locked @ AppError::AccountLocked { .. } => {
                    LoginRejection::new(locked, "Account locked")
                }
                other => Self::collaborator(other),
            });
        }

        let identity = self
            .identities
            .find_by_username(&request.identifier, request.tenant_id.as_ref())
            .await
            .map_err(Self::collaborator)?;

        let Some(identity) = identity else {
            return Err(self.fail(&key, "User not found").await);
        };

        let matched = identity.has_password()
            && self
                .matcher
                .matches(&request.secret, &identity.password_hash)
                .map_err(Self::collaborator)?;
        if !matched {
            return Err(self.fail(&key, "Wrong password").await);
        }

        Ok(identity)
    }

    async fn on_verified(&self, request: &LoginRequest, _identity: &Identity) -> AppResult<()> {
        self.lockout.reset(&Self::lock_key(request)).await
    }

    fn success_message(&self) -> &'static str {
        "Login succeeded"
    }
}
