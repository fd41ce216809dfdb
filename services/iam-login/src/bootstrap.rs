//! 组件装配
//!
//! 由配置与外部协作方组装登录模块。协作方可替换，默认实现为内存存储、
//! 日志短信发送器、tracing 审计与 HTTP IAM 客户端。

use std::sync::Arc;

use keel_auth_core::TokenProvider;
use keel_common::{Clock, SystemClock};
use keel_config::AppConfig;
use keel_errors::AppResult;
use keel_telemetry::{PrometheusHandle, init_from_config, init_metrics};

use crate::application::providers::{AppCredentialOAuth2Provider, IamLoginProvider};
use crate::application::strategies::{
    AuditRecorder, IamLoginStrategy, LocalLoginStrategy, LoginStrategy, OAuth2LoginStrategy,
    PasswordCheck, SmsCodeCheck,
};
use crate::application::{
    AppTokenService, LockoutTracker, LoginService, LoginStrategyFactory, SmsCodeService,
    SmsCodeSettings, TokenIssuer,
};
use crate::domain::{
    AuditSink, IamTokenExchange, IdentityRepository, LockoutPolicy, LockoutStore,
    OneTimeCodeStore, PasswordMatcher, SmsSender, ThirdPartyAppRepository,
};
use crate::infrastructure::audit::TracingAuditSink;
use crate::infrastructure::iam_client::HttpIamTokenExchange;
use crate::infrastructure::memory::{
    InMemoryIdentityRepository, InMemoryLockoutStore, InMemoryOneTimeCodeStore,
    InMemoryThirdPartyAppRepository,
};
use crate::infrastructure::password::Argon2PasswordMatcher;
use crate::infrastructure::sms::LoggingSmsSender;

/// 初始化日志与指标
///
/// 指标导出器安装失败只记录警告。
pub fn init_runtime(config: &AppConfig) -> Option<PrometheusHandle> {
    init_from_config(&config.telemetry);

    let handle = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    };

    tracing::info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Runtime initialized"
    );
    handle
}

/// 外部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub identities: Arc<dyn IdentityRepository>,
    pub apps: Arc<dyn ThirdPartyAppRepository>,
    pub password_matcher: Arc<dyn PasswordMatcher>,
    pub sms_sender: Arc<dyn SmsSender>,
    pub iam_exchange: Arc<dyn IamTokenExchange>,
    pub audit: Arc<dyn AuditSink>,
    pub lockout_store: Arc<dyn LockoutStore>,
    pub code_store: Arc<dyn OneTimeCodeStore>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// 单实例默认实现
    pub fn in_memory(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            identities: Arc::new(InMemoryIdentityRepository::new()),
            apps: Arc::new(InMemoryThirdPartyAppRepository::new()),
            password_matcher: Arc::new(Argon2PasswordMatcher::new()),
            sms_sender: Arc::new(LoggingSmsSender),
            iam_exchange: Arc::new(HttpIamTokenExchange::new(&config.iam)?),
            audit: Arc::new(TracingAuditSink),
            lockout_store: Arc::new(InMemoryLockoutStore::new()),
            code_store: Arc::new(InMemoryOneTimeCodeStore::new()),
            clock: Arc::new(SystemClock),
        })
    }
}

/// 装配完成的登录模块
pub struct LoginModule {
    pub login: Arc<LoginService>,
    pub app_tokens: Arc<AppTokenService>,
    pub lockout: Arc<LockoutTracker>,
    pub sms_codes: Arc<SmsCodeService>,
    pub tokens: Arc<TokenProvider>,
}

impl LoginModule {
    pub fn build(config: &AppConfig, c: Collaborators) -> Self {
        let tokens = Arc::new(TokenProvider::from_config(&config.jwt).with_clock(c.clock.clone()));
        let issuer = TokenIssuer::new(tokens.clone());
        let audit = AuditRecorder::new(c.audit.clone(), c.clock.clone());

        let lockout = Arc::new(LockoutTracker::new(
            c.lockout_store.clone(),
            LockoutPolicy::from_config(&config.login),
            c.clock.clone(),
        ));
        let sms_codes = Arc::new(SmsCodeService::new(
            c.code_store.clone(),
            c.sms_sender.clone(),
            SmsCodeSettings::from_config(&config.sms),
            c.clock.clone(),
        ));
        let app_tokens = Arc::new(AppTokenService::new(c.apps.clone(), tokens.clone()));

        let password = LocalLoginStrategy::new(
            PasswordCheck::new(
                c.identities.clone(),
                c.password_matcher.clone(),
                lockout.clone(),
            ),
            c.identities.clone(),
            audit.clone(),
            issuer.clone(),
            c.clock.clone(),
        );
        let sms = LocalLoginStrategy::new(
            SmsCodeCheck::new(c.identities.clone(), sms_codes.clone()),
            c.identities.clone(),
            audit.clone(),
            issuer.clone(),
            c.clock.clone(),
        );
        let oauth2 = OAuth2LoginStrategy::new(
            Arc::new(AppCredentialOAuth2Provider::new(
                c.apps.clone(),
                app_tokens.clone(),
                c.identities.clone(),
                issuer.clone(),
            )),
            &config.oauth2.allowed_providers,
            audit.clone(),
        );
        let iam = IamLoginStrategy::new(
            Arc::new(IamLoginProvider::new(
                c.apps.clone(),
                c.iam_exchange.clone(),
                c.identities.clone(),
                issuer.clone(),
            )),
            audit,
        );

        let strategies: [Arc<dyn LoginStrategy>; 4] = [
            Arc::new(password),
            Arc::new(sms),
            Arc::new(oauth2),
            Arc::new(iam),
        ];
        let factory = Arc::new(LoginStrategyFactory::new(strategies));

        let login = Arc::new(LoginService::new(
            factory,
            sms_codes.clone(),
            issuer,
            c.identities,
        ));

        tracing::info!(
            max_retry_count = config.login.max_retry_count,
            lock_duration_minutes = config.login.lock_duration_minutes,
            "Login module assembled"
        );

        Self {
            login,
            app_tokens,
            lockout,
            sms_codes,
            tokens,
        }
    }
}
