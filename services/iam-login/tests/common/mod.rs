//! 场景测试公共夹具
//!
//! 全部协作方为内存实现，时间由 `ManualClock` 控制。

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use iam_login::domain::{
    AuditSink, IamExchangeRequest, IamTokenExchange, IamUserProfile, Identity,
    IdentityRepository, LoginAuditEntry, PasswordMatcher, SmsSender, ThirdPartyApp,
};
use iam_login::infrastructure::audit::InMemoryAuditSink;
use iam_login::infrastructure::memory::{
    InMemoryIdentityRepository, InMemoryLockoutStore, InMemoryOneTimeCodeStore,
    InMemoryThirdPartyAppRepository,
};
use iam_login::{Collaborators, LoginModule};
use keel_common::{ManualClock, TenantId};
use keel_config::AppConfig;
use keel_errors::{AppError, AppResult};
use parking_lot::Mutex;
use secrecy::ExposeSecret;

pub const PASSWORD: &str = "Passw0rd!";
pub const PHONE: &str = "13800138000";

const CONFIG: &str = r#"
app_name = "iam-login-test"

[jwt]
secret = "scenario-test-secret"
"#;

pub fn config() -> AppConfig {
    AppConfig::from_toml_str(CONFIG).expect("test config should parse")
}

/// 明文比对，存储格式为 `plain:<password>`
pub struct PlainPasswordMatcher;

impl PasswordMatcher for PlainPasswordMatcher {
    fn matches(&self, plain: &str, hash: &str) -> AppResult<bool> {
        Ok(hash.strip_prefix("plain:") == Some(plain))
    }
}

pub fn stored(password: &str) -> String {
    format!("plain:{}", password)
}

/// 记录下发的验证码
#[derive(Default)]
pub struct RecordingSmsSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSmsSender {
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|(p, _)| p == phone)
            .map(|(_, code)| code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl SmsSender for RecordingSmsSender {
    async fn send_verification_code(&self, phone: &str, code: &str) -> AppResult<bool> {
        self.sent.lock().push((phone.to_string(), code.to_string()));
        Ok(true)
    }
}

/// 可预置结果的 IAM 交换
#[derive(Default)]
pub struct StubIamExchange {
    profile: Mutex<Option<IamUserProfile>>,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl StubIamExchange {
    pub fn respond_with(&self, username: &str, nickname: Option<&str>) {
        *self.profile.lock() = Some(IamUserProfile {
            username: username.to_string(),
            nickname: nickname.map(str::to_string),
            email: None,
        });
    }

    /// (client_id, client_secret, code)
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl IamTokenExchange for StubIamExchange {
    async fn exchange(&self, request: &IamExchangeRequest) -> AppResult<IamUserProfile> {
        self.calls.lock().push((
            request.client_id.clone(),
            request.client_secret.expose_secret().clone(),
            request.code.clone(),
        ));
        self.profile
            .lock()
            .clone()
            .ok_or_else(|| AppError::external_service("IAM unreachable"))
    }
}

/// 总是失败的审计
pub struct BrokenAuditSink;

#[async_trait]
impl AuditSink for BrokenAuditSink {
    async fn record(&self, _entry: LoginAuditEntry) -> AppResult<()> {
        Err(AppError::internal("audit store offline"))
    }
}

/// 总是失败的身份仓储
pub struct BrokenIdentityRepository;

#[async_trait]
impl IdentityRepository for BrokenIdentityRepository {
    async fn find_by_username(
        &self,
        _username: &str,
        _tenant_id: Option<&TenantId>,
    ) -> AppResult<Option<Identity>> {
        Err(AppError::internal("connection reset by peer"))
    }

    async fn update(&self, _identity: &Identity) -> AppResult<()> {
        Err(AppError::internal("connection reset by peer"))
    }

    async fn create(&self, _identity: &Identity) -> AppResult<()> {
        Err(AppError::internal("connection reset by peer"))
    }
}

pub struct Harness {
    pub module: LoginModule,
    pub clock: Arc<ManualClock>,
    pub identities: Arc<InMemoryIdentityRepository>,
    pub apps: Arc<InMemoryThirdPartyAppRepository>,
    pub audit: Arc<InMemoryAuditSink>,
    pub sms: Arc<RecordingSmsSender>,
    pub iam: Arc<StubIamExchange>,
    pub codes: Arc<InMemoryOneTimeCodeStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(|_| {})
    }

    /// 先组装默认协作方，再由 `customize` 替换
    pub fn with(customize: impl FnOnce(&mut Collaborators)) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let identities = Arc::new(InMemoryIdentityRepository::with_identities(vec![
            Identity::new("alice", stored(PASSWORD)).with_nickname("Alice"),
            Identity::new(PHONE, "").with_phone(PHONE),
        ]));
        let apps = Arc::new(InMemoryThirdPartyAppRepository::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let sms = Arc::new(RecordingSmsSender::default());
        let iam = Arc::new(StubIamExchange::default());
        let codes = Arc::new(InMemoryOneTimeCodeStore::new());

        let mut collaborators = Collaborators {
            identities: identities.clone(),
            apps: apps.clone(),
            password_matcher: Arc::new(PlainPasswordMatcher),
            sms_sender: sms.clone(),
            iam_exchange: iam.clone(),
            audit: audit.clone(),
            lockout_store: Arc::new(InMemoryLockoutStore::new()),
            code_store: codes.clone(),
            clock: clock.clone(),
        };
        customize(&mut collaborators);

        Self {
            module: LoginModule::build(&config(), collaborators),
            clock,
            identities,
            apps,
            audit,
            sms,
            iam,
            codes,
        }
    }

    pub async fn add_identity(&self, identity: Identity) {
        self.identities.create(&identity).await.unwrap();
    }

    pub fn add_app(&self, app: ThirdPartyApp) {
        self.apps.save(app);
    }

    pub async fn identity(&self, username: &str) -> Identity {
        self.identities
            .find_by_username(username, None)
            .await
            .unwrap()
            .expect("identity should exist")
    }
}
