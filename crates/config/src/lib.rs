//! keel-config - 配置加载库

use std::collections::HashMap;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

use secrecy::Secret;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// JWT 配置
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// 访问令牌有效期（秒）
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    /// 刷新令牌有效期（秒）
    #[serde(default = "default_refresh_expires_in")]
    pub refresh_expires_in: i64,
    /// 按受众覆盖访问令牌有效期（秒）
    #[serde(default)]
    pub audience_expires_in: HashMap<String, i64>,
}

fn default_issuer() -> String {
    "keel".to_string()
}

fn default_expires_in() -> i64 {
    3600
}

fn default_refresh_expires_in() -> i64 {
    86400
}

/// 登录锁定配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoginConfig {
    /// 连续失败多少次后锁定
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,
    /// 锁定时长（分钟）
    #[serde(default = "default_lock_duration_minutes")]
    pub lock_duration_minutes: i64,
}

fn default_max_retry_count() -> u32 {
    5
}

fn default_lock_duration_minutes() -> i64 {
    10
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            lock_duration_minutes: default_lock_duration_minutes(),
        }
    }
}

/// 短信验证码配置
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    #[serde(default = "default_code_expiry_minutes")]
    pub code_expiry_minutes: i64,
    /// 同一手机号两次发送的最小间隔（分钟）
    #[serde(default = "default_min_interval_minutes")]
    pub min_interval_minutes: i64,
}

fn default_code_length() -> usize {
    6
}

fn default_code_expiry_minutes() -> i64 {
    5
}

fn default_min_interval_minutes() -> i64 {
    1
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            code_expiry_minutes: default_code_expiry_minutes(),
            min_interval_minutes: default_min_interval_minutes(),
        }
    }
}

/// OAuth2 配置
#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2Config {
    /// 允许的提供商（大小写不敏感）
    #[serde(default = "default_allowed_providers")]
    pub allowed_providers: Vec<String>,
}

fn default_allowed_providers() -> Vec<String> {
    vec![
        "github".to_string(),
        "google".to_string(),
        "wechat".to_string(),
    ]
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            allowed_providers: default_allowed_providers(),
        }
    }
}

/// IAM 配置
#[derive(Debug, Clone, Deserialize)]
pub struct IamConfig {
    #[serde(default = "default_iam_server_url")]
    pub server_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_iam_server_url() -> String {
    "http://localhost:8081/iam".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for IamConfig {
    fn default() -> Self {
        Self {
            server_url: default_iam_server_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 是否输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub oauth2: OAuth2Config,
    #[serde(default)]
    pub iam: IamConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 环境变量使用 `KEEL_` 前缀，`__` 分隔层级，例如 `KEEL_LOGIN__MAX_RETRY_COUNT=3`。
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("KEEL_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::new().merge(Toml::string(toml)).extract()?;
        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
