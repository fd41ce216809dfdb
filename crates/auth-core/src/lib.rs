//! keel-auth-core - 认证核心库
//!
//! 令牌签发与校验（HS256）。令牌自包含，校验不依赖服务端会话存储。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use keel_common::{Clock, SystemClock};
use keel_config::JwtConfig;
use keel_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 自定义声明
pub type ClaimMap = Map<String, Value>;

const RESERVED_CLAIMS: [&str; 7] = ["sub", "aud", "iat", "exp", "jti", "iss", "token_type"];

/// 令牌类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject
    pub sub: String,
    /// Audience（设备 ID 或应用类型标签）
    pub aud: String,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    /// JWT ID
    pub jti: String,
    /// Issuer
    #[serde(default)]
    pub iss: String,
    pub token_type: TokenType,
    #[serde(flatten)]
    pub extra: ClaimMap,
}

impl TokenClaims {
    fn new(
        subject: &str,
        audience: &str,
        issuer: &str,
        token_type: TokenType,
        now: DateTime<Utc>,
        expires_in_secs: i64,
        mut extra: ClaimMap,
    ) -> Self {
        for key in RESERVED_CLAIMS {
            extra.remove(key);
        }

        Self {
            sub: subject.to_string(),
            aud: audience.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            jti: Uuid::now_v7().to_string(),
            iss: issuer.to_string(),
            token_type,
            extra,
        }
    }

    pub fn is_access_token(&self) -> bool {
        self.token_type == TokenType::Access
    }

    pub fn is_refresh_token(&self) -> bool {
        self.token_type == TokenType::Refresh
    }

    /// `exp` 等于当前秒也视为过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }

    /// 读取字符串类型的自定义声明
    pub fn claim_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// 读取字符串数组类型的自定义声明
    pub fn claim_strings(&self, key: &str) -> Vec<String> {
        self.extra
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// 访问令牌与刷新令牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// 访问令牌有效期（秒）
    pub expires_in: i64,
}

/// 令牌提供者
#[derive(Clone)]
pub struct TokenProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_expires_in: i64,
    refresh_token_expires_in: i64,
    audience_expires_in: HashMap<String, i64>,
    clock: Arc<dyn Clock>,
}

impl TokenProvider {
    pub fn new(
        secret: &str,
        issuer: impl Into<String>,
        access_token_expires_in: i64,
        refresh_token_expires_in: i64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            access_token_expires_in,
            refresh_token_expires_in,
            audience_expires_in: HashMap::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// 使用指定时钟计算签发时间与过期
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        let mut provider = Self::new(
            config.secret.expose_secret(),
            config.issuer.clone(),
            config.expires_in,
            config.refresh_expires_in,
        );
        provider.audience_expires_in = config.audience_expires_in.clone();
        provider
    }

    /// 为指定受众设置访问令牌有效期
    pub fn with_audience_ttl(mut self, audience: impl Into<String>, expires_in_secs: i64) -> Self {
        self.audience_expires_in
            .insert(audience.into(), expires_in_secs);
        self
    }

    /// 指定受众的访问令牌有效期（秒）
    pub fn access_ttl_for(&self, audience: &str) -> i64 {
        self.audience_expires_in
            .get(audience)
            .copied()
            .unwrap_or(self.access_token_expires_in)
    }

    pub fn refresh_ttl(&self) -> i64 {
        self.refresh_token_expires_in
    }

    /// 签发访问令牌
    pub fn issue(&self, subject: &str, audience: &str, claims: ClaimMap) -> AppResult<String> {
        let ttl = self.access_ttl_for(audience);
        self.issue_with_ttl(subject, audience, claims, TokenType::Access, ttl)
    }

    /// 签发刷新令牌
    pub fn issue_refresh(
        &self,
        subject: &str,
        audience: &str,
        claims: ClaimMap,
    ) -> AppResult<String> {
        self.issue_with_ttl(
            subject,
            audience,
            claims,
            TokenType::Refresh,
            self.refresh_token_expires_in,
        )
    }

    /// 同时签发访问令牌与刷新令牌
    pub fn issue_pair(
        &self,
        subject: &str,
        audience: &str,
        claims: ClaimMap,
    ) -> AppResult<TokenPair> {
        let access_token = self.issue(subject, audience, claims.clone())?;
        let refresh_token = self.issue_refresh(subject, audience, claims)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_for(audience),
        })
    }

    /// 以指定有效期签发令牌，有效期可为负（用于构造过期令牌）
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        audience: &str,
        claims: ClaimMap,
        token_type: TokenType,
        expires_in_secs: i64,
    ) -> AppResult<String> {
        let claims = TokenClaims::new(
            subject,
            audience,
            &self.issuer,
            token_type,
            self.clock.now(),
            expires_in_secs,
            claims,
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))
    }

    /// 校验签名、签发者、有效期与受众
    pub fn verify(&self, token: &str, audience: &str) -> AppResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[audience]);
        // 过期由注入的时钟判断
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        if self.is_expired(&claims) {
            return Err(AppError::unauthorized("Token expired"));
        }

        Ok(claims)
    }

    /// 按提供者的时钟判断声明是否过期
    pub fn is_expired(&self, claims: &TokenClaims) -> bool {
        claims.is_expired_at(self.clock.now())
    }

    /// 令牌是否有效
    pub fn validate(&self, token: &str, audience: &str) -> bool {
        self.verify(token, audience).is_ok()
    }

    /// 只校验签名与结构，不校验有效期与受众
    ///
    /// 用于刷新流程，调用方需自行检查过期。
    pub fn decode_claims(&self, token: &str) -> AppResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::unauthorized(format!("Invalid token: {}", e)))
    }
}
