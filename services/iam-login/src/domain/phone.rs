//! 手机号值对象

use std::sync::LazyLock;

use keel_errors::{AppError, AppResult};
use regex::Regex;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1[3-9]\d{9}$").expect("phone pattern is valid"));

/// 手机号
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{_0}")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(value: &str) -> AppResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::validation("Phone number is required"));
        }
        if !PHONE_PATTERN.is_match(value) {
            return Err(AppError::validation("Invalid phone number format"));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
