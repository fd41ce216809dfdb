//! Argon2 密码比对

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use keel_errors::{AppError, AppResult};

use crate::domain::PasswordMatcher;

#[derive(Debug, Clone, Default)]
pub struct Argon2PasswordMatcher;

impl Argon2PasswordMatcher {
    pub fn new() -> Self {
        Self
    }

    /// 生成 PHC 格式哈希
    pub fn hash(plain: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::internal(format!("Password hashing failed: {}", e)))
    }
}

impl PasswordMatcher for Argon2PasswordMatcher {
    fn matches(&self, plain: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }
}
