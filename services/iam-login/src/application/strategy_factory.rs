//! 登录策略分发
//!
//! 启动时一次性注册全部策略，之后只读，可被并发请求共享。

use std::collections::HashMap;
use std::sync::Arc;

use keel_errors::{AppError, AppResult};

use super::strategies::LoginStrategy;
use crate::domain::LoginType;

pub struct LoginStrategyFactory {
    strategies: HashMap<LoginType, Arc<dyn LoginStrategy>>,
}

impl LoginStrategyFactory {
    /// 同一登录方式重复注册时后者覆盖前者
    pub fn new(strategies: impl IntoIterator<Item = Arc<dyn LoginStrategy>>) -> Self {
        let mut map: HashMap<LoginType, Arc<dyn LoginStrategy>> = HashMap::new();
        for strategy in strategies {
            let login_type = strategy.login_type();
            if map.insert(login_type, strategy).is_some() {
                tracing::warn!(login_type = %login_type, "Login strategy registered twice");
            }
        }
        tracing::debug!(count = map.len(), "Login strategies registered");
        Self { strategies: map }
    }

    /// 按登录方式标签（区分大小写）取策略
    pub fn resolve(&self, login_type: &str) -> AppResult<Arc<dyn LoginStrategy>> {
        LoginType::from_tag(login_type)
            .and_then(|t| self.strategies.get(&t).cloned())
            .ok_or_else(|| AppError::unsupported_login_type(login_type))
    }

    pub fn supports(&self, login_type: &str) -> bool {
        LoginType::from_tag(login_type).is_some_and(|t| self.strategies.contains_key(&t))
    }

    /// 已注册的登录方式
    pub fn login_types(&self) -> Vec<LoginType> {
        LoginType::ALL
            .into_iter()
            .filter(|t| self.strategies.contains_key(t))
            .collect()
    }
}
