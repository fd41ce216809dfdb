//! IAM Login - 可插拔登录子系统
//!
//! 按登录方式（密码、短信验证码、OAuth2、IAM）分发到对应策略，
//! 提供登录失败锁定、短信验证码、令牌签发与第三方应用令牌。

pub mod api;
pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;

pub use application::LoginService;
pub use bootstrap::{Collaborators, LoginModule, init_runtime};
pub use domain::{LoginRequest, LoginResponse, LoginType};
