//! 应用层

pub mod app_token_service;
pub mod lockout_tracker;
pub mod login_service;
pub mod providers;
pub mod sms_code_service;
pub mod strategies;
pub mod strategy_factory;
pub mod token_issuer;

pub use app_token_service::AppTokenService;
pub use lockout_tracker::LockoutTracker;
pub use login_service::LoginService;
pub use sms_code_service::{SmsCodeService, SmsCodeSettings};
pub use strategy_factory::LoginStrategyFactory;
pub use token_issuer::TokenIssuer;
