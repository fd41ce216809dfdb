//! 领域层

pub mod audit;
pub mod identity;
pub mod lockout;
pub mod login;
pub mod one_time_code;
pub mod phone;
pub mod services;
pub mod third_party_app;

pub use audit::{AuditSink, LoginAuditEntry};
pub use identity::{Identity, IdentityRepository, IdentityStatus};
pub use lockout::{LockState, LockoutPolicy, LockoutRecord, LockoutStore};
pub use login::{LoginRequest, LoginResponse, LoginType, UserInfo};
pub use one_time_code::{ConsumeOutcome, OneTimeCode, OneTimeCodeStore, SendSlot};
pub use phone::PhoneNumber;
pub use services::{
    IamExchangeRequest, IamTokenExchange, IamUserProfile, PasswordMatcher, SmsSender,
};
pub use third_party_app::{ThirdPartyApp, ThirdPartyAppRepository};
