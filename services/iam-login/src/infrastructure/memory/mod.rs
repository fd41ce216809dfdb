//! 进程内存储
//!
//! 单实例部署使用。多实例部署时锁定记录与验证码需要放到共享缓存中。

mod app_repository;
mod code_store;
mod identity_repository;
mod lockout_store;

pub use app_repository::InMemoryThirdPartyAppRepository;
pub use code_store::InMemoryOneTimeCodeStore;
pub use identity_repository::InMemoryIdentityRepository;
pub use lockout_store::InMemoryLockoutStore;
