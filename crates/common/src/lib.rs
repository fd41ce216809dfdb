//! keel-common - 通用类型和工具库

pub mod clock;
pub mod context;
pub mod types;
pub mod utils;

pub use clock::*;
pub use context::*;
pub use types::*;
