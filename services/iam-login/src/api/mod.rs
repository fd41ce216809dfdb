//! 线上接口适配
//!
//! 把 JSON 命令转换为领域请求，把结果包装为统一响应。不涉及具体的 HTTP 框架。

pub mod dto;
pub mod endpoint;

pub use dto::{ApiResponse, LoginCommand, RefreshCommand, SendCodeCommand};
pub use endpoint::{login_endpoint, refresh_endpoint, send_code_endpoint};
