//! 基础设施层

pub mod audit;
pub mod iam_client;
pub mod memory;
pub mod observability;
pub mod password;
pub mod sms;
