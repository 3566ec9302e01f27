//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod release_handlers;
mod subscription_handlers;

pub use release_handlers::*;
pub use subscription_handlers::*;
