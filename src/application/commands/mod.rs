//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod release_commands;
mod subscription_commands;

pub mod handlers;

pub use handlers::*;
pub use release_commands::*;
pub use subscription_commands::*;
