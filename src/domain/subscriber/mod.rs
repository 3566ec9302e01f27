//! Subscriber Context - 订阅者限界上下文
//!
//! 订阅者以聊天 ID 标识，持有对 Title 的引用（而非副本）

mod aggregate;

pub use aggregate::{ChatId, Subscriber};
