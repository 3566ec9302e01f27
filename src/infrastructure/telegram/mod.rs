//! Telegram - Bot API 传输层
//!
//! - client: HTTP API 客户端，实现 MessengerPort
//! - poller: 长轮询接收更新
//! - types: API 数据类型

mod client;
mod poller;
mod types;

pub use client::{TelegramClient, TelegramClientConfig};
pub use poller::{UpdatePoller, UpdatePollerConfig};
pub use types::{Update, User};
