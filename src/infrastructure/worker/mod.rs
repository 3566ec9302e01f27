//! Worker Layer - Background Task Processing
//!
//! - NotifierWorker: 定时检查新章节并推送
//! - ConversationSweeper: 清理空闲会话

mod conversation_sweeper;
mod notifier;

pub use conversation_sweeper::{ConversationSweeper, ConversationSweeperConfig};
pub use notifier::{NotifierConfig, NotifierWorker, ScanReport};
