//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod memory;
pub mod persistence;
pub mod telegram;
pub mod worker;

pub use adapters::{FakeSiteAdapter, ReadMangaClient, ReadMangaClientConfig};
pub use memory::{InMemoryConversationStore, RecordingMessenger};
pub use persistence::{SqliteSubscriberRepository, SqliteTitleRepository};
pub use telegram::{TelegramClient, TelegramClientConfig, UpdatePoller, UpdatePollerConfig};
pub use worker::{
    ConversationSweeper, ConversationSweeperConfig, NotifierConfig, NotifierWorker, ScanReport,
};
