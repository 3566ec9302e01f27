//! Persistence Layer - 数据持久化
//!
//! 订阅数据保存在 SQLite 中

pub mod sqlite;

pub use self::sqlite::{SqliteSubscriberRepository, SqliteTitleRepository};
