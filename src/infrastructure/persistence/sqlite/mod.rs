//! SQLite Persistence - SQLite 数据库持久化实现

mod database;
mod subscriber_repo;
mod title_repo;

pub use database::*;
pub use subscriber_repo::*;
pub use title_repo::*;
