//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Manga Context: 被追踪的漫画作品（Title）及其最新发布点（Release）
//! - Subscriber Context: 订阅者（聊天）及其关注列表

pub mod manga;
pub mod subscriber;

pub use manga::{Release, SiteType, Title, TitleError, TitleId, Urn};
pub use subscriber::{ChatId, Subscriber};
