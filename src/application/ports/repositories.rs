//! Repository Ports - 出站端口
//!
//! 定义订阅存储的抽象接口
//! 具体实现在 infrastructure 层（SQLite）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ChatId, Release, SiteType, Subscriber, Title, TitleId, Urn};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Title Repository
// ============================================================================

/// Title Repository Port
#[async_trait]
pub trait TitleRepositoryPort: Send + Sync {
    async fn find_by_id(&self, id: &TitleId) -> Result<Option<Title>, RepositoryError>;

    /// 按唯一键 (site, urn) 查找
    async fn find_by_key(&self, site: SiteType, urn: &Urn)
        -> Result<Option<Title>, RepositoryError>;

    /// 批量查找，结果顺序与 `ids` 一致，缺失的 ID 被跳过
    async fn find_many(&self, ids: &[TitleId]) -> Result<Vec<Title>, RepositoryError>;

    async fn find_all(&self) -> Result<Vec<Title>, RepositoryError>;

    /// 条件更新发布点
    ///
    /// 仅当 `release` 严格大于已存储的值时写入，返回是否写入。
    /// 比较和写入在一条语句内完成。
    async fn advance_release(&self, id: &TitleId, release: Release)
        -> Result<bool, RepositoryError>;

    /// 没有任何订阅者引用时删除，返回是否删除
    async fn delete_if_orphaned(&self, id: &TitleId) -> Result<bool, RepositoryError>;
}

// ============================================================================
// Subscriber Repository
// ============================================================================

/// Subscriber Repository Port
#[async_trait]
pub trait SubscriberRepositoryPort: Send + Sync {
    async fn find(&self, chat_id: ChatId) -> Result<Option<Subscriber>, RepositoryError>;

    /// 保存订阅者及其完整引用列表（覆盖式）
    async fn save(&self, subscriber: &Subscriber) -> Result<(), RepositoryError>;

    /// 订阅作品
    ///
    /// 在同一个事务内按 (site, urn) 查找或创建 Title，并追加到订阅列表末尾。
    /// 返回已存储的 Title 以及是否新增了引用（已订阅时为 `false`）。
    async fn attach(&self, chat_id: ChatId, title: &Title)
        -> Result<(Title, bool), RepositoryError>;

    /// 所有引用了该 Title 的聊天
    async fn find_chats_by_title(&self, title_id: &TitleId)
        -> Result<Vec<ChatId>, RepositoryError>;
}
