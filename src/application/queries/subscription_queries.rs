//! Subscription Queries

use crate::domain::ChatId;

/// 列出聊天当前的订阅（按订阅顺序）
#[derive(Debug, Clone)]
pub struct ListSubscriptions {
    pub chat_id: ChatId,
}
