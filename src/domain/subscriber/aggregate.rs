//! Subscriber Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::manga::TitleId;

/// 聊天标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl ChatId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscriber 聚合根
///
/// 不变量:
/// - 同一个 Title 最多被引用一次（Title 在存储中按 (site, urn) 唯一，
///   因此按 TitleId 去重等价于按 (site, urn) 去重）
/// - 引用保持订阅顺序，用于生成稳定的退订索引
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    chat_id: ChatId,
    subscriptions: Vec<TitleId>,
    created_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            subscriptions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// 从持久化数据重建，重复引用会被折叠
    pub fn restore(chat_id: ChatId, subscriptions: Vec<TitleId>, created_at: DateTime<Utc>) -> Self {
        let mut subscriber = Self {
            chat_id,
            subscriptions: Vec::with_capacity(subscriptions.len()),
            created_at,
        };
        for title_id in subscriptions {
            subscriber.subscribe(title_id);
        }
        subscriber
    }

    /// 添加引用；已存在时返回 false
    pub fn subscribe(&mut self, title_id: TitleId) -> bool {
        if self.is_subscribed(&title_id) {
            return false;
        }
        self.subscriptions.push(title_id);
        true
    }

    /// 移除引用；不存在时返回 false
    pub fn unsubscribe(&mut self, title_id: &TitleId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|id| id != title_id);
        self.subscriptions.len() != before
    }

    pub fn is_subscribed(&self, title_id: &TitleId) -> bool {
        self.subscriptions.contains(title_id)
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn subscriptions(&self) -> &[TitleId] {
        &self.subscriptions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut subscriber = Subscriber::new(ChatId(42));
        let title_id = TitleId::new();

        assert!(subscriber.subscribe(title_id));
        assert!(!subscriber.subscribe(title_id));
        assert_eq!(subscriber.subscriptions().len(), 1);
    }

    #[test]
    fn test_unsubscribe_keeps_other_references() {
        let mut subscriber = Subscriber::new(ChatId(42));
        let first = TitleId::new();
        let second = TitleId::new();
        let third = TitleId::new();
        subscriber.subscribe(first);
        subscriber.subscribe(second);
        subscriber.subscribe(third);

        assert!(subscriber.unsubscribe(&second));
        assert_eq!(subscriber.subscriptions(), &[first, third]);
        assert!(!subscriber.unsubscribe(&second));
    }

    #[test]
    fn test_restore_collapses_duplicates() {
        let title_id = TitleId::new();
        let subscriber = Subscriber::restore(ChatId(1), vec![title_id, title_id], Utc::now());
        assert_eq!(subscriber.subscriptions(), &[title_id]);
    }
}
