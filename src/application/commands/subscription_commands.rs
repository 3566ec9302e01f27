//! Subscription Commands - 订阅相关命令

use crate::domain::{ChatId, Release, SiteType, Title, TitleId, Urn};

/// 订阅命令 - 按 (site, urn) 查找或创建 Title，并挂到订阅者上
#[derive(Debug, Clone)]
pub struct SubscribeCommand {
    pub chat_id: ChatId,
    pub site: SiteType,
    pub urn: Urn,
    pub name: String,
    pub release: Release,
}

/// 订阅结果
#[derive(Debug, Clone)]
pub enum SubscribeOutcome {
    Subscribed(Title),
    /// 已经订阅过，不产生重复引用
    AlreadySubscribed(Title),
}

impl SubscribeOutcome {
    pub fn title(&self) -> &Title {
        match self {
            SubscribeOutcome::Subscribed(title) | SubscribeOutcome::AlreadySubscribed(title) => {
                title
            }
        }
    }
}

/// 退订命令
#[derive(Debug, Clone)]
pub struct UnsubscribeCommand {
    pub chat_id: ChatId,
    pub title_id: TitleId,
}

/// 退订结果
#[derive(Debug, Clone)]
pub enum UnsubscribeOutcome {
    Unsubscribed {
        title_name: String,
        /// Title 不再被任何订阅者引用而被删除
        title_removed: bool,
    },
    NotSubscribed,
}
