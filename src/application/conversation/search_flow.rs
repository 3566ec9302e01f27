//! Search Flow - 搜索 → 选择 → 订阅
//!
//! | 状态 | 接受的事件 | 转移 |
//! |---|---|---|
//! | IDLE | 菜单「搜索」或 `/search` | → SEARCHING |
//! | SEARCHING | 文本 | 有结果 → SELECTING；无结果保持；菜单文本忽略 |
//! | SELECTING | `search:<i>` | → CONFIRMING；索引无效 → END |
//! | CONFIRMING | `sub:<i>` | → END |
//!
//! 任意状态下 `/cancel` → END。
//!
//! 订阅成功后保留刚确认的候选项，直到下一次搜索、取消或空闲过期：
//! 重复点击同一个 `sub:<i>` 得到「已订阅」，而不是「选择已过期」。

use async_trait::async_trait;
use std::sync::Arc;

use super::{
    CallbackToken, CallbackVerb, Conversation, EventKind, FlowOutcome, InboundEvent,
    PendingSelection, Reply,
};
use crate::application::commands::{SubscribeCommand, SubscribeHandler, SubscribeOutcome};
use crate::application::messages;
use crate::application::ports::{
    BotCommand, ConversationStorePort, InlineButton, OutgoingMessage, ReleaseInfo, SearchHit,
    SiteAdapterPort,
};
use crate::domain::{ChatId, SiteType, Urn};

/// 搜索流程配置
#[derive(Debug, Clone)]
pub struct SearchFlowConfig {
    /// 搜索使用的站点
    pub site: SiteType,
    /// 每次展示的最大结果数（同时是 PendingSelection 的容量）
    pub max_results: usize,
}

impl Default for SearchFlowConfig {
    fn default() -> Self {
        Self {
            site: SiteType::ReadManga,
            max_results: 5,
        }
    }
}

/// 已选中、等待确认订阅的作品
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// 选择时使用的索引，确认按钮回传同一索引
    pub index: usize,
    pub urn: Urn,
    pub info: ReleaseInfo,
}

/// 搜索流程状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Searching,
    Selecting { pending: PendingSelection<SearchHit> },
    Confirming { candidate: Candidate },
}

/// 搜索流程
pub struct SearchFlow {
    config: SearchFlowConfig,
    adapter: Arc<dyn SiteAdapterPort>,
    subscribe: Arc<SubscribeHandler>,
    store: Arc<dyn ConversationStorePort<SearchState>>,
    /// 最近一次确认订阅的候选项，会话结束后仍保留
    confirmed: Arc<dyn ConversationStorePort<Candidate>>,
}

impl SearchFlow {
    pub fn new(
        config: SearchFlowConfig,
        adapter: Arc<dyn SiteAdapterPort>,
        subscribe: Arc<SubscribeHandler>,
        store: Arc<dyn ConversationStorePort<SearchState>>,
        confirmed: Arc<dyn ConversationStorePort<Candidate>>,
    ) -> Self {
        Self {
            config,
            adapter,
            subscribe,
            store,
            confirmed,
        }
    }

    /// 当前状态；没有进行中的会话即 IDLE
    pub fn state(&self, chat_id: ChatId) -> SearchState {
        self.store.get(chat_id).unwrap_or(SearchState::Idle)
    }

    fn is_entry(event: &InboundEvent) -> bool {
        event.is_text(messages::SEARCH_BUTTON) || event.is_command("search")
    }

    fn finish(&self, chat_id: ChatId, replies: Vec<Reply>) -> FlowOutcome {
        self.store.end(chat_id);
        FlowOutcome::Handled(replies)
    }

    /// 写入下一个状态；会话在等待站点期间已结束时提示重新搜索
    fn advance(&self, chat_id: ChatId, state: SearchState, replies: Vec<Reply>) -> FlowOutcome {
        if self.store.update(chat_id, state) {
            return FlowOutcome::Handled(replies);
        }
        tracing::debug!(chat_id = %chat_id, "Search conversation ended while processing");
        FlowOutcome::Handled(vec![Reply::text(messages::SELECTION_EXPIRED)])
    }

    fn enter(&self, chat_id: ChatId) -> FlowOutcome {
        self.confirmed.end(chat_id);
        self.store.begin(chat_id, SearchState::Searching);
        tracing::debug!(chat_id = %chat_id, "Search conversation started");
        FlowOutcome::Handled(vec![Reply::text(messages::SEARCH_PROMPT)])
    }

    async fn search(&self, chat_id: ChatId, text: &str) -> FlowOutcome {
        let query = text.trim();
        if messages::is_menu_button(query) || query.is_empty() {
            return FlowOutcome::Handled(Vec::new());
        }

        let hits = match self.adapter.search(query).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(chat_id = %chat_id, query = %query, error = %e, "Search failed");
                return self.finish(chat_id, vec![Reply::text(messages::FETCH_FAILED)]);
            }
        };

        if hits.is_empty() {
            // 刷新活动时间，继续等待新的查询
            return self.advance(
                chat_id,
                SearchState::Searching,
                vec![Reply::text(messages::NOTHING_FOUND)],
            );
        }

        let pending = PendingSelection::new(hits, self.config.max_results);
        let buttons = pending
            .iter()
            .map(|(index, hit)| {
                InlineButton::new(hit.name.clone(), CallbackToken::search(index).to_string())
            })
            .collect();
        let message = OutgoingMessage::text(messages::found(pending.len())).with_buttons(buttons);

        tracing::debug!(chat_id = %chat_id, query = %query, results = pending.len(), "Search results presented");
        self.advance(
            chat_id,
            SearchState::Selecting { pending },
            vec![Reply::Send(message)],
        )
    }

    async fn select(
        &self,
        chat_id: ChatId,
        pending: PendingSelection<SearchHit>,
        index: usize,
    ) -> FlowOutcome {
        let Some(hit) = pending.take(index) else {
            tracing::debug!(chat_id = %chat_id, index = index, "Selection index expired");
            return self.finish(chat_id, vec![Reply::text(messages::SELECTION_EXPIRED)]);
        };

        let Ok(urn) = Urn::new(hit.urn.as_str()) else {
            return self.finish(chat_id, vec![Reply::text(messages::TITLE_UNAVAILABLE)]);
        };

        let info = match self.adapter.get_latest_release(urn.as_str()).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                return self.finish(chat_id, vec![Reply::text(messages::TITLE_UNAVAILABLE)]);
            }
            Err(e) => {
                tracing::warn!(chat_id = %chat_id, urn = %urn, error = %e, "Release lookup failed");
                return self.finish(chat_id, vec![Reply::text(messages::FETCH_FAILED)]);
            }
        };

        let card = OutgoingMessage::text(messages::release_card(&info)).with_buttons(vec![
            InlineButton::new(
                messages::SUBSCRIBE_BUTTON,
                CallbackToken::subscribe(index).to_string(),
            ),
        ]);

        self.advance(
            chat_id,
            SearchState::Confirming {
                candidate: Candidate { index, urn, info },
            },
            vec![Reply::DeleteSource, Reply::Send(card)],
        )
    }

    async fn confirm(&self, chat_id: ChatId, candidate: Candidate, index: usize) -> FlowOutcome {
        if index != candidate.index {
            return self.finish(chat_id, vec![Reply::text(messages::SELECTION_EXPIRED)]);
        }

        let replies = self.subscribe_candidate(chat_id, candidate).await;
        self.finish(chat_id, replies)
    }

    /// 订阅候选项；成功后记住它，重复确认走同一条幂等路径
    async fn subscribe_candidate(&self, chat_id: ChatId, candidate: Candidate) -> Vec<Reply> {
        let cmd = SubscribeCommand {
            chat_id,
            site: self.config.site,
            urn: candidate.urn.clone(),
            name: candidate.info.name.clone(),
            release: candidate.info.release,
        };

        let text = match self.subscribe.handle(cmd).await {
            Ok(SubscribeOutcome::Subscribed(title)) => messages::subscribed(title.name()),
            Ok(SubscribeOutcome::AlreadySubscribed(title)) => {
                messages::already_subscribed(title.name())
            }
            Err(e) => {
                tracing::error!(chat_id = %chat_id, error = %e, "Subscribe failed");
                return vec![Reply::text(messages::INTERNAL_ERROR)];
            }
        };

        self.confirmed.begin(chat_id, candidate);
        vec![Reply::DeleteSource, Reply::text(text)]
    }

    /// 会话结束后再次点击刚确认过的订阅按钮
    async fn reconfirm(&self, chat_id: ChatId, index: usize) -> FlowOutcome {
        match self.confirmed.get(chat_id) {
            Some(candidate) if candidate.index == index => {
                FlowOutcome::Handled(self.subscribe_candidate(chat_id, candidate).await)
            }
            _ => FlowOutcome::NotHandled,
        }
    }
}

#[async_trait]
impl Conversation for SearchFlow {
    fn name(&self) -> &'static str {
        "search"
    }

    fn commands(&self) -> Vec<BotCommand> {
        vec![BotCommand::new("search", "Поиск тайтла")]
    }

    async fn handle(&self, event: &InboundEvent) -> FlowOutcome {
        let chat_id = event.chat_id;

        match (self.state(chat_id), &event.kind) {
            (SearchState::Idle, _) if Self::is_entry(event) => self.enter(chat_id),
            (SearchState::Idle, EventKind::Callback { data, .. }) => {
                match data.parse::<CallbackToken>() {
                    Ok(token) if token.verb == CallbackVerb::Subscribe => {
                        self.reconfirm(chat_id, token.index).await
                    }
                    _ => FlowOutcome::NotHandled,
                }
            }
            (SearchState::Searching, EventKind::Text(text)) => self.search(chat_id, text).await,
            (SearchState::Selecting { pending }, EventKind::Callback { data, .. }) => {
                match data.parse::<CallbackToken>() {
                    Ok(token) if token.verb == CallbackVerb::Search => {
                        self.select(chat_id, pending, token.index).await
                    }
                    _ => FlowOutcome::NotHandled,
                }
            }
            (SearchState::Confirming { candidate }, EventKind::Callback { data, .. }) => {
                match data.parse::<CallbackToken>() {
                    Ok(token) if token.verb == CallbackVerb::Subscribe => {
                        self.confirm(chat_id, candidate, token.index).await
                    }
                    _ => FlowOutcome::NotHandled,
                }
            }
            _ => FlowOutcome::NotHandled,
        }
    }

    fn cancel(&self, chat_id: ChatId) -> Option<Vec<Reply>> {
        self.confirmed.end(chat_id);
        self.store.end(chat_id).map(|_| {
            tracing::debug!(chat_id = %chat_id, "Search conversation cancelled");
            vec![Reply::text(messages::SEARCH_CANCELLED)]
        })
    }
}
