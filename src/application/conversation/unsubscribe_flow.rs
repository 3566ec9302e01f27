//! Unsubscribe Flow - 单步退订
//!
//! 菜单「订阅」或 `/subscriptions` 列出当前订阅（索引 → Title），
//! 点击 `unsub:<i>` 移除对应引用后结束。再次进入会用最新列表覆盖旧映射。
//! 一条消息最多列出 [`MAX_LISTED_SUBSCRIPTIONS`] 个按钮。

use async_trait::async_trait;
use std::sync::Arc;

use super::{
    CallbackToken, CallbackVerb, Conversation, EventKind, FlowOutcome, InboundEvent,
    PendingSelection, Reply,
};
use crate::application::commands::{UnsubscribeCommand, UnsubscribeHandler, UnsubscribeOutcome};
use crate::application::messages;
use crate::application::ports::{BotCommand, ConversationStorePort, InlineButton, OutgoingMessage};
use crate::application::queries::{handlers::ListSubscriptionsHandler, ListSubscriptions};
use crate::domain::{ChatId, TitleId};

/// 单条消息的按钮上限，超出部分不列出
pub const MAX_LISTED_SUBSCRIPTIONS: usize = 50;

/// 退订流程状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeState {
    Idle,
    Choosing { pending: PendingSelection<TitleId> },
}

/// 退订流程
pub struct UnsubscribeFlow {
    list: Arc<ListSubscriptionsHandler>,
    unsubscribe: Arc<UnsubscribeHandler>,
    store: Arc<dyn ConversationStorePort<UnsubscribeState>>,
}

impl UnsubscribeFlow {
    pub fn new(
        list: Arc<ListSubscriptionsHandler>,
        unsubscribe: Arc<UnsubscribeHandler>,
        store: Arc<dyn ConversationStorePort<UnsubscribeState>>,
    ) -> Self {
        Self {
            list,
            unsubscribe,
            store,
        }
    }

    pub fn state(&self, chat_id: ChatId) -> UnsubscribeState {
        self.store.get(chat_id).unwrap_or(UnsubscribeState::Idle)
    }

    fn is_entry(event: &InboundEvent) -> bool {
        event.is_text(messages::SUBSCRIPTIONS_BUTTON) || event.is_command("subscriptions")
    }

    fn finish(&self, chat_id: ChatId, replies: Vec<Reply>) -> FlowOutcome {
        self.store.end(chat_id);
        FlowOutcome::Handled(replies)
    }

    async fn present(&self, chat_id: ChatId) -> FlowOutcome {
        let titles = match self.list.handle(ListSubscriptions { chat_id }).await {
            Ok(titles) => titles,
            Err(e) => {
                tracing::error!(chat_id = %chat_id, error = %e, "Failed to list subscriptions");
                return self.finish(chat_id, vec![Reply::text(messages::INTERNAL_ERROR)]);
            }
        };

        if titles.is_empty() {
            return self.finish(chat_id, vec![Reply::text(messages::NO_SUBSCRIPTIONS)]);
        }

        let shown = &titles[..titles.len().min(MAX_LISTED_SUBSCRIPTIONS)];
        let buttons = shown
            .iter()
            .enumerate()
            .map(|(index, title)| {
                InlineButton::new(
                    messages::subscription_button(title.name(), title.release()),
                    CallbackToken::unsubscribe(index).to_string(),
                )
            })
            .collect();
        let pending = PendingSelection::new(shown.iter().map(|t| *t.id()), shown.len());

        self.store.begin(chat_id, UnsubscribeState::Choosing { pending });

        let header = messages::subscriptions_header(shown.len(), titles.len());
        let message = OutgoingMessage::text(header).with_buttons(buttons);
        FlowOutcome::Handled(vec![Reply::Send(message)])
    }

    async fn remove(
        &self,
        chat_id: ChatId,
        pending: PendingSelection<TitleId>,
        index: usize,
    ) -> FlowOutcome {
        let Some(title_id) = pending.take(index) else {
            return self.finish(chat_id, vec![Reply::text(messages::SELECTION_EXPIRED)]);
        };

        let replies = match self
            .unsubscribe
            .handle(UnsubscribeCommand { chat_id, title_id })
            .await
        {
            Ok(UnsubscribeOutcome::Unsubscribed { title_name, .. }) => vec![
                Reply::DeleteSource,
                Reply::text(messages::unsubscribed(&title_name)),
            ],
            Ok(UnsubscribeOutcome::NotSubscribed) => {
                vec![Reply::text(messages::SELECTION_EXPIRED)]
            }
            Err(e) => {
                tracing::error!(chat_id = %chat_id, title_id = %title_id, error = %e, "Unsubscribe failed");
                vec![Reply::text(messages::INTERNAL_ERROR)]
            }
        };

        self.finish(chat_id, replies)
    }
}

#[async_trait]
impl Conversation for UnsubscribeFlow {
    fn name(&self) -> &'static str {
        "unsubscribe"
    }

    fn commands(&self) -> Vec<BotCommand> {
        vec![BotCommand::new("subscriptions", "Мои подписки")]
    }

    async fn handle(&self, event: &InboundEvent) -> FlowOutcome {
        let chat_id = event.chat_id;

        if Self::is_entry(event) {
            return self.present(chat_id).await;
        }

        match (self.state(chat_id), &event.kind) {
            (UnsubscribeState::Choosing { pending }, EventKind::Callback { data, .. }) => {
                match data.parse::<CallbackToken>() {
                    Ok(token) if token.verb == CallbackVerb::Unsubscribe => {
                        self.remove(chat_id, pending, token.index).await
                    }
                    _ => FlowOutcome::NotHandled,
                }
            }
            _ => FlowOutcome::NotHandled,
        }
    }

    fn cancel(&self, chat_id: ChatId) -> Option<Vec<Reply>> {
        self.store.end(chat_id).map(|_| Vec::new())
    }
}
