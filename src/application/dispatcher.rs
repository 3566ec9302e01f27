//! Dispatcher - 入站事件路由
//!
//! 路由顺序：
//! 1. 回退命令（`/cancel`）：结束所有进行中的会话
//! 2. 会话流程：按注册顺序，第一个处理该事件的流程生效
//! 3. 无状态命令（`/start`）
//! 4. 未被处理的回调：按钮已过期
//!
//! 同一聊天的事件串行处理，不同聊天之间互不阻塞

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::conversation::{Conversation, EventKind, FlowOutcome, InboundEvent, Reply};
use crate::application::messages;
use crate::application::ports::{BotCommand, MessengerPort, OutgoingMessage};
use crate::domain::ChatId;

/// 无状态命令处理器
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, event: &InboundEvent) -> Vec<Reply>;
}

/// `/start`：问候并展示常驻菜单
pub struct StartHandler;

#[async_trait]
impl CommandHandler for StartHandler {
    async fn handle(&self, _event: &InboundEvent) -> Vec<Reply> {
        let menu = vec![messages::MENU_BUTTONS.iter().map(|b| b.to_string()).collect()];
        vec![Reply::Send(
            OutgoingMessage::text(messages::GREETING).with_menu(menu),
        )]
    }
}

/// 分发器构建器
pub struct DispatcherBuilder {
    messenger: Arc<dyn MessengerPort>,
    commands: Vec<(BotCommand, Arc<dyn CommandHandler>)>,
    conversations: Vec<Arc<dyn Conversation>>,
    fallback: Option<BotCommand>,
}

impl DispatcherBuilder {
    pub fn new(messenger: Arc<dyn MessengerPort>) -> Self {
        Self {
            messenger,
            commands: Vec::new(),
            conversations: Vec::new(),
            fallback: None,
        }
    }

    pub fn command(mut self, command: BotCommand, handler: Arc<dyn CommandHandler>) -> Self {
        self.commands.push((command, handler));
        self
    }

    pub fn conversation(mut self, conversation: Arc<dyn Conversation>) -> Self {
        self.conversations.push(conversation);
        self
    }

    /// 在任意会话状态下都会被优先处理的命令
    pub fn fallback(mut self, command: BotCommand) -> Self {
        self.fallback = Some(command);
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            messenger: self.messenger,
            commands: self.commands,
            conversations: self.conversations,
            fallback: self.fallback,
            chat_locks: DashMap::new(),
        }
    }
}

/// 事件分发器
pub struct Dispatcher {
    messenger: Arc<dyn MessengerPort>,
    commands: Vec<(BotCommand, Arc<dyn CommandHandler>)>,
    conversations: Vec<Arc<dyn Conversation>>,
    fallback: Option<BotCommand>,
    chat_locks: DashMap<ChatId, Arc<Mutex<()>>>,
}

impl Dispatcher {
    pub fn builder(messenger: Arc<dyn MessengerPort>) -> DispatcherBuilder {
        DispatcherBuilder::new(messenger)
    }

    /// 客户端命令菜单：无状态命令、流程入口、回退命令
    pub fn bot_commands(&self) -> Vec<BotCommand> {
        let mut commands: Vec<BotCommand> =
            self.commands.iter().map(|(c, _)| c.clone()).collect();
        for conversation in &self.conversations {
            commands.extend(conversation.commands());
        }
        commands.extend(self.fallback.iter().cloned());
        commands
    }

    /// 决定对事件的回复，不产生消息副作用
    pub async fn route(&self, event: &InboundEvent) -> Vec<Reply> {
        if let Some(fallback) = &self.fallback {
            if event.is_command(&fallback.command) {
                return self
                    .conversations
                    .iter()
                    .filter_map(|c| c.cancel(event.chat_id))
                    .flatten()
                    .collect();
            }
        }

        for conversation in &self.conversations {
            if let FlowOutcome::Handled(replies) = conversation.handle(event).await {
                tracing::trace!(chat_id = %event.chat_id, flow = conversation.name(), "Event handled by conversation");
                return replies;
            }
        }

        match &event.kind {
            EventKind::Command { name, .. } => {
                match self.commands.iter().find(|(c, _)| &c.command == name) {
                    Some((_, handler)) => handler.handle(event).await,
                    None => Vec::new(),
                }
            }
            EventKind::Callback { data, .. } => {
                tracing::debug!(chat_id = %event.chat_id, data = %data, "Stale callback");
                vec![Reply::text(messages::SELECTION_EXPIRED)]
            }
            EventKind::Text(_) => Vec::new(),
        }
    }

    /// 处理一个入站事件：路由、发送回复、确认回调
    pub async fn dispatch(&self, event: InboundEvent) {
        let chat_id = event.chat_id;
        let lock = self.chat_locks.entry(chat_id).or_default().clone();
        let guard = lock.lock().await;

        let replies = self.route(&event).await;
        self.deliver(&event, replies).await;

        if let Some(callback_id) = event.callback_id() {
            if let Err(e) = self.messenger.answer_callback(callback_id).await {
                tracing::warn!(chat_id = %chat_id, error = %e, "Failed to answer callback");
            }
        }

        drop(guard);
        drop(lock);
        self.chat_locks
            .remove_if(&chat_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn deliver(&self, event: &InboundEvent, replies: Vec<Reply>) {
        let chat_id = event.chat_id;
        for reply in replies {
            match reply {
                Reply::Send(message) => {
                    if let Err(e) = self.messenger.send_message(chat_id, &message).await {
                        tracing::error!(chat_id = %chat_id, error = %e, "Failed to send message");
                    }
                }
                Reply::DeleteSource => {
                    let Some(message_id) = event.message_id else {
                        continue;
                    };
                    if let Err(e) = self.messenger.delete_message(chat_id, message_id).await {
                        tracing::warn!(chat_id = %chat_id, error = %e, "Failed to delete message");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MessageId, ReplyMarkup};
    use crate::domain::ChatId;
    use crate::infrastructure::memory::RecordingMessenger;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CHAT: ChatId = ChatId(77);

    /// 只接受 `ping` 文本的流程
    struct PingFlow {
        active: DashMap<ChatId, ()>,
        calls: AtomicUsize,
    }

    impl PingFlow {
        fn new() -> Self {
            Self {
                active: DashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Conversation for PingFlow {
        fn name(&self) -> &'static str {
            "ping"
        }

        fn commands(&self) -> Vec<BotCommand> {
            vec![BotCommand::new("ping", "Ping")]
        }

        async fn handle(&self, event: &InboundEvent) -> FlowOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if event.is_text("ping") {
                self.active.insert(event.chat_id, ());
                FlowOutcome::Handled(vec![Reply::DeleteSource, Reply::text("pong")])
            } else {
                FlowOutcome::NotHandled
            }
        }

        fn cancel(&self, chat_id: ChatId) -> Option<Vec<Reply>> {
            self.active
                .remove(&chat_id)
                .map(|_| vec![Reply::text("ping cancelled")])
        }
    }

    fn dispatcher(messenger: Arc<RecordingMessenger>, flow: Arc<PingFlow>) -> Dispatcher {
        Dispatcher::builder(messenger)
            .command(BotCommand::new("start", "Старт"), Arc::new(StartHandler))
            .conversation(flow)
            .fallback(BotCommand::new("cancel", "Отмена"))
            .build()
    }

    fn texts(messenger: &RecordingMessenger) -> Vec<String> {
        messenger
            .sent()
            .into_iter()
            .map(|(_, message)| message.text)
            .collect()
    }

    #[tokio::test]
    async fn test_start_shows_menu() {
        let messenger = Arc::new(RecordingMessenger::new());
        let d = dispatcher(messenger.clone(), Arc::new(PingFlow::new()));

        d.dispatch(InboundEvent::command(CHAT, "start")).await;

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.text, messages::GREETING);
        assert_eq!(
            sent[0].1.markup,
            Some(ReplyMarkup::Menu(vec![vec![
                messages::SEARCH_BUTTON.to_string(),
                messages::SUBSCRIPTIONS_BUTTON.to_string(),
            ]]))
        );
    }

    #[tokio::test]
    async fn test_conversation_replies_and_deletes_source() {
        let messenger = Arc::new(RecordingMessenger::new());
        let d = dispatcher(messenger.clone(), Arc::new(PingFlow::new()));

        let mut event = InboundEvent::text(CHAT, "ping");
        event.message_id = Some(MessageId(5));
        d.dispatch(event).await;

        assert_eq!(texts(&messenger), vec!["pong"]);
        assert_eq!(messenger.deleted(), vec![(CHAT, MessageId(5))]);
    }

    #[tokio::test]
    async fn test_cancel_reaches_active_conversations_only() {
        let messenger = Arc::new(RecordingMessenger::new());
        let flow = Arc::new(PingFlow::new());
        let d = dispatcher(messenger.clone(), flow.clone());

        d.dispatch(InboundEvent::command(CHAT, "cancel")).await;
        assert!(messenger.sent().is_empty());

        d.dispatch(InboundEvent::text(CHAT, "ping")).await;
        let calls_before = flow.calls.load(Ordering::SeqCst);
        d.dispatch(InboundEvent::command(CHAT, "cancel")).await;

        assert_eq!(texts(&messenger), vec!["pong", "ping cancelled"]);
        assert!(!flow.active.contains_key(&CHAT));
        // 回退命令不经过流程的 handle
        assert_eq!(flow.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test]
    async fn test_unhandled_callback_is_expired_and_answered() {
        let messenger = Arc::new(RecordingMessenger::new());
        let d = dispatcher(messenger.clone(), Arc::new(PingFlow::new()));

        d.dispatch(InboundEvent::callback(CHAT, Some(MessageId(8)), "cb-1", "sub:0"))
            .await;

        assert_eq!(texts(&messenger), vec![messages::SELECTION_EXPIRED]);
        assert_eq!(messenger.answered(), vec!["cb-1".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_text_is_ignored() {
        let messenger = Arc::new(RecordingMessenger::new());
        let d = dispatcher(messenger.clone(), Arc::new(PingFlow::new()));

        d.dispatch(InboundEvent::text(CHAT, "hello")).await;
        d.dispatch(InboundEvent::command(CHAT, "unknown")).await;

        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_does_not_stop_delivery() {
        let messenger = Arc::new(RecordingMessenger::new());
        messenger.fail_for(CHAT);
        let d = dispatcher(messenger.clone(), Arc::new(PingFlow::new()));

        d.dispatch(InboundEvent::callback(CHAT, None, "cb-2", "search:0"))
            .await;

        assert!(messenger.sent().is_empty());
        assert_eq!(messenger.answered(), vec!["cb-2".to_string()]);
    }

    #[tokio::test]
    async fn test_bot_commands_order() {
        let d = dispatcher(
            Arc::new(RecordingMessenger::new()),
            Arc::new(PingFlow::new()),
        );

        let names: Vec<String> = d.bot_commands().into_iter().map(|c| c.command).collect();
        assert_eq!(names, vec!["start", "ping", "cancel"]);
    }

    #[tokio::test]
    async fn test_chat_locks_are_released() {
        let messenger = Arc::new(RecordingMessenger::new());
        let d = Arc::new(dispatcher(messenger.clone(), Arc::new(PingFlow::new())));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let d = d.clone();
                tokio::spawn(async move {
                    d.dispatch(InboundEvent::text(ChatId(i % 2), "ping")).await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(messenger.sent().len(), 8);
        assert!(d.chat_locks.is_empty());
    }
}
