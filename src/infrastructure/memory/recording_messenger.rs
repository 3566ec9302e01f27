//! Recording Messenger - 用于测试和离线运行的消息端口
//!
//! 不调用任何聊天平台，只记录发出的请求

use async_trait::async_trait;
use dashmap::DashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::application::ports::{
    BotCommand, MessageId, MessengerError, MessengerPort, OutgoingMessage,
};
use crate::domain::ChatId;

/// Recording Messenger
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(ChatId, OutgoingMessage)>>,
    deleted: Mutex<Vec<(ChatId, MessageId)>>,
    answered: Mutex<Vec<String>>,
    commands: Mutex<Vec<BotCommand>>,
    /// 发送到这些聊天时返回错误（模拟被用户屏蔽）
    failing: DashSet<ChatId>,
    next_id: AtomicI64,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, chat_id: ChatId) {
        self.failing.insert(chat_id);
    }

    pub fn sent(&self) -> Vec<(ChatId, OutgoingMessage)> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn deleted(&self) -> Vec<(ChatId, MessageId)> {
        self.deleted.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn commands(&self) -> Vec<BotCommand> {
        self.commands.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn check(&self, chat_id: ChatId) -> Result<(), MessengerError> {
        if self.failing.contains(&chat_id) {
            return Err(MessengerError::ApiError {
                code: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessengerPort for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, MessengerError> {
        self.check(chat_id)?;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((chat_id, message.clone()));
        }
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), MessengerError> {
        self.check(chat_id)?;
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push((chat_id, message_id));
        }
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), MessengerError> {
        if let Ok(mut answered) = self.answered.lock() {
            answered.push(callback_id.to_string());
        }
        Ok(())
    }

    async fn set_commands(&self, commands: &[BotCommand]) -> Result<(), MessengerError> {
        if let Ok(mut stored) = self.commands.lock() {
            *stored = commands.to_vec();
        }
        Ok(())
    }
}
