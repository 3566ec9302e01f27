//! Messenger Port - 出站聊天消息抽象
//!
//! 具体实现在 infrastructure/telegram 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ChatId;

/// Messenger 错误
#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error {code}: {description}")]
    ApiError { code: i64, description: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 平台侧的消息 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

/// 内联按钮，点击后回传 `callback_data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// 消息附带的键盘
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyMarkup {
    /// 消息下方的内联按钮（按行）
    Inline(Vec<Vec<InlineButton>>),
    /// 输入框下方的常驻菜单（按行）
    Menu(Vec<Vec<String>>),
}

/// 待发送消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
        }
    }

    /// 每个按钮占一行
    pub fn with_buttons(mut self, buttons: Vec<InlineButton>) -> Self {
        self.markup = Some(ReplyMarkup::Inline(
            buttons.into_iter().map(|b| vec![b]).collect(),
        ));
        self
    }

    pub fn with_menu(mut self, rows: Vec<Vec<String>>) -> Self {
        self.markup = Some(ReplyMarkup::Menu(rows));
        self
    }

    pub fn inline_buttons(&self) -> Vec<&InlineButton> {
        match &self.markup {
            Some(ReplyMarkup::Inline(rows)) => rows.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }
}

/// 机器人命令（用于客户端命令菜单）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

/// Messenger Port
#[async_trait]
pub trait MessengerPort: Send + Sync {
    async fn send_message(
        &self,
        chat_id: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, MessengerError>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId)
        -> Result<(), MessengerError>;

    /// 确认回调查询（结束客户端按钮的加载状态）
    async fn answer_callback(&self, callback_id: &str) -> Result<(), MessengerError>;

    async fn set_commands(&self, commands: &[BotCommand]) -> Result<(), MessengerError>;
}
