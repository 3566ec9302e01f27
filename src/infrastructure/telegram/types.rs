//! Telegram Bot API 数据类型
//!
//! 只包含机器人用到的字段

use serde::{Deserialize, Serialize};

use crate::application::conversation::InboundEvent;
use crate::application::ports::{BotCommand, MessageId, OutgoingMessage, ReplyMarkup};
use crate::domain::ChatId;

/// API 响应信封
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// 转换为入站事件；不关心的更新类型（贴纸、编辑等）返回 `None`
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(query) = self.callback_query {
            // 按钮消息过旧时平台不再附带消息，私聊中 chat id 与用户 id 相同
            let (chat_id, message_id) = match &query.message {
                Some(message) => (message.chat.id, Some(MessageId(message.message_id))),
                None => (query.from.id, None),
            };
            return Some(InboundEvent::callback(
                ChatId(chat_id),
                message_id,
                query.id,
                query.data.unwrap_or_default(),
            ));
        }

        let message = self.message?;
        let text = message.text?;
        Some(InboundEvent::from_message_text(
            ChatId(message.chat.id),
            Some(MessageId(message.message_id)),
            &text,
        ))
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum KeyboardMarkup {
    Inline {
        inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
    },
    Reply {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
    },
}

impl From<&ReplyMarkup> for KeyboardMarkup {
    fn from(markup: &ReplyMarkup) -> Self {
        match markup {
            ReplyMarkup::Inline(rows) => KeyboardMarkup::Inline {
                inline_keyboard: rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|b| InlineKeyboardButton {
                                text: b.text.clone(),
                                callback_data: b.callback_data.clone(),
                            })
                            .collect()
                    })
                    .collect(),
            },
            ReplyMarkup::Menu(rows) => KeyboardMarkup::Reply {
                keyboard: rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|text| KeyboardButton { text: text.clone() })
                            .collect()
                    })
                    .collect(),
                resize_keyboard: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<KeyboardMarkup>,
}

impl SendMessageRequest {
    pub fn new(chat_id: ChatId, message: &OutgoingMessage) -> Self {
        Self {
            chat_id: chat_id.as_i64(),
            text: message.text.clone(),
            reply_markup: message.markup.as_ref().map(KeyboardMarkup::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteMessageRequest {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Serialize)]
pub struct AnswerCallbackQueryRequest {
    pub callback_query_id: String,
}

#[derive(Debug, Serialize)]
pub struct CommandEntry {
    pub command: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct SetMyCommandsRequest {
    pub commands: Vec<CommandEntry>,
}

impl SetMyCommandsRequest {
    pub fn new(commands: &[BotCommand]) -> Self {
        Self {
            commands: commands
                .iter()
                .map(|c| CommandEntry {
                    command: c.command.clone(),
                    description: c.description.clone(),
                })
                .collect(),
        }
    }
}
