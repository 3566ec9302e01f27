//! Inbound Events - 入站事件

use crate::application::ports::MessageId;
use crate::domain::ChatId;

/// 入站事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    /// 触发事件的消息；回调事件时为按钮所在的消息
    pub message_id: Option<MessageId>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// 普通文本（含菜单按钮文本）
    Text(String),
    /// `/name`，已去掉 `@bot` 后缀并转为小写；命令后的参数不使用
    Command { name: String },
    /// 内联按钮回调
    Callback { query_id: String, data: String },
}

impl InboundEvent {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id: None,
            kind: EventKind::Text(text.into()),
        }
    }

    pub fn command(chat_id: ChatId, name: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id: None,
            kind: EventKind::Command { name: name.into() },
        }
    }

    pub fn callback(
        chat_id: ChatId,
        message_id: Option<MessageId>,
        query_id: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            chat_id,
            message_id,
            kind: EventKind::Callback {
                query_id: query_id.into(),
                data: data.into(),
            },
        }
    }

    /// 解析消息文本：`/` 开头视为命令
    pub fn from_message_text(chat_id: ChatId, message_id: Option<MessageId>, text: &str) -> Self {
        let kind = match parse_command(text) {
            Some(name) => EventKind::Command { name },
            None => EventKind::Text(text.to_string()),
        };
        Self {
            chat_id,
            message_id,
            kind,
        }
    }

    pub fn is_command(&self, command: &str) -> bool {
        matches!(&self.kind, EventKind::Command { name, .. } if name == command)
    }

    pub fn is_text(&self, expected: &str) -> bool {
        matches!(&self.kind, EventKind::Text(text) if text == expected)
    }

    pub fn callback_id(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Callback { query_id, .. } => Some(query_id),
            _ => None,
        }
    }
}

fn parse_command(text: &str) -> Option<String> {
    let rest = text.trim().strip_prefix('/')?;
    let head = rest.split(char::is_whitespace).next().unwrap_or(rest);
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}
