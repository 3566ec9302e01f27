//! Telegram Client - 调用 Telegram Bot HTTP API
//!
//! 实现 MessengerPort trait，同时提供长轮询所需的 getUpdates
//!
//! POST {api_url}/bot{token}/{method}
//! Request: JSON 参数
//! Response: {"ok": bool, "result": ..., "description": "..."}

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use super::types::{
    AnswerCallbackQueryRequest, ApiResponse, DeleteMessageRequest, GetUpdatesRequest, Message,
    SendMessageRequest, SetMyCommandsRequest, Update, User,
};
use crate::application::ports::{
    BotCommand, MessageId, MessengerError, MessengerPort, OutgoingMessage,
};
use crate::domain::ChatId;

/// Telegram 客户端配置
#[derive(Clone)]
pub struct TelegramClientConfig {
    /// Bot API 基础 URL
    pub api_url: String,
    pub token: String,
    /// 普通请求超时时间（秒）
    pub timeout_secs: u64,
    /// 长轮询等待时间（秒）
    pub poll_timeout_secs: u64,
}

impl std::fmt::Debug for TelegramClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClientConfig")
            .field("api_url", &self.api_url)
            .field("token", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl Default for TelegramClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
            token: String::new(),
            timeout_secs: 30,
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_poll_timeout(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }
}

/// Telegram 客户端
pub struct TelegramClient {
    client: Client,
    config: TelegramClientConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramClientConfig) -> Result<Self, MessengerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MessengerError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// URL 中包含 token，不能写入日志
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    async fn call<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Option<Duration>,
    ) -> Result<R, MessengerError>
    where
        P: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let mut request = self.client.post(self.method_url(method)).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            // reqwest 错误信息中带有 URL
            let e = e.without_url();
            if e.is_timeout() {
                MessengerError::Timeout
            } else if e.is_connect() {
                MessengerError::NetworkError(format!("Cannot connect to Telegram: {}", e))
            } else {
                MessengerError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        let body: ApiResponse<R> = response.json().await.map_err(|e| {
            MessengerError::InvalidResponse(format!("{} (HTTP {})", e.without_url(), status))
        })?;

        match body {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                description,
                error_code,
                ..
            } => Err(MessengerError::ApiError {
                code: error_code.unwrap_or(i64::from(status.as_u16())),
                description: description.unwrap_or_else(|| format!("{} failed", method)),
            }),
        }
    }

    /// 校验 token 并获取机器人信息
    pub async fn get_me(&self) -> Result<User, MessengerError> {
        self.call("getMe", &serde_json::json!({}), None).await
    }

    /// 长轮询获取更新，`offset` 为已处理的最大 update_id + 1
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, MessengerError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.config.poll_timeout_secs,
            allowed_updates: vec!["message", "callback_query"],
        };
        let timeout =
            Duration::from_secs(self.config.poll_timeout_secs + self.config.timeout_secs);

        self.call("getUpdates", &request, Some(timeout)).await
    }
}

#[async_trait]
impl MessengerPort for TelegramClient {
    async fn send_message(
        &self,
        chat_id: ChatId,
        message: &OutgoingMessage,
    ) -> Result<MessageId, MessengerError> {
        let request = SendMessageRequest::new(chat_id, message);
        let sent: Message = self.call("sendMessage", &request, None).await?;

        tracing::debug!(chat_id = %chat_id, message_id = sent.message_id, "Message sent");
        Ok(MessageId(sent.message_id))
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), MessengerError> {
        let request = DeleteMessageRequest {
            chat_id: chat_id.as_i64(),
            message_id: message_id.0,
        };
        let _: bool = self.call("deleteMessage", &request, None).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), MessengerError> {
        let request = AnswerCallbackQueryRequest {
            callback_query_id: callback_id.to_string(),
        };
        let _: bool = self.call("answerCallbackQuery", &request, None).await?;
        Ok(())
    }

    async fn set_commands(&self, commands: &[BotCommand]) -> Result<(), MessengerError> {
        let request = SetMyCommandsRequest::new(commands);
        let _: bool = self.call("setMyCommands", &request, None).await?;

        tracing::info!(count = commands.len(), "Bot commands registered");
        Ok(())
    }
}
