//! Update Poller - 长轮询接收更新并交给分发器
//!
//! 每批更新按聊天分组：同一聊天的事件在一个任务内按到达顺序处理，
//! 不同聊天并发处理（受 max_concurrent 限制）。一批处理完成后才拉取下一批，
//! 保证同一聊天跨批次的顺序。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::client::TelegramClient;
use super::types::Update;
use crate::application::conversation::InboundEvent;
use crate::application::dispatcher::Dispatcher;
use crate::domain::ChatId;

/// Poller 配置
#[derive(Debug, Clone)]
pub struct UpdatePollerConfig {
    /// 最大并发处理的聊天数
    pub max_concurrent: usize,
    /// 拉取失败后的重试间隔（秒）
    pub retry_delay_secs: u64,
}

impl Default for UpdatePollerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            retry_delay_secs: 5,
        }
    }
}

/// 长轮询 Poller
pub struct UpdatePoller {
    config: UpdatePollerConfig,
    client: Arc<TelegramClient>,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
}

impl UpdatePoller {
    pub fn new(
        config: UpdatePollerConfig,
        client: Arc<TelegramClient>,
        dispatcher: Arc<Dispatcher>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            client,
            dispatcher,
            shutdown,
        }
    }

    /// 启动 Poller，直到收到关闭信号
    pub async fn run(self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            "UpdatePoller started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut offset: Option<i64> = None;

        loop {
            let updates = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.client.get_updates(offset) => result,
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to fetch updates, retrying");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(self.config.retry_delay_secs)) => {}
                    }
                    continue;
                }
            };

            if let Some(last) = updates.iter().map(|u| u.update_id).max() {
                offset = Some(last + 1);
            }

            let batches = group_by_chat(updates);
            if batches.is_empty() {
                continue;
            }
            tracing::debug!(chats = batches.len(), "Dispatching updates");

            let mut tasks = JoinSet::new();
            for (chat_id, events) in batches {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    tracing::error!("Failed to acquire semaphore permit");
                    continue;
                };
                let dispatcher = self.dispatcher.clone();

                tasks.spawn(async move {
                    let _permit = permit; // 持有 permit 直到该聊天的事件处理完
                    for event in events {
                        dispatcher.dispatch(event).await;
                    }
                    chat_id
                });
            }

            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Dispatch task panicked");
                }
            }
        }

        tracing::info!("UpdatePoller stopped");
    }
}

/// 按聊天分组，组内以及组之间都保持首次出现的顺序
fn group_by_chat(updates: Vec<Update>) -> Vec<(ChatId, Vec<InboundEvent>)> {
    let mut order: Vec<ChatId> = Vec::new();
    let mut groups: HashMap<ChatId, Vec<InboundEvent>> = HashMap::new();

    for event in updates.into_iter().filter_map(Update::into_event) {
        let chat_id = event.chat_id;
        groups
            .entry(chat_id)
            .or_insert_with(|| {
                order.push(chat_id);
                Vec::new()
            })
            .push(event);
    }

    order
        .into_iter()
        .filter_map(|chat_id| groups.remove(&chat_id).map(|events| (chat_id, events)))
        .collect()
}
