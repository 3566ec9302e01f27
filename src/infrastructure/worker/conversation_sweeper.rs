//! Conversation Sweeper - 清理空闲会话

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::IdleExpiryPort;

/// Sweeper 配置
#[derive(Debug, Clone)]
pub struct ConversationSweeperConfig {
    /// 会话空闲超时（秒）
    pub idle_timeout_secs: u64,
    /// 清理间隔（秒）
    pub sweep_interval_secs: u64,
}

impl Default for ConversationSweeperConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1800,
            sweep_interval_secs: 60,
        }
    }
}

/// 空闲会话清理 Worker
///
/// 超时即 TIMEOUT → END：状态和其中的 PendingSelection 一并丢弃，不通知用户
pub struct ConversationSweeper {
    config: ConversationSweeperConfig,
    stores: Vec<Arc<dyn IdleExpiryPort>>,
    shutdown: CancellationToken,
}

impl ConversationSweeper {
    pub fn new(
        config: ConversationSweeperConfig,
        stores: Vec<Arc<dyn IdleExpiryPort>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            stores,
            shutdown,
        }
    }

    /// 启动 Worker，直到收到关闭信号
    pub async fn run(self) {
        tracing::info!(
            idle_timeout_secs = self.config.idle_timeout_secs,
            sweep_interval_secs = self.config.sweep_interval_secs,
            "ConversationSweeper started"
        );

        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.sweep_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }

        tracing::info!("ConversationSweeper stopped");
    }

    /// 清理一轮，返回被结束的会话数
    pub fn sweep_once(&self) -> usize {
        let mut total = 0;
        for store in &self.stores {
            let expired = store.expire_idle(self.config.idle_timeout_secs);
            if !expired.is_empty() {
                tracing::debug!(
                    flow = store.flow_name(),
                    count = expired.len(),
                    "Idle conversations expired"
                );
            }
            total += expired.len();
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::conversation::{SearchState, UnsubscribeState};
    use crate::application::ports::ConversationStorePort;
    use crate::domain::ChatId;
    use crate::infrastructure::memory::InMemoryConversationStore;

    #[test]
    fn test_sweep_once_covers_all_stores() {
        let search = Arc::new(InMemoryConversationStore::<SearchState>::new("search"));
        let unsubscribe = Arc::new(InMemoryConversationStore::<UnsubscribeState>::new("unsubscribe"));
        search.begin(ChatId(1), SearchState::Searching);
        search.begin(ChatId(2), SearchState::Searching);
        unsubscribe.begin(ChatId(1), UnsubscribeState::Idle);
        let stores: Vec<Arc<dyn IdleExpiryPort>> = vec![search.clone(), unsubscribe.clone()];

        let idle = ConversationSweeper::new(
            ConversationSweeperConfig {
                idle_timeout_secs: 3600,
                sweep_interval_secs: 60,
            },
            stores.clone(),
            CancellationToken::new(),
        );
        assert_eq!(idle.sweep_once(), 0);
        assert!(search.get(ChatId(1)).is_some());

        let expiring = ConversationSweeper::new(
            ConversationSweeperConfig {
                idle_timeout_secs: 0,
                sweep_interval_secs: 60,
            },
            stores,
            CancellationToken::new(),
        );
        assert_eq!(expiring.sweep_once(), 3);
        assert!(search.is_empty());
        assert!(unsubscribe.is_empty());
    }
}
