//! In-Memory Conversation Store Implementation

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::application::ports::{ConversationStorePort, IdleExpiryPort};
use crate::domain::ChatId;

struct Entry<S> {
    state: S,
    last_activity: DateTime<Utc>,
}

/// 内存会话存储，每个流程一个实例
pub struct InMemoryConversationStore<S> {
    flow_name: &'static str,
    entries: DashMap<ChatId, Entry<S>>,
}

impl<S> InMemoryConversationStore<S> {
    pub fn new(flow_name: &'static str) -> Self {
        Self {
            flow_name,
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> ConversationStorePort<S> for InMemoryConversationStore<S>
where
    S: Clone + Send + Sync,
{
    fn get(&self, chat_id: ChatId) -> Option<S> {
        self.entries.get(&chat_id).map(|e| e.state.clone())
    }

    fn begin(&self, chat_id: ChatId, state: S) {
        self.entries.insert(
            chat_id,
            Entry {
                state,
                last_activity: Utc::now(),
            },
        );
    }

    fn update(&self, chat_id: ChatId, state: S) -> bool {
        // get_mut 与清理时的 remove_if 持有同一分片锁
        match self.entries.get_mut(&chat_id) {
            Some(mut entry) => {
                entry.state = state;
                entry.last_activity = Utc::now();
                true
            }
            None => false,
        }
    }

    fn end(&self, chat_id: ChatId) -> Option<S> {
        self.entries.remove(&chat_id).map(|(_, e)| e.state)
    }
}

impl<S> IdleExpiryPort for InMemoryConversationStore<S>
where
    S: Send + Sync,
{
    fn flow_name(&self) -> &'static str {
        self.flow_name
    }

    fn expire_idle(&self, idle_timeout_secs: u64) -> Vec<ChatId> {
        let timeout = Duration::seconds(idle_timeout_secs as i64);
        let is_idle = |entry: &Entry<S>| Utc::now() - entry.last_activity >= timeout;

        let candidates: Vec<ChatId> = self
            .entries
            .iter()
            .filter(|entry| is_idle(entry.value()))
            .map(|entry| *entry.key())
            .collect();

        // 重新检查：收集之后可能已有新的活动
        candidates
            .into_iter()
            .filter(|chat_id| {
                self.entries
                    .remove_if(chat_id, |_, entry| is_idle(entry))
                    .is_some()
            })
            .collect()
    }
}
