//! Conversation Flows - 会话状态机
//!
//! 每个聊天在每个流程中一个实例，实例之间没有共享的可变状态。
//! 状态变体自身携带该步骤的临时数据（如 PendingSelection），
//! 离开状态即丢弃；END 对应从存储中移除。
//!
//! - search_flow: IDLE → SEARCHING → SELECTING → CONFIRMING → END
//! - unsubscribe_flow: 列出订阅 → 选择一项 → END

mod callback;
mod event;
mod pending;
mod search_flow;
mod unsubscribe_flow;

use async_trait::async_trait;

use crate::application::ports::{BotCommand, OutgoingMessage};
use crate::domain::ChatId;

pub use callback::{CallbackToken, CallbackVerb, InvalidCallbackToken};
pub use event::{EventKind, InboundEvent};
pub use pending::PendingSelection;
pub use search_flow::{Candidate, SearchFlow, SearchFlowConfig, SearchState};
pub use unsubscribe_flow::{UnsubscribeFlow, UnsubscribeState};

/// 对入站事件的响应动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Send(OutgoingMessage),
    /// 删除触发事件的消息（回调时为按钮所在的消息）
    DeleteSource,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Send(OutgoingMessage::text(text))
    }
}

/// 流程处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// 当前状态不接受该事件：状态不变、无副作用，交由其他处理器
    NotHandled,
    /// 事件被消费（回复可以为空，例如被忽略的菜单文本）
    Handled(Vec<Reply>),
}

/// 会话流程
///
/// 处理过程中的站点/存储错误在流程内部转换为用户可见的回复，
/// 不会传播给分发器
#[async_trait]
pub trait Conversation: Send + Sync {
    fn name(&self) -> &'static str;

    /// 需要注册到客户端命令菜单的入口命令
    fn commands(&self) -> Vec<BotCommand>;

    async fn handle(&self, event: &InboundEvent) -> FlowOutcome;

    /// 回退触发：放弃进行中的会话；未在进行中时返回 `None`
    fn cancel(&self, chat_id: ChatId) -> Option<Vec<Reply>>;
}
