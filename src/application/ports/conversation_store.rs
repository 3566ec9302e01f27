//! Conversation Store Port - 会话状态生命周期管理
//!
//! 每个聊天在每个流程中至多一个进行中的会话，状态只保存在内存中。
//! 具体实现在 infrastructure/memory 层

use crate::domain::ChatId;

/// Conversation Store Port
///
/// 不存在的条目即 IDLE；`end` 对应终止状态 END
pub trait ConversationStorePort<S>: Send + Sync {
    /// 获取当前状态
    fn get(&self, chat_id: ChatId) -> Option<S>;

    /// 开始会话（覆盖已有状态）
    fn begin(&self, chat_id: ChatId, state: S);

    /// 推进进行中的会话并刷新活动时间
    ///
    /// 会话在处理期间已经结束（取消或空闲过期）时不写入，返回 `false`
    fn update(&self, chat_id: ChatId, state: S) -> bool;

    /// 结束会话，返回结束前的状态
    fn end(&self, chat_id: ChatId) -> Option<S>;
}

/// 空闲过期清理
///
/// 与状态类型无关，便于清理任务统一处理多个流程的存储
pub trait IdleExpiryPort: Send + Sync {
    /// 流程名（日志用）
    fn flow_name(&self) -> &'static str;

    /// 移除空闲超过 `idle_timeout_secs` 的会话（TIMEOUT → END），返回被移除的聊天
    fn expire_idle(&self, idle_timeout_secs: u64) -> Vec<ChatId>;
}
