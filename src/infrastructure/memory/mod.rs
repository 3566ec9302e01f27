//! Memory Layer - In-Memory State Management
//!
//! 会话状态只保存在内存中，进程重启后所有进行中的会话丢失

mod conversation_store;
mod recording_messenger;

pub use conversation_store::InMemoryConversationStore;
pub use recording_messenger::RecordingMessenger;
