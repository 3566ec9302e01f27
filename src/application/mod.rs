//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SiteAdapter、Messenger、Repository、ConversationStore）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - conversation: 搜索/退订会话状态机
//! - dispatcher: 入站事件路由
//! - messages: 面向用户的文案
//! - error: 应用层错误定义

pub mod commands;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod messages;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Release commands
    CheckReleaseCommand,
    ReleaseCheckOutcome,
    // Subscription commands
    SubscribeCommand,
    SubscribeOutcome,
    UnsubscribeCommand,
    UnsubscribeOutcome,
    // Handlers
    handlers::{CheckReleaseHandler, SubscribeHandler, UnsubscribeHandler},
};

pub use conversation::{
    Conversation, EventKind, FlowOutcome, InboundEvent, Reply, SearchFlow, SearchFlowConfig,
    SearchState, UnsubscribeFlow, UnsubscribeState,
};

pub use dispatcher::{CommandHandler, Dispatcher, DispatcherBuilder, StartHandler};

pub use error::ApplicationError;

pub use ports::{
    // Conversation store
    ConversationStorePort,
    IdleExpiryPort,
    // Messenger
    BotCommand,
    InlineButton,
    MessageId,
    MessengerError,
    MessengerPort,
    OutgoingMessage,
    ReplyMarkup,
    // Repositories
    RepositoryError,
    SubscriberRepositoryPort,
    TitleRepositoryPort,
    // Site adapter
    ReleaseInfo,
    SearchHit,
    SiteAdapterPort,
    SiteError,
    SiteRegistry,
};

pub use queries::{handlers::ListSubscriptionsHandler, ListSubscriptions};
