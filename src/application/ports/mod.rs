//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod conversation_store;
mod messenger;
mod repositories;
mod site_adapter;

pub use conversation_store::{ConversationStorePort, IdleExpiryPort};
pub use messenger::{
    BotCommand, InlineButton, MessageId, MessengerError, MessengerPort, OutgoingMessage,
    ReplyMarkup,
};
pub use repositories::{RepositoryError, SubscriberRepositoryPort, TitleRepositoryPort};
pub use site_adapter::{ReleaseInfo, SearchHit, SiteAdapterPort, SiteError, SiteRegistry};
