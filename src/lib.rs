//! MangaBot - 漫画新章节订阅机器人
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Manga Context: Title、发布点 Release
//! - Subscriber Context: 订阅者及其对 Title 的引用
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SiteAdapter, Messenger, ConversationStore, Repositories）
//! - Commands: 订阅/退订/新章节检查
//! - Queries: 订阅列表
//! - Conversation: 搜索与退订会话状态机
//! - Dispatcher: 入站事件路由
//!
//! 基础设施层 (infrastructure/):
//! - Telegram: Bot API 客户端 + 长轮询
//! - Adapters: 站点抓取（readmanga）
//! - Memory: 会话状态存储
//! - Worker: 新章节通知、空闲会话清理
//! - Persistence: SQLite 存储

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
