//! Manga Context - 漫画限界上下文
//!
//! 职责:
//! - Title 聚合：(site, urn) 唯一，记录最新已知的卷/话
//! - Release 值对象：按 (volume, chapter) 字典序比较

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::Title;
pub use errors::TitleError;
pub use value_objects::{Release, SiteType, TitleId, Urn};
