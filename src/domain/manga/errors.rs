//! Manga Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TitleError {
    #[error("无效的站点标识: {0}")]
    InvalidUrn(String),

    #[error("无效的标题名称: {0}")]
    InvalidName(String),

    #[error("未知的站点类型: {0}")]
    UnknownSite(i64),
}
