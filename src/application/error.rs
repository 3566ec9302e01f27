//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{MessengerError, RepositoryError, SiteError};
use crate::domain::{SiteType, TitleError};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 没有为该站点注册适配器
    #[error("No adapter registered for site: {0}")]
    UnsupportedSite(SiteType),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 站点抓取错误
    #[error("Site error: {0}")]
    SiteError(#[from] SiteError),

    /// 消息发送错误
    #[error("Messenger error: {0}")]
    MessengerError(#[from] MessengerError),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        Self::RepositoryError(err.to_string())
    }
}

impl From<TitleError> for ApplicationError {
    fn from(err: TitleError) -> Self {
        Self::ValidationError(err.to_string())
    }
}
