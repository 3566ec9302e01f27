//! Site Adapter Port - 漫画站点抽象
//!
//! 每个来源站点一个实现，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{Release, SiteType};

/// 站点错误
///
/// 对会话流程均为非致命错误，统一提示用户重试
#[derive(Debug, Clone, Error)]
pub enum SiteError {
    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// 搜索结果条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub name: String,
    /// 站点内标识
    pub urn: String,
}

impl SearchHit {
    pub fn new(name: impl Into<String>, urn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            urn: urn.into(),
        }
    }
}

/// 最新发布信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub name: String,
    pub release: Release,
    pub image_url: Option<String>,
}

/// Site Adapter Port
#[async_trait]
pub trait SiteAdapterPort: Send + Sync {
    /// 适配器对应的站点
    fn site(&self) -> SiteType;

    /// 按名称模糊搜索
    ///
    /// 没有结果时返回空列表，只有传输失败才返回错误
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SiteError>;

    /// 获取最新发布
    ///
    /// `None` 表示页面不存在或没有可读的发布信息
    async fn get_latest_release(&self, urn: &str) -> Result<Option<ReleaseInfo>, SiteError>;
}

/// 站点注册表
///
/// 按 SiteType 查找适配器，通知扫描依此为每个 Title 选择来源
#[derive(Clone, Default)]
pub struct SiteRegistry {
    adapters: HashMap<SiteType, Arc<dyn SiteAdapterPort>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn SiteAdapterPort>) -> Self {
        self.register(adapter);
        self
    }

    pub fn register(&mut self, adapter: Arc<dyn SiteAdapterPort>) {
        let site = adapter.site();
        if self.adapters.insert(site, adapter).is_some() {
            tracing::warn!(site = %site, "Site adapter replaced");
        }
    }

    pub fn get(&self, site: SiteType) -> Option<Arc<dyn SiteAdapterPort>> {
        self.adapters.get(&site).cloned()
    }

    pub fn sites(&self) -> Vec<SiteType> {
        self.adapters.keys().copied().collect()
    }
}
