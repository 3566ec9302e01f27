//! Fake Site Adapter - 用于测试的站点适配器
//!
//! 返回预先设定的搜索结果和发布信息，不发出任何网络请求

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::application::ports::{ReleaseInfo, SearchHit, SiteAdapterPort, SiteError};
use crate::domain::{Release, SiteType};

type SearchHook = Box<dyn Fn() + Send + Sync>;

/// Fake Site Adapter
///
/// 未设定的查询返回空结果，未设定的 urn 返回 `None`
pub struct FakeSiteAdapter {
    site: SiteType,
    searches: DashMap<String, Vec<SearchHit>>,
    search_failure: Mutex<Option<SiteError>>,
    releases: DashMap<String, Result<ReleaseInfo, SiteError>>,
    search_calls: AtomicUsize,
    on_search: Mutex<Option<SearchHook>>,
}

impl FakeSiteAdapter {
    pub fn new(site: SiteType) -> Self {
        Self {
            site,
            searches: DashMap::new(),
            search_failure: Mutex::new(None),
            releases: DashMap::new(),
            search_calls: AtomicUsize::new(0),
            on_search: Mutex::new(None),
        }
    }

    pub fn set_search(&self, query: impl Into<String>, hits: Vec<SearchHit>) {
        self.searches.insert(query.into(), hits);
    }

    /// 之后的所有搜索都返回该错误
    pub fn fail_search(&self, error: SiteError) {
        if let Ok(mut failure) = self.search_failure.lock() {
            *failure = Some(error);
        }
    }

    /// 每次搜索返回之前调用，模拟请求期间发生的并发事件
    pub fn on_search(&self, hook: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut slot) = self.on_search.lock() {
            *slot = Some(Box::new(hook));
        }
    }

    pub fn set_release(&self, urn: impl Into<String>, name: impl Into<String>, release: Release) {
        self.releases.insert(
            urn.into(),
            Ok(ReleaseInfo {
                name: name.into(),
                release,
                image_url: None,
            }),
        );
    }

    pub fn fail_release(&self, urn: impl Into<String>, error: SiteError) {
        self.releases.insert(urn.into(), Err(error));
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteAdapterPort for FakeSiteAdapter {
    fn site(&self) -> SiteType {
        self.site
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SiteError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if let Ok(hook) = self.on_search.lock() {
            if let Some(hook) = hook.as_ref() {
                hook();
            }
        }

        if let Some(error) = self.search_failure.lock().ok().and_then(|f| f.clone()) {
            return Err(error);
        }

        Ok(self
            .searches
            .get(query)
            .map(|hits| hits.clone())
            .unwrap_or_default())
    }

    async fn get_latest_release(&self, urn: &str) -> Result<Option<ReleaseInfo>, SiteError> {
        match self.releases.get(urn).map(|r| r.clone()) {
            Some(Ok(info)) => Ok(Some(info)),
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }
}
