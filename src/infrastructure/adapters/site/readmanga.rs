//! ReadManga Client - 抓取 readmanga 站点
//!
//! 实现 SiteAdapterPort trait，通过 HTTP 获取页面并解析 HTML
//!
//! 站点接口:
//! POST {base}/search  表单 q=<查询>，返回搜索结果页
//! GET  {base}{urn}    作品页，包含最新章节链接

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::application::ports::{ReleaseInfo, SearchHit, SiteAdapterPort, SiteError};
use crate::domain::{Release, SiteType};

/// ReadManga 客户端配置
#[derive(Debug, Clone)]
pub struct ReadMangaClientConfig {
    /// 站点基础 URL
    pub base_url: String,
    pub user_agent: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 搜索结果最多解析的条目数
    pub max_results: usize,
}

impl Default for ReadMangaClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://readmanga.live".to_string(),
            user_agent: "MangaNotification Telegram Bot".to_string(),
            timeout_secs: 30,
            max_results: 5,
        }
    }
}

impl ReadMangaClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// ReadManga 客户端
pub struct ReadMangaClient {
    client: Client,
    config: ReadMangaClientConfig,
}

impl ReadMangaClient {
    pub fn new(config: ReadMangaClientConfig) -> Result<Self, SiteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SiteError::FetchError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url.trim_end_matches('/'))
    }

    fn title_url(&self, urn: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), urn)
    }
}

fn map_request_error(e: reqwest::Error) -> SiteError {
    if e.is_timeout() {
        SiteError::Timeout
    } else if e.is_connect() {
        SiteError::FetchError(format!("Cannot connect to site: {}", e))
    } else {
        SiteError::FetchError(e.to_string())
    }
}

#[async_trait]
impl SiteAdapterPort for ReadMangaClient {
    fn site(&self) -> SiteType {
        SiteType::ReadManga
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SiteError> {
        tracing::debug!(url = %self.search_url(), query = %query, "Sending search request");

        let form = [("q", query), ("+", "Искать!"), ("fast-filter", "CREATION")];
        let response = self
            .client
            .post(self.search_url())
            .form(&form)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiteError::FetchError(format!("HTTP {}", status)));
        }

        let html = response.text().await.map_err(map_request_error)?;
        let hits = parse_search_page(&html, self.config.max_results)?;

        tracing::debug!(query = %query, results = hits.len(), "Search completed");
        Ok(hits)
    }

    async fn get_latest_release(&self, urn: &str) -> Result<Option<ReleaseInfo>, SiteError> {
        let url = self.title_url(urn);
        tracing::debug!(url = %url, "Fetching title page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SiteError::FetchError(format!("HTTP {}", status)));
        }

        let html = response.text().await.map_err(map_request_error)?;
        parse_title_page(&html)
    }
}

fn selector(css: &str) -> Result<Selector, SiteError> {
    Selector::parse(css).map_err(|e| SiteError::ParseError(format!("{}: {}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// 解析搜索结果页
///
/// 没有结果区域时返回空列表；缺少链接的条目被跳过
pub fn parse_search_page(html: &str, max_results: usize) -> Result<Vec<SearchHit>, SiteError> {
    let document = Html::parse_document(html);
    let tile_selector = selector("div.tiles div.tile")?;
    let link_selector = selector("div.desc h3 a")?;

    let hits = document
        .select(&tile_selector)
        .take(max_results)
        .filter_map(|tile| {
            let link = tile.select(&link_selector).next()?;
            let href = link.value().attr("href")?;
            let name = link
                .value()
                .attr("title")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| element_text(link));
            Some(SearchHit::new(name, href))
        })
        .collect();

    Ok(hits)
}

/// 解析作品页
///
/// 没有「最新章节」链接时返回 `None`（作品尚无章节或已被移除）
pub fn parse_title_page(html: &str) -> Result<Option<ReleaseInfo>, SiteError> {
    let document = Html::parse_document(html);

    let Some(last_chapter) = document.select(&selector("a.read-last-chapter")?).next() else {
        return Ok(None);
    };

    // 形如 "Читать 2 - 14 Новое"：第 2 个是卷，第 4 个是章
    let text = element_text(last_chapter);
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let number = |position: usize| -> Result<u32, SiteError> {
        tokens
            .get(position)
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| SiteError::ParseError(format!("Unexpected last chapter text: {}", text)))
    };
    let release = Release::new(number(1)?, number(3)?);

    let name = document
        .select(&selector("h1.names span.name")?)
        .next()
        .map(element_text)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| SiteError::ParseError("Title name not found".to_string()))?;

    let image_url = document
        .select(&selector("div.picture-fotorama img")?)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    Ok(Some(ReleaseInfo {
        name,
        release,
        image_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <html><body>
        <div class="tiles row">
          <div class="tile col-sm-6">
            <div class="desc"><h3><a href="/bleach" title="Блич">Блич</a></h3></div>
          </div>
          <div class="tile col-sm-6">
            <div class="desc"><h3><a href="/bleach_remake">Bleach Remake</a></h3></div>
          </div>
          <div class="tile col-sm-6">
            <div class="desc"><h3>no link</h3></div>
          </div>
          <div class="tile col-sm-6">
            <div class="desc"><h3><a href="/burn_the_witch" title="Burn the Witch">x</a></h3></div>
          </div>
        </div>
        </body></html>
    "#;

    const TITLE_PAGE: &str = r#"
        <html><body>
        <h1 class="names"><span class="name">Блич</span><span class="eng-name">Bleach</span></h1>
        <div class="picture-fotorama"><img src="https://img.example/bleach.jpg"></div>
        <a class="read-last-chapter" href="/bleach/vol74/686">Читать 74 - 686 Смерть и клубника</a>
        </body></html>
    "#;

    #[test]
    fn test_parse_search_page() {
        let hits = parse_search_page(SEARCH_PAGE, 5).unwrap();

        assert_eq!(
            hits,
            vec![
                SearchHit::new("Блич", "/bleach"),
                SearchHit::new("Bleach Remake", "/bleach_remake"),
                SearchHit::new("Burn the Witch", "/burn_the_witch"),
            ]
        );
    }

    #[test]
    fn test_parse_search_page_limits_and_empty() {
        let hits = parse_search_page(SEARCH_PAGE, 1).unwrap();
        assert_eq!(hits.len(), 1);

        let hits = parse_search_page("<html><body><p>Ничего не найдено</p></body></html>", 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_parse_title_page() {
        let info = parse_title_page(TITLE_PAGE).unwrap().unwrap();

        assert_eq!(info.name, "Блич");
        assert_eq!(info.release, Release::new(74, 686));
        assert_eq!(info.image_url.as_deref(), Some("https://img.example/bleach.jpg"));
    }

    #[test]
    fn test_parse_title_page_without_chapters() {
        let html = r#"<h1 class="names"><span class="name">Новинка</span></h1>"#;
        assert_eq!(parse_title_page(html).unwrap(), None);
    }

    #[test]
    fn test_parse_title_page_malformed() {
        let html = r#"
            <h1 class="names"><span class="name">X</span></h1>
            <a class="read-last-chapter">Читать сингл</a>
        "#;
        assert!(matches!(parse_title_page(html), Err(SiteError::ParseError(_))));

        let html = r#"<a class="read-last-chapter">Читать 1 - 2</a>"#;
        assert!(matches!(parse_title_page(html), Err(SiteError::ParseError(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = ReadMangaClientConfig::new("http://localhost:9000/")
            .with_timeout(5)
            .with_max_results(3);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_results, 3);

        let client = ReadMangaClient::new(config).unwrap();
        assert_eq!(client.search_url(), "http://localhost:9000/search");
        assert_eq!(client.title_url("/bleach"), "http://localhost:9000/bleach");
    }
}
