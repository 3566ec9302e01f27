//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Telegram 配置
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// 漫画站点配置
    #[serde(default)]
    pub site: SiteConfig,

    /// 搜索配置
    #[serde(default)]
    pub search: SearchConfig,

    /// 新章节通知配置
    #[serde(default)]
    pub notifier: NotifierSettings,

    /// 会话配置
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// Telegram 配置
#[derive(Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token（必填）
    #[serde(default)]
    pub token: String,

    /// Bot API 基础 URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// 长轮询等待时间（秒）
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// 最大并发处理的聊天数
    #[serde(default = "default_max_concurrent_chats")]
    pub max_concurrent: usize,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_max_concurrent_chats() -> usize {
    8
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
            max_concurrent: default_max_concurrent_chats(),
        }
    }
}

impl TelegramConfig {
    /// 用于日志输出的 token：只保留机器人 ID 部分
    pub fn masked_token(&self) -> String {
        match self.token.split_once(':') {
            Some((bot_id, _)) => format!("{}:***", bot_id),
            None if self.token.is_empty() => "<unset>".to_string(),
            None => "***".to_string(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &self.masked_token())
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("max_concurrent", &self.max_concurrent)
            .finish()
    }
}

/// 漫画站点配置
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// readmanga 基础 URL
    #[serde(default = "default_readmanga_url")]
    pub readmanga_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_site_timeout")]
    pub timeout_secs: u64,
}

fn default_readmanga_url() -> String {
    "https://readmanga.live".to_string()
}

fn default_user_agent() -> String {
    "MangaNotification Telegram Bot".to_string()
}

fn default_site_timeout() -> u64 {
    30
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            readmanga_url: default_readmanga_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_site_timeout(),
        }
    }
}

/// 搜索配置
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// 展示的最大结果数
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

/// 新章节通知配置
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierSettings {
    /// 是否启用定时检查
    #[serde(default = "default_notifier_enabled")]
    pub enabled: bool,

    /// 检查间隔（秒）
    #[serde(default = "default_notifier_interval")]
    pub interval_secs: u64,

    /// 同时检查的 Title 数
    #[serde(default = "default_notifier_concurrency")]
    pub max_concurrent: usize,
}

fn default_notifier_enabled() -> bool {
    true
}

fn default_notifier_interval() -> u64 {
    3600 // 1 小时
}

fn default_notifier_concurrency() -> usize {
    4
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            enabled: default_notifier_enabled(),
            interval_secs: default_notifier_interval(),
            max_concurrent: default_notifier_concurrency(),
        }
    }
}

/// 会话配置
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// 空闲超时（秒）
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// 清理间隔（秒）
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_idle_timeout() -> u64 {
    1800 // 30 分钟
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/mangabot.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.site.readmanga_url, "https://readmanga.live");
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.notifier.interval_secs, 3600);
        assert_eq!(config.conversation.idle_timeout_secs, 1800);
        assert_eq!(config.database.path, "data/mangabot.db");
    }

    #[test]
    fn test_masked_token() {
        let mut config = TelegramConfig::default();
        assert_eq!(config.masked_token(), "<unset>");

        config.token = "123456:AAE-secret".to_string();
        assert_eq!(config.masked_token(), "123456:***");
        assert!(!format!("{:?}", config).contains("secret"));

        config.token = "garbage".to_string();
        assert_eq!(config.masked_token(), "***");
    }
}
