//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 兼容的 token 环境变量
const LEGACY_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// 搜索结果上限；回调数据需要保持简短
const MAX_SEARCH_RESULTS: usize = 10;

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `MANGABOT_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `MANGABOT_TELEGRAM__TOKEN=123456:ABC...`
/// - `MANGABOT_NOTIFIER__INTERVAL_SECS=1800`
/// - `MANGABOT_DATABASE__PATH=/data/mangabot.db`
/// - `TELEGRAM_BOT_TOKEN=...`（未设置 token 时使用）
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("telegram.api_url", "https://api.telegram.org")?
        .set_default("telegram.poll_timeout_secs", 30)?
        .set_default("telegram.max_concurrent", 8)?
        .set_default("site.readmanga_url", "https://readmanga.live")?
        .set_default("site.user_agent", "MangaNotification Telegram Bot")?
        .set_default("site.timeout_secs", 30)?
        .set_default("search.max_results", 5)?
        .set_default("notifier.enabled", true)?
        .set_default("notifier.interval_secs", 3600)?
        .set_default("notifier.max_concurrent", 4)?
        .set_default("conversation.idle_timeout_secs", 1800)?
        .set_default("conversation.sweep_interval_secs", 60)?
        .set_default("database.path", "data/mangabot.db")?
        .set_default("database.max_connections", 5)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 例如: MANGABOT_TELEGRAM__TOKEN=123456:ABC
    builder = builder.add_source(
        Environment::with_prefix("MANGABOT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let mut app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    apply_legacy_token(&mut app_config, std::env::var(LEGACY_TOKEN_ENV).ok());

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 未配置 token 时使用兼容变量
fn apply_legacy_token(config: &mut AppConfig, legacy: Option<String>) {
    if !config.telegram.token.trim().is_empty() {
        return;
    }
    if let Some(token) = legacy.filter(|t| !t.trim().is_empty()) {
        config.telegram.token = token.trim().to_string();
    }
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.telegram.token.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "Telegram token is required (MANGABOT_TELEGRAM__TOKEN or {})",
            LEGACY_TOKEN_ENV
        )));
    }

    if config.telegram.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "Telegram max_concurrent cannot be 0".to_string(),
        ));
    }

    if !(1..=MAX_SEARCH_RESULTS).contains(&config.search.max_results) {
        return Err(ConfigError::ValidationError(format!(
            "Search max_results must be between 1 and {}",
            MAX_SEARCH_RESULTS
        )));
    }

    if config.site.readmanga_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Site URL cannot be empty".to_string(),
        ));
    }

    if config.notifier.enabled
        && (config.notifier.interval_secs == 0 || config.notifier.max_concurrent == 0)
    {
        return Err(ConfigError::ValidationError(
            "Notifier interval and max_concurrent cannot be 0 when notifier is enabled"
                .to_string(),
        ));
    }

    if config.conversation.idle_timeout_secs == 0 || config.conversation.sweep_interval_secs == 0
    {
        return Err(ConfigError::ValidationError(
            "Conversation timeouts cannot be 0".to_string(),
        ));
    }

    // 验证数据库路径
    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Telegram API: {}", config.telegram.api_url);
    tracing::info!("Telegram Token: {}", config.telegram.masked_token());
    tracing::info!("Poll Timeout: {}s", config.telegram.poll_timeout_secs);
    tracing::info!("Max Concurrent Chats: {}", config.telegram.max_concurrent);
    tracing::info!("ReadManga URL: {}", config.site.readmanga_url);
    tracing::info!("Site Timeout: {}s", config.site.timeout_secs);
    tracing::info!("Search Max Results: {}", config.search.max_results);
    tracing::info!("Notifier Enabled: {}", config.notifier.enabled);
    if config.notifier.enabled {
        tracing::info!("Notifier Interval: {}s", config.notifier.interval_secs);
    }
    tracing::info!(
        "Conversation Idle Timeout: {}s",
        config.conversation.idle_timeout_secs
    );
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
