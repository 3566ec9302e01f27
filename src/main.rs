//! MangaBot - 漫画新章节订阅机器人
//!
//! - Domain: manga/, subscriber/
//! - Application: commands, queries, conversation, dispatcher, ports
//! - Infrastructure: telegram, adapters, memory, worker, persistence

use std::sync::Arc;

use mangabot::application::commands::{CheckReleaseHandler, SubscribeHandler, UnsubscribeHandler};
use mangabot::application::conversation::{
    Candidate, SearchFlow, SearchFlowConfig, SearchState, UnsubscribeFlow, UnsubscribeState,
};
use mangabot::application::dispatcher::{Dispatcher, StartHandler};
use mangabot::application::ports::{
    BotCommand, IdleExpiryPort, MessengerPort, SiteAdapterPort, SiteRegistry,
};
use mangabot::application::queries::handlers::ListSubscriptionsHandler;
use mangabot::config::{load_config, print_config, AppConfig};
use mangabot::domain::SiteType;
use mangabot::infrastructure::adapters::{ReadMangaClient, ReadMangaClientConfig};
use mangabot::infrastructure::memory::InMemoryConversationStore;
use mangabot::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteSubscriberRepository,
    SqliteTitleRepository,
};
use mangabot::infrastructure::telegram::{
    TelegramClient, TelegramClientConfig, UpdatePoller, UpdatePollerConfig,
};
use mangabot::infrastructure::worker::{
    ConversationSweeper, ConversationSweeperConfig, NotifierConfig, NotifierWorker,
};
use tokio_util::sync::CancellationToken;

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},mangabot={},sqlx=warn", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("MangaBot - 漫画新章节订阅机器人");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig::new(&config.database.path)
        .with_max_connections(config.database.max_connections);
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 创建 Repository 适配器
    let title_repo = Arc::new(SqliteTitleRepository::new(pool.clone()));
    let subscriber_repo = Arc::new(SqliteSubscriberRepository::new(pool.clone()));

    // 创建 Telegram 客户端并校验 token
    let telegram_config = TelegramClientConfig::new(&config.telegram.token)
        .with_api_url(&config.telegram.api_url)
        .with_poll_timeout(config.telegram.poll_timeout_secs);
    let telegram = Arc::new(TelegramClient::new(telegram_config)?);
    let me = telegram.get_me().await?;
    tracing::info!(bot_id = me.id, username = ?me.username, "Connected to Telegram");
    let messenger: Arc<dyn MessengerPort> = telegram.clone();

    // 创建站点适配器
    let readmanga_config = ReadMangaClientConfig::new(&config.site.readmanga_url)
        .with_user_agent(&config.site.user_agent)
        .with_timeout(config.site.timeout_secs)
        .with_max_results(config.search.max_results);
    let readmanga: Arc<dyn SiteAdapterPort> = Arc::new(ReadMangaClient::new(readmanga_config)?);
    let sites = SiteRegistry::new().with_adapter(readmanga.clone());
    tracing::info!(sites = ?sites.sites(), "Site adapters registered");

    // 创建 Command/Query Handlers
    let subscribe_handler = Arc::new(SubscribeHandler::new(subscriber_repo.clone()));
    let unsubscribe_handler = Arc::new(UnsubscribeHandler::new(
        title_repo.clone(),
        subscriber_repo.clone(),
    ));
    let list_handler = Arc::new(ListSubscriptionsHandler::new(
        title_repo.clone(),
        subscriber_repo.clone(),
    ));
    let check_release_handler = Arc::new(CheckReleaseHandler::new(
        sites,
        title_repo.clone(),
        subscriber_repo.clone(),
        messenger.clone(),
    ));

    // 创建会话流程
    let search_store = Arc::new(InMemoryConversationStore::<SearchState>::new("search"));
    let confirmed_store =
        Arc::new(InMemoryConversationStore::<Candidate>::new("search_confirmed"));
    let unsubscribe_store =
        Arc::new(InMemoryConversationStore::<UnsubscribeState>::new("unsubscribe"));

    let search_flow = Arc::new(SearchFlow::new(
        SearchFlowConfig {
            site: SiteType::ReadManga,
            max_results: config.search.max_results,
        },
        readmanga,
        subscribe_handler,
        search_store.clone(),
        confirmed_store.clone(),
    ));
    let unsubscribe_flow = Arc::new(UnsubscribeFlow::new(
        list_handler,
        unsubscribe_handler,
        unsubscribe_store.clone(),
    ));

    // 创建分发器并注册命令菜单
    let dispatcher = Arc::new(
        Dispatcher::builder(messenger.clone())
            .command(BotCommand::new("start", "Начать"), Arc::new(StartHandler))
            .conversation(search_flow)
            .conversation(unsubscribe_flow)
            .fallback(BotCommand::new("cancel", "Отмена"))
            .build(),
    );
    if let Err(e) = messenger.set_commands(&dispatcher.bot_commands()).await {
        tracing::warn!(error = %e, "Failed to register bot commands");
    }

    let shutdown = CancellationToken::new();

    // 启动 NotifierWorker
    let notifier = if config.notifier.enabled {
        let worker = NotifierWorker::new(
            NotifierConfig {
                interval_secs: config.notifier.interval_secs,
                max_concurrent: config.notifier.max_concurrent,
            },
            title_repo.clone(),
            check_release_handler,
            shutdown.clone(),
        );
        Some(tokio::spawn(worker.run()))
    } else {
        tracing::info!("Notifier disabled");
        None
    };

    // 启动 ConversationSweeper
    let stores: Vec<Arc<dyn IdleExpiryPort>> = vec![search_store, confirmed_store, unsubscribe_store];
    let sweeper = ConversationSweeper::new(
        ConversationSweeperConfig {
            idle_timeout_secs: config.conversation.idle_timeout_secs,
            sweep_interval_secs: config.conversation.sweep_interval_secs,
        },
        stores,
        shutdown.clone(),
    );
    let sweeper = tokio::spawn(sweeper.run());

    // 启动 UpdatePoller
    let poller = UpdatePoller::new(
        UpdatePollerConfig {
            max_concurrent: config.telegram.max_concurrent,
            ..Default::default()
        },
        telegram,
        dispatcher,
        shutdown.clone(),
    );
    let poller = tokio::spawn(poller.run());

    tracing::info!("Bot is running, press Ctrl-C to stop");

    // 等待关闭信号
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
    }
    tracing::info!("Received shutdown signal");
    shutdown.cancel();

    poller.await?;
    sweeper.await?;
    if let Some(notifier) = notifier {
        notifier.await?;
    }
    pool.close().await;

    tracing::info!("Shutdown complete");

    Ok(())
}
