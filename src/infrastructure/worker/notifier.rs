//! Release Notifier - 定时检查所有 Title 的新章节

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::commands::{CheckReleaseCommand, CheckReleaseHandler, ReleaseCheckOutcome};
use crate::application::error::ApplicationError;
use crate::application::ports::TitleRepositoryPort;

/// Notifier 配置
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// 扫描间隔（秒）
    pub interval_secs: u64,
    /// 同时检查的 Title 数
    pub max_concurrent: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            max_concurrent: 4,
        }
    }
}

/// 单次扫描统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub checked: usize,
    pub advanced: usize,
    pub unavailable: usize,
    pub failed: usize,
    pub delivered: usize,
    pub undelivered: usize,
}

/// 新章节通知 Worker
///
/// 启动时立即扫描一次，之后按固定间隔扫描；上一轮未结束时跳过错过的时间点，
/// 扫描之间不会重叠
pub struct NotifierWorker {
    config: NotifierConfig,
    title_repo: Arc<dyn TitleRepositoryPort>,
    handler: Arc<CheckReleaseHandler>,
    shutdown: CancellationToken,
}

impl NotifierWorker {
    pub fn new(
        config: NotifierConfig,
        title_repo: Arc<dyn TitleRepositoryPort>,
        handler: Arc<CheckReleaseHandler>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            title_repo,
            handler,
            shutdown,
        }
    }

    /// 启动 Worker，直到收到关闭信号
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            max_concurrent = self.config.max_concurrent,
            "NotifierWorker started"
        );

        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // 关闭时放弃进行中的扫描；已写入的发布点不会重复推送
            let report = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                report = self.scan_once() => report,
            };

            match report {
                Ok(report) => tracing::info!(
                    checked = report.checked,
                    advanced = report.advanced,
                    unavailable = report.unavailable,
                    failed = report.failed,
                    delivered = report.delivered,
                    undelivered = report.undelivered,
                    "Release scan completed"
                ),
                Err(e) => tracing::error!(error = %e, "Release scan failed"),
            }
        }

        tracing::info!("NotifierWorker stopped");
    }

    /// 扫描所有 Title
    ///
    /// 单个 Title 的失败只记录日志，不中断扫描；只有读取 Title 列表失败才返回错误
    pub async fn scan_once(&self) -> Result<ScanReport, ApplicationError> {
        let titles = self.title_repo.find_all().await?;
        tracing::debug!(count = titles.len(), "Scanning titles for new releases");

        let outcomes: Vec<_> = stream::iter(titles)
            .map(|title| {
                let handler = self.handler.clone();
                async move {
                    let title_id = *title.id();
                    let urn = title.urn().clone();
                    let result = handler.handle(CheckReleaseCommand { title }).await;
                    if let Err(e) = &result {
                        tracing::warn!(title_id = %title_id, urn = %urn, error = %e, "Release check failed");
                    }
                    result
                }
            })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let mut report = ScanReport::default();
        for outcome in outcomes {
            report.checked += 1;
            match outcome {
                Ok(ReleaseCheckOutcome::Unchanged) => {}
                Ok(ReleaseCheckOutcome::Unavailable) => report.unavailable += 1,
                Ok(ReleaseCheckOutcome::Advanced {
                    delivered, failed, ..
                }) => {
                    report.advanced += 1;
                    report.delivered += delivered;
                    report.undelivered += failed;
                }
                Err(_) => report.failed += 1,
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::{SubscribeCommand, SubscribeHandler};
    use crate::application::ports::{SiteError, SiteRegistry};
    use crate::domain::{ChatId, Release, SiteType, Urn};
    use crate::infrastructure::adapters::site::FakeSiteAdapter;
    use crate::infrastructure::memory::RecordingMessenger;
    use crate::infrastructure::persistence::sqlite::{
        test_pool, SqliteSubscriberRepository, SqliteTitleRepository,
    };

    async fn subscribe(handler: &SubscribeHandler, chat: i64, site: SiteType, urn: &str) {
        handler
            .handle(SubscribeCommand {
                chat_id: ChatId(chat),
                site,
                urn: Urn::new(urn).unwrap(),
                name: urn.trim_start_matches('/').to_string(),
                release: Release::new(1, 1),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_scan_once_isolates_failures() {
        let pool = test_pool().await;
        let titles = Arc::new(SqliteTitleRepository::new(pool.clone()));
        let subscribers = Arc::new(SqliteSubscriberRepository::new(pool));
        let site = Arc::new(FakeSiteAdapter::new(SiteType::ReadManga));
        let messenger = Arc::new(RecordingMessenger::new());

        let subscribe_handler = SubscribeHandler::new(subscribers.clone());
        subscribe(&subscribe_handler, 1, SiteType::ReadManga, "/bleach").await;
        subscribe(&subscribe_handler, 2, SiteType::ReadManga, "/bleach").await;
        subscribe(&subscribe_handler, 1, SiteType::ReadManga, "/naruto").await;
        subscribe(&subscribe_handler, 1, SiteType::ReadManga, "/gone").await;
        subscribe(&subscribe_handler, 1, SiteType::ReadManga, "/same").await;
        // 没有注册适配器的站点
        subscribe(&subscribe_handler, 1, SiteType::Mangalib, "/other").await;

        site.set_release("/bleach", "bleach", Release::new(1, 2));
        site.fail_release("/naruto", SiteError::Timeout);
        site.set_release("/same", "same", Release::new(1, 1));
        messenger.fail_for(ChatId(2));

        let handler = Arc::new(CheckReleaseHandler::new(
            SiteRegistry::new().with_adapter(site.clone()),
            titles.clone(),
            subscribers,
            messenger.clone(),
        ));
        let worker = NotifierWorker::new(
            NotifierConfig::default(),
            titles,
            handler,
            CancellationToken::new(),
        );

        let report = worker.scan_once().await.unwrap();
        assert_eq!(
            report,
            ScanReport {
                checked: 5,
                advanced: 1,
                unavailable: 1,
                failed: 2,
                delivered: 1,
                undelivered: 1,
            }
        );
        assert_eq!(messenger.sent().len(), 1);
        assert_eq!(messenger.sent()[0].1.text, "Вышла новая глава bleach\n\n1-2");

        // 第二轮没有新发布，不重复推送
        let report = worker.scan_once().await.unwrap();
        assert_eq!(report.advanced, 0);
        assert_eq!(messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_run_scans_at_startup_and_stops() {
        let pool = test_pool().await;
        let titles = Arc::new(SqliteTitleRepository::new(pool.clone()));
        let subscribers = Arc::new(SqliteSubscriberRepository::new(pool));
        let site = Arc::new(FakeSiteAdapter::new(SiteType::ReadManga));
        let messenger = Arc::new(RecordingMessenger::new());

        let subscribe_handler = SubscribeHandler::new(subscribers.clone());
        subscribe(&subscribe_handler, 1, SiteType::ReadManga, "/bleach").await;
        site.set_release("/bleach", "bleach", Release::new(2, 1));

        let handler = Arc::new(CheckReleaseHandler::new(
            SiteRegistry::new().with_adapter(site),
            titles.clone(),
            subscribers,
            messenger.clone(),
        ));
        let shutdown = CancellationToken::new();
        let worker = NotifierWorker::new(NotifierConfig::default(), titles, handler, shutdown.clone());
        let task = tokio::spawn(worker.run());

        for _ in 0..100 {
            if !messenger.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(messenger.sent().len(), 1);

        shutdown.cancel();
        task.await.unwrap();
    }
}
