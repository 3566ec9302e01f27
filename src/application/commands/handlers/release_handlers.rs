//! Release Command Handlers - 新章节检查与推送

use std::sync::Arc;

use crate::application::commands::release_commands::*;
use crate::application::error::ApplicationError;
use crate::application::messages;
use crate::application::ports::{
    MessengerPort, OutgoingMessage, SiteRegistry, SubscriberRepositoryPort, TitleRepositoryPort,
};

/// Check Release Handler
///
/// 对单个 Title：抓取最新发布，严格更新时写回并逐个通知订阅者。
/// 单个订阅者投递失败只记录日志，不影响其他订阅者。
pub struct CheckReleaseHandler {
    sites: SiteRegistry,
    title_repo: Arc<dyn TitleRepositoryPort>,
    subscriber_repo: Arc<dyn SubscriberRepositoryPort>,
    messenger: Arc<dyn MessengerPort>,
}

impl CheckReleaseHandler {
    pub fn new(
        sites: SiteRegistry,
        title_repo: Arc<dyn TitleRepositoryPort>,
        subscriber_repo: Arc<dyn SubscriberRepositoryPort>,
        messenger: Arc<dyn MessengerPort>,
    ) -> Self {
        Self {
            sites,
            title_repo,
            subscriber_repo,
            messenger,
        }
    }

    pub async fn handle(
        &self,
        cmd: CheckReleaseCommand,
    ) -> Result<ReleaseCheckOutcome, ApplicationError> {
        let title = cmd.title;
        let adapter = self
            .sites
            .get(title.site())
            .ok_or(ApplicationError::UnsupportedSite(title.site()))?;

        let Some(info) = adapter.get_latest_release(title.urn().as_str()).await? else {
            tracing::debug!(title_id = %title.id(), urn = %title.urn(), "Release unavailable");
            return Ok(ReleaseCheckOutcome::Unavailable);
        };

        if !info.release.is_newer_than(&title.release()) {
            return Ok(ReleaseCheckOutcome::Unchanged);
        }

        // 条件更新失败说明已被其他写入推进到相同或更新的位置
        if !self
            .title_repo
            .advance_release(title.id(), info.release)
            .await?
        {
            return Ok(ReleaseCheckOutcome::Unchanged);
        }

        tracing::info!(
            title_id = %title.id(),
            name = %title.name(),
            from = %title.release(),
            to = %info.release,
            "New release observed"
        );

        let chats = self.subscriber_repo.find_chats_by_title(title.id()).await?;
        let message = OutgoingMessage::text(messages::new_release(title.name(), info.release));

        let mut delivered = 0;
        let mut failed = 0;
        for chat_id in chats {
            match self.messenger.send_message(chat_id, &message).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        chat_id = %chat_id,
                        title_id = %title.id(),
                        error = %e,
                        "Failed to deliver release notification"
                    );
                }
            }
        }

        Ok(ReleaseCheckOutcome::Advanced {
            release: info.release,
            delivered,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::{SubscribeCommand, SubscribeHandler};
    use crate::application::ports::SiteError;
    use crate::domain::{ChatId, Release, SiteType, Title, Urn};
    use crate::infrastructure::adapters::site::FakeSiteAdapter;
    use crate::infrastructure::memory::RecordingMessenger;
    use crate::infrastructure::persistence::sqlite::{
        test_pool, SqliteSubscriberRepository, SqliteTitleRepository,
    };

    struct Fixture {
        site: Arc<FakeSiteAdapter>,
        titles: Arc<SqliteTitleRepository>,
        messenger: Arc<RecordingMessenger>,
        subscribe: SubscribeHandler,
        handler: CheckReleaseHandler,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        let titles = Arc::new(SqliteTitleRepository::new(pool.clone()));
        let subscribers = Arc::new(SqliteSubscriberRepository::new(pool));
        let site = Arc::new(FakeSiteAdapter::new(SiteType::ReadManga));
        let messenger = Arc::new(RecordingMessenger::new());
        let registry = SiteRegistry::new().with_adapter(site.clone());

        Fixture {
            subscribe: SubscribeHandler::new(subscribers.clone()),
            handler: CheckReleaseHandler::new(
                registry,
                titles.clone(),
                subscribers,
                messenger.clone(),
            ),
            site,
            titles,
            messenger,
        }
    }

    async fn subscribe(f: &Fixture, chat: i64) -> Title {
        f.subscribe
            .handle(SubscribeCommand {
                chat_id: ChatId(chat),
                site: SiteType::ReadManga,
                urn: Urn::new("/bleach").unwrap(),
                name: "Bleach".to_string(),
                release: Release::new(1, 5),
            })
            .await
            .unwrap()
            .title()
            .clone()
    }

    #[tokio::test]
    async fn test_same_release_sends_nothing() {
        let f = fixture().await;
        let title = subscribe(&f, 1).await;
        f.site.set_release("/bleach", "Bleach", Release::new(1, 5));

        let outcome = f.handler.handle(CheckReleaseCommand { title }).await.unwrap();

        assert_eq!(outcome, ReleaseCheckOutcome::Unchanged);
        assert!(f.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_newer_chapter_notifies_each_subscriber_once() {
        let f = fixture().await;
        let title = subscribe(&f, 1).await;
        subscribe(&f, 2).await;
        f.site.set_release("/bleach", "Bleach", Release::new(1, 6));

        let outcome = f
            .handler
            .handle(CheckReleaseCommand {
                title: title.clone(),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReleaseCheckOutcome::Advanced {
                release: Release::new(1, 6),
                delivered: 2,
                failed: 0,
            }
        );

        let sent = f.messenger.sent();
        assert_eq!(sent.len(), 2);
        let mut chats: Vec<i64> = sent.iter().map(|(chat, _)| chat.as_i64()).collect();
        chats.sort();
        assert_eq!(chats, vec![1, 2]);
        assert!(sent[0].1.text.contains("Bleach"));
        assert!(sent[0].1.text.contains("1-6"));

        let stored = f.titles.find_by_id(title.id()).await.unwrap().unwrap();
        assert_eq!(stored.release(), Release::new(1, 6));
    }

    #[tokio::test]
    async fn test_older_release_is_ignored() {
        let f = fixture().await;
        let title = subscribe(&f, 1).await;
        f.site.set_release("/bleach", "Bleach", Release::new(0, 99));

        let outcome = f
            .handler
            .handle(CheckReleaseCommand {
                title: title.clone(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, ReleaseCheckOutcome::Unchanged);
        let stored = f.titles.find_by_id(title.id()).await.unwrap().unwrap();
        assert_eq!(stored.release(), Release::new(1, 5));
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_other_subscribers() {
        let f = fixture().await;
        let title = subscribe(&f, 1).await;
        subscribe(&f, 2).await;
        f.messenger.fail_for(ChatId(1));
        f.site.set_release("/bleach", "Bleach", Release::new(2, 1));

        let outcome = f.handler.handle(CheckReleaseCommand { title }).await.unwrap();

        assert_eq!(
            outcome,
            ReleaseCheckOutcome::Advanced {
                release: Release::new(2, 1),
                delivered: 1,
                failed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_adapter_failure_is_reported() {
        let f = fixture().await;
        let title = subscribe(&f, 1).await;
        f.site.fail_release("/bleach", SiteError::Timeout);

        let result = f.handler.handle(CheckReleaseCommand { title }).await;
        assert!(matches!(result, Err(ApplicationError::SiteError(_))));
    }

    #[tokio::test]
    async fn test_missing_page_is_unavailable() {
        let f = fixture().await;
        let title = subscribe(&f, 1).await;

        let outcome = f.handler.handle(CheckReleaseCommand { title }).await.unwrap();
        assert_eq!(outcome, ReleaseCheckOutcome::Unavailable);
    }
}
