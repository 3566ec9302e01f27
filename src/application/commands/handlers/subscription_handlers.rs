//! Subscription Command Handlers

use std::sync::Arc;

use crate::application::commands::subscription_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{SubscriberRepositoryPort, TitleRepositoryPort};
use crate::domain::Title;

/// Subscribe Handler - 幂等订阅
pub struct SubscribeHandler {
    subscriber_repo: Arc<dyn SubscriberRepositoryPort>,
}

impl SubscribeHandler {
    pub fn new(subscriber_repo: Arc<dyn SubscriberRepositoryPort>) -> Self {
        Self { subscriber_repo }
    }

    pub async fn handle(&self, cmd: SubscribeCommand) -> Result<SubscribeOutcome, ApplicationError> {
        let candidate = Title::new(cmd.site, cmd.urn, cmd.name, cmd.release)?;

        // 查找或创建 Title 与建立引用在同一事务内完成
        let (title, added) = self
            .subscriber_repo
            .attach(cmd.chat_id, &candidate)
            .await?;

        if !added {
            tracing::info!(
                chat_id = %cmd.chat_id,
                title_id = %title.id(),
                "Already subscribed"
            );
            return Ok(SubscribeOutcome::AlreadySubscribed(title));
        }

        tracing::info!(
            chat_id = %cmd.chat_id,
            title_id = %title.id(),
            site = %title.site(),
            urn = %title.urn(),
            "Subscribed"
        );

        Ok(SubscribeOutcome::Subscribed(title))
    }
}

/// Unsubscribe Handler - 移除单个引用，孤立的 Title 一并删除
pub struct UnsubscribeHandler {
    title_repo: Arc<dyn TitleRepositoryPort>,
    subscriber_repo: Arc<dyn SubscriberRepositoryPort>,
}

impl UnsubscribeHandler {
    pub fn new(
        title_repo: Arc<dyn TitleRepositoryPort>,
        subscriber_repo: Arc<dyn SubscriberRepositoryPort>,
    ) -> Self {
        Self {
            title_repo,
            subscriber_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: UnsubscribeCommand,
    ) -> Result<UnsubscribeOutcome, ApplicationError> {
        let Some(mut subscriber) = self.subscriber_repo.find(cmd.chat_id).await? else {
            return Ok(UnsubscribeOutcome::NotSubscribed);
        };

        if !subscriber.unsubscribe(&cmd.title_id) {
            return Ok(UnsubscribeOutcome::NotSubscribed);
        }

        let title_name = self
            .title_repo
            .find_by_id(&cmd.title_id)
            .await?
            .map(|t| t.name().to_string())
            .unwrap_or_default();

        self.subscriber_repo.save(&subscriber).await?;

        let title_removed = self.title_repo.delete_if_orphaned(&cmd.title_id).await?;

        tracing::info!(
            chat_id = %cmd.chat_id,
            title_id = %cmd.title_id,
            title_removed = title_removed,
            "Unsubscribed"
        );

        Ok(UnsubscribeOutcome::Unsubscribed {
            title_name,
            title_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, Release, SiteType, TitleId, Urn};
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, test_pool, DatabaseConfig, SqliteSubscriberRepository,
        SqliteTitleRepository,
    };

    struct Fixture {
        titles: Arc<SqliteTitleRepository>,
        subscribers: Arc<SqliteSubscriberRepository>,
        subscribe: SubscribeHandler,
        unsubscribe: UnsubscribeHandler,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        let titles = Arc::new(SqliteTitleRepository::new(pool.clone()));
        let subscribers = Arc::new(SqliteSubscriberRepository::new(pool));
        Fixture {
            subscribe: SubscribeHandler::new(subscribers.clone()),
            unsubscribe: UnsubscribeHandler::new(titles.clone(), subscribers.clone()),
            titles,
            subscribers,
        }
    }

    fn subscribe_cmd(chat: i64, urn: &str, name: &str) -> SubscribeCommand {
        SubscribeCommand {
            chat_id: ChatId(chat),
            site: SiteType::ReadManga,
            urn: Urn::new(urn).unwrap(),
            name: name.to_string(),
            release: Release::new(1, 3),
        }
    }

    #[tokio::test]
    async fn test_subscribe_twice_keeps_single_reference() {
        let f = fixture().await;

        let first = f.subscribe.handle(subscribe_cmd(7, "/bleach", "Bleach")).await.unwrap();
        assert!(matches!(first, SubscribeOutcome::Subscribed(_)));

        let second = f.subscribe.handle(subscribe_cmd(7, "/bleach", "Bleach")).await.unwrap();
        assert!(matches!(second, SubscribeOutcome::AlreadySubscribed(_)));
        assert_eq!(first.title().id(), second.title().id());

        let subscriber = f.subscribers.find(ChatId(7)).await.unwrap().unwrap();
        assert_eq!(subscriber.subscriptions().len(), 1);
        assert_eq!(f.titles.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_title_is_shared_between_subscribers() {
        let f = fixture().await;

        let a = f.subscribe.handle(subscribe_cmd(1, "/bleach", "Bleach")).await.unwrap();
        let b = f.subscribe.handle(subscribe_cmd(2, "/bleach", "Bleach")).await.unwrap();

        assert_eq!(a.title().id(), b.title().id());
        let chats = f.subscribers.find_chats_by_title(a.title().id()).await.unwrap();
        assert_eq!(chats.len(), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_only_that_reference() {
        let f = fixture().await;

        let bleach = f.subscribe.handle(subscribe_cmd(1, "/bleach", "Bleach")).await.unwrap();
        let naruto = f.subscribe.handle(subscribe_cmd(1, "/naruto", "Naruto")).await.unwrap();
        f.subscribe.handle(subscribe_cmd(2, "/bleach", "Bleach")).await.unwrap();

        let outcome = f
            .unsubscribe
            .handle(UnsubscribeCommand {
                chat_id: ChatId(1),
                title_id: *bleach.title().id(),
            })
            .await
            .unwrap();

        match outcome {
            UnsubscribeOutcome::Unsubscribed {
                title_name,
                title_removed,
            } => {
                assert_eq!(title_name, "Bleach");
                // chat 2 仍然引用 Bleach
                assert!(!title_removed);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let subscriber = f.subscribers.find(ChatId(1)).await.unwrap().unwrap();
        assert_eq!(subscriber.subscriptions(), &[*naruto.title().id()]);
        assert!(f.titles.find_by_id(bleach.title().id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unsubscribe_last_reference_removes_title() {
        let f = fixture().await;

        let bleach = f.subscribe.handle(subscribe_cmd(1, "/bleach", "Bleach")).await.unwrap();
        let outcome = f
            .unsubscribe
            .handle(UnsubscribeCommand {
                chat_id: ChatId(1),
                title_id: *bleach.title().id(),
            })
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            UnsubscribeOutcome::Unsubscribed {
                title_removed: true,
                ..
            }
        ));
        assert!(f.titles.find_by_id(bleach.title().id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_reference() {
        let f = fixture().await;

        let outcome = f
            .unsubscribe
            .handle(UnsubscribeCommand {
                chat_id: ChatId(99),
                title_id: TitleId::new(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, UnsubscribeOutcome::NotSubscribed));
    }

    #[tokio::test]
    async fn test_resubscribe_races_with_orphan_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(dir.path().join("bot.db")).with_max_connections(4);
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let titles = Arc::new(SqliteTitleRepository::new(pool.clone()));
        let subscribers = Arc::new(SqliteSubscriberRepository::new(pool));
        let subscribe = SubscribeHandler::new(subscribers.clone());
        let unsubscribe = UnsubscribeHandler::new(titles.clone(), subscribers.clone());

        // chat 2 反复订阅、退订（每次退订都清理孤立 Title），chat 1 同时订阅同一作品
        let churn = async {
            for _ in 0..20 {
                let outcome = subscribe.handle(subscribe_cmd(2, "/bleach", "Bleach")).await?;
                unsubscribe
                    .handle(UnsubscribeCommand {
                        chat_id: ChatId(2),
                        title_id: *outcome.title().id(),
                    })
                    .await?;
            }
            Ok::<_, ApplicationError>(())
        };
        let join = async {
            for _ in 0..20 {
                tokio::task::yield_now().await;
            }
            subscribe.handle(subscribe_cmd(1, "/bleach", "Bleach")).await
        };

        let (churned, joined) = tokio::join!(churn, join);
        churned.unwrap();
        let title = joined.unwrap().title().clone();

        // chat 1 的引用始终指向一个存在的 Title
        assert_eq!(subscriptions_of(&subscribers, 1).await, vec![*title.id()]);
        assert!(titles.find_by_id(title.id()).await.unwrap().is_some());
        assert_eq!(
            subscribers.find_chats_by_title(title.id()).await.unwrap(),
            vec![ChatId(1)]
        );
    }

    async fn subscriptions_of(repo: &SqliteSubscriberRepository, chat: i64) -> Vec<TitleId> {
        repo.find(ChatId(chat))
            .await
            .unwrap()
            .map(|s| s.subscriptions().to_vec())
            .unwrap_or_default()
    }
}
