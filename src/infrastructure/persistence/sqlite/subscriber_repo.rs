//! SQLite Subscriber Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use uuid::Uuid;

use super::title_repo::insert_or_get;
use super::DbPool;
use crate::application::ports::{RepositoryError, SubscriberRepositoryPort};
use crate::domain::{ChatId, Subscriber, Title, TitleId};

/// SQLite Subscriber Repository
pub struct SqliteSubscriberRepository {
    pool: DbPool,
}

impl SqliteSubscriberRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SubscriberRow {
    chat_id: i64,
    created_at: String,
}

#[derive(FromRow)]
struct SubscriptionRow {
    title_id: String,
}

impl TryFrom<SubscriptionRow> for TitleId {
    type Error = RepositoryError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Uuid::parse_str(&row.title_id)
            .map(TitleId::from_uuid)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))
    }
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(e.to_string())
}

async fn load(
    conn: &mut SqliteConnection,
    chat_id: ChatId,
) -> Result<Option<Subscriber>, RepositoryError> {
    let row: Option<SubscriberRow> =
        sqlx::query_as("SELECT chat_id, created_at FROM subscribers WHERE chat_id = ?")
            .bind(chat_id.as_i64())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_error)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let links: Vec<SubscriptionRow> = sqlx::query_as(
        "SELECT title_id FROM subscriptions WHERE chat_id = ? ORDER BY position",
    )
    .bind(row.chat_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error)?;

    let subscriptions = links
        .into_iter()
        .map(TitleId::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
        .with_timezone(&Utc);

    Ok(Some(Subscriber::restore(
        ChatId(row.chat_id),
        subscriptions,
        created_at,
    )))
}

/// 整体替换引用列表，调用方负责事务
async fn write(conn: &mut SqliteConnection, subscriber: &Subscriber) -> Result<(), RepositoryError> {
    let chat_id = subscriber.chat_id().as_i64();

    sqlx::query(
        r#"
        INSERT INTO subscribers (chat_id, created_at) VALUES (?, ?)
        ON CONFLICT(chat_id) DO NOTHING
        "#,
    )
    .bind(chat_id)
    .bind(subscriber.created_at().to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    sqlx::query("DELETE FROM subscriptions WHERE chat_id = ?")
        .bind(chat_id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

    for (position, title_id) in subscriber.subscriptions().iter().enumerate() {
        sqlx::query("INSERT INTO subscriptions (chat_id, title_id, position) VALUES (?, ?, ?)")
            .bind(chat_id)
            .bind(title_id.to_string())
            .bind(position as i64)
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
    }

    Ok(())
}

#[async_trait]
impl SubscriberRepositoryPort for SqliteSubscriberRepository {
    async fn find(&self, chat_id: ChatId) -> Result<Option<Subscriber>, RepositoryError> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        load(&mut conn, chat_id).await
    }

    async fn save(&self, subscriber: &Subscriber) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        write(&mut tx, subscriber).await?;
        tx.commit().await.map_err(db_error)
    }

    async fn attach(
        &self,
        chat_id: ChatId,
        title: &Title,
    ) -> Result<(Title, bool), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // 第一条语句即写入，事务从这里起持有写锁；
        // 其他连接的孤立清理无法在查找和建立引用之间删除该 Title
        let stored = insert_or_get(&mut tx, title).await?;

        let mut subscriber = load(&mut tx, chat_id)
            .await?
            .unwrap_or_else(|| Subscriber::new(chat_id));

        if !subscriber.subscribe(*stored.id()) {
            tx.rollback().await.map_err(db_error)?;
            return Ok((stored, false));
        }

        write(&mut tx, &subscriber).await?;
        tx.commit().await.map_err(db_error)?;

        Ok((stored, true))
    }

    async fn find_chats_by_title(
        &self,
        title_id: &TitleId,
    ) -> Result<Vec<ChatId>, RepositoryError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT chat_id FROM subscriptions WHERE title_id = ? ORDER BY chat_id",
        )
        .bind(title_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|(chat_id,)| ChatId(chat_id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TitleRepositoryPort;
    use crate::domain::{Release, SiteType, Urn};
    use crate::infrastructure::persistence::sqlite::{test_pool, SqliteTitleRepository};

    fn title(urn: &str) -> Title {
        Title::new(
            SiteType::ReadManga,
            Urn::new(urn).unwrap(),
            urn.trim_start_matches('/'),
            Release::new(1, 1),
        )
        .unwrap()
    }

    async fn stored_title(repo: &SqliteSubscriberRepository, urn: &str) -> TitleId {
        let mut conn = repo.pool.acquire().await.unwrap();
        *insert_or_get(&mut conn, &title(urn)).await.unwrap().id()
    }

    #[tokio::test]
    async fn test_save_and_find_keeps_order() {
        let repo = SqliteSubscriberRepository::new(test_pool().await);

        let a = stored_title(&repo, "/a").await;
        let b = stored_title(&repo, "/b").await;

        assert!(repo.find(ChatId(1)).await.unwrap().is_none());

        let mut subscriber = Subscriber::new(ChatId(1));
        subscriber.subscribe(b);
        subscriber.subscribe(a);
        repo.save(&subscriber).await.unwrap();

        let loaded = repo.find(ChatId(1)).await.unwrap().unwrap();
        assert_eq!(loaded.subscriptions(), &[b, a]);

        subscriber.unsubscribe(&b);
        repo.save(&subscriber).await.unwrap();
        let loaded = repo.find(ChatId(1)).await.unwrap().unwrap();
        assert_eq!(loaded.subscriptions(), &[a]);
    }

    #[tokio::test]
    async fn test_find_chats_by_title() {
        let repo = SqliteSubscriberRepository::new(test_pool().await);

        let a = stored_title(&repo, "/a").await;
        let b = stored_title(&repo, "/b").await;

        for (chat, ids) in [(ChatId(3), vec![a, b]), (ChatId(2), vec![a]), (ChatId(4), vec![b])] {
            let mut subscriber = Subscriber::new(chat);
            for id in ids {
                subscriber.subscribe(id);
            }
            repo.save(&subscriber).await.unwrap();
        }

        assert_eq!(
            repo.find_chats_by_title(&a).await.unwrap(),
            vec![ChatId(2), ChatId(3)]
        );
        assert_eq!(
            repo.find_chats_by_title(&b).await.unwrap(),
            vec![ChatId(3), ChatId(4)]
        );
        assert!(repo
            .find_chats_by_title(&TitleId::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_attach_creates_title_and_appends() {
        let pool = test_pool().await;
        let titles = SqliteTitleRepository::new(pool.clone());
        let repo = SqliteSubscriberRepository::new(pool);

        let (bleach, added) = repo.attach(ChatId(1), &title("/bleach")).await.unwrap();
        assert!(added);
        let (naruto, _) = repo.attach(ChatId(1), &title("/naruto")).await.unwrap();

        // 同一个键再次订阅：复用已存储的 Title，不追加引用
        let (again, added) = repo.attach(ChatId(1), &title("/bleach")).await.unwrap();
        assert!(!added);
        assert_eq!(again.id(), bleach.id());

        let loaded = repo.find(ChatId(1)).await.unwrap().unwrap();
        assert_eq!(loaded.subscriptions(), &[*bleach.id(), *naruto.id()]);
        assert_eq!(titles.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_attach_after_orphan_cleanup_recreates_title() {
        let pool = test_pool().await;
        let titles = SqliteTitleRepository::new(pool.clone());
        let repo = SqliteSubscriberRepository::new(pool);

        // chat 2 是唯一的订阅者，退订后 Title 被清理
        let (old, _) = repo.attach(ChatId(2), &title("/bleach")).await.unwrap();
        repo.save(&Subscriber::new(ChatId(2))).await.unwrap();
        assert!(titles.delete_if_orphaned(old.id()).await.unwrap());

        let (stored, added) = repo.attach(ChatId(1), &title("/bleach")).await.unwrap();

        assert!(added);
        assert_ne!(stored.id(), old.id());
        assert!(titles.find_by_id(stored.id()).await.unwrap().is_some());
        assert_eq!(
            repo.find_chats_by_title(stored.id()).await.unwrap(),
            vec![ChatId(1)]
        );
    }
}
