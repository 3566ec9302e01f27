//! SQLite Title Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{RepositoryError, TitleRepositoryPort};
use crate::domain::{Release, SiteType, Title, TitleId, Urn};

const TITLE_COLUMNS: &str = "id, site, urn, name, volume, chapter, created_at, updated_at";

/// SQLite Title Repository
pub struct SqliteTitleRepository {
    pool: DbPool,
}

impl SqliteTitleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TitleRow {
    id: String,
    site: i64,
    urn: String,
    name: String,
    volume: i64,
    chapter: i64,
    created_at: String,
    updated_at: String,
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
        .with_timezone(&Utc))
}

fn to_u32(value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

/// 插入新 Title；(site, urn) 已存在时返回已存储的记录
///
/// 在调用方的连接（通常是事务）上执行，插入与读取看到同一份数据
pub(super) async fn insert_or_get(
    conn: &mut SqliteConnection,
    title: &Title,
) -> Result<Title, RepositoryError> {
    let release = title.release();
    sqlx::query(
        r#"
        INSERT INTO titles (id, site, urn, name, volume, chapter, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(site, urn) DO NOTHING
        "#,
    )
    .bind(title.id().to_string())
    .bind(title.site().as_i64())
    .bind(title.urn().as_str())
    .bind(title.name())
    .bind(release.volume as i64)
    .bind(release.chapter as i64)
    .bind(title.created_at().to_rfc3339())
    .bind(title.updated_at().to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

    let row: TitleRow = sqlx::query_as(&format!(
        "SELECT {} FROM titles WHERE site = ? AND urn = ?",
        TITLE_COLUMNS
    ))
    .bind(title.site().as_i64())
    .bind(title.urn().as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

    Title::try_from(row)
}

impl TryFrom<TitleRow> for Title {
    type Error = RepositoryError;

    fn try_from(row: TitleRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        let site = SiteType::from_i64(row.site)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        let urn =
            Urn::new(row.urn).map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        Ok(Title::restore(
            TitleId::from_uuid(id),
            site,
            urn,
            row.name,
            Release::new(to_u32(row.volume)?, to_u32(row.chapter)?),
            parse_time(&row.created_at)?,
            parse_time(&row.updated_at)?,
        ))
    }
}

#[async_trait]
impl TitleRepositoryPort for SqliteTitleRepository {
    async fn find_by_id(&self, id: &TitleId) -> Result<Option<Title>, RepositoryError> {
        let row: Option<TitleRow> =
            sqlx::query_as(&format!("SELECT {} FROM titles WHERE id = ?", TITLE_COLUMNS))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(Title::try_from).transpose()
    }

    async fn find_by_key(
        &self,
        site: SiteType,
        urn: &Urn,
    ) -> Result<Option<Title>, RepositoryError> {
        let row: Option<TitleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM titles WHERE site = ? AND urn = ?",
            TITLE_COLUMNS
        ))
        .bind(site.as_i64())
        .bind(urn.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(Title::try_from).transpose()
    }

    async fn find_many(&self, ids: &[TitleId]) -> Result<Vec<Title>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM titles WHERE id IN ({})",
            TITLE_COLUMNS, placeholders
        );
        let mut query = sqlx::query_as::<_, TitleRow>(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let mut by_id: HashMap<TitleId, Title> = rows
            .into_iter()
            .map(|row| Title::try_from(row).map(|t| (*t.id(), t)))
            .collect::<Result<_, _>>()?;

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn find_all(&self) -> Result<Vec<Title>, RepositoryError> {
        let rows: Vec<TitleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM titles ORDER BY created_at",
            TITLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(Title::try_from).collect()
    }

    async fn advance_release(
        &self,
        id: &TitleId,
        release: Release,
    ) -> Result<bool, RepositoryError> {
        let volume = release.volume as i64;
        let chapter = release.chapter as i64;

        let result = sqlx::query(
            r#"
            UPDATE titles SET volume = ?, chapter = ?, updated_at = ?
            WHERE id = ? AND (volume < ? OR (volume = ? AND chapter < ?))
            "#,
        )
        .bind(volume)
        .bind(chapter)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(volume)
        .bind(volume)
        .bind(chapter)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_if_orphaned(&self, id: &TitleId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM titles
            WHERE id = ? AND NOT EXISTS (SELECT 1 FROM subscriptions WHERE title_id = ?)
            "#,
        )
        .bind(id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
