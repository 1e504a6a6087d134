// src/store/postgres.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::{PostStore, StoreError};
use crate::ingest::types::{NewRecord, StoredRecord};

const CREATE_POSTS: &str = "CREATE TABLE IF NOT EXISTS posts (
    id            BIGSERIAL PRIMARY KEY,
    external_id   TEXT NOT NULL UNIQUE,
    source        TEXT NOT NULL,
    text          TEXT NOT NULL,
    like_count    BIGINT NOT NULL DEFAULT 0,
    repost_count  BIGINT NOT NULL DEFAULT 0,
    tags          TEXT[] NOT NULL DEFAULT '{}',
    created_at    TIMESTAMPTZ NOT NULL,
    ingested_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

const CREATE_ENGAGEMENT_INDEX: &str = "CREATE INDEX IF NOT EXISTS posts_engagement_idx
    ON posts (like_count DESC, repost_count DESC, created_at DESC)";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    external_id: String,
    source: String,
    text: String,
    like_count: i64,
    repost_count: i64,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for StoredRecord {
    fn from(r: PostRow) -> Self {
        Self {
            id: r.id,
            external_id: r.external_id,
            source: r.source,
            text: r.text,
            like_count: u64::try_from(r.like_count).unwrap_or(0),
            repost_count: u64::try_from(r.repost_count).unwrap_or(0),
            created_at: r.created_at,
            tags: r.tags.into_iter().collect(),
        }
    }
}

/// Postgres-backed store. The pool is opened once and shared by reference.
#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(backend)?;
        info!(max_connections, "postgres pool opened");
        Ok(Self { pool })
    }

    /// Create the posts table and its engagement index if missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_POSTS)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        sqlx::query(CREATE_ENGAGEMENT_INDEX)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn insert(&self, record: &NewRecord, source: &str) -> Result<StoredRecord, StoreError> {
        let tags: Vec<String> = record.tags.iter().cloned().collect();
        let res = sqlx::query_scalar::<_, i64>(
            "INSERT INTO posts (external_id, source, text, like_count, repost_count, tags, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(&record.external_id)
        .bind(source)
        .bind(&record.text)
        .bind(to_i64(record.like_count))
        .bind(to_i64(record.repost_count))
        .bind(&tags)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(id) => Ok(StoredRecord::from_new(id, source, record)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateKey(record.external_id.clone()))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn get(&self, external_id: &str) -> Result<Option<StoredRecord>, StoreError> {
        let row: Option<PostRow> = sqlx::query_as(
            "SELECT id, external_id, source, text, like_count, repost_count, tags, created_at
             FROM posts WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Into::into))
    }

    async fn top_by_engagement(&self, limit: usize) -> Result<Vec<StoredRecord>, StoreError> {
        let rows: Vec<PostRow> = sqlx::query_as(
            "SELECT id, external_id, source, text, like_count, repost_count, tags, created_at
             FROM posts
             ORDER BY like_count DESC, repost_count DESC, created_at DESC
             LIMIT $1",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
