use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use stubby_core::error::{Result, StorageError};
use stubby_core::record::{expiry_from_unix, expiry_to_unix, timestamp_from_unix};
use stubby_core::{LinkBackend, LinkId, LinkRecord};
use tracing::{debug, trace};

/// Schema applied by [`SqliteBackend::migrate`].
pub const SCHEMA: &str = include_str!("../ddl/sqlite/links.sql");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite implementation of [`LinkBackend`].
///
/// The id counter is a row in `link_counters` bumped with a single
/// `UPDATE ... RETURNING`, so allocation stays atomic across pooled
/// connections and survives restarts. Records live in `links`, one row per
/// id, with `until = 0` for links that never expire.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Creates a backend from an existing pool. The schema must already
    /// exist; see [`SqliteBackend::migrate`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `database_url` and
    /// applies the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(map_sqlx_error)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        let backend = Self::new(pool);
        backend.migrate().await?;
        Ok(backend)
    }

    /// Creates the tables and seeds the id counter if they are missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl LinkBackend for SqliteBackend {
    async fn allocate_id(&self) -> Result<LinkId> {
        let next: i64 = sqlx::query_scalar(
            r#"
            UPDATE link_counters
            SET value = value + 1
            WHERE name = 'link_id'
            RETURNING value
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| StorageError::InvalidData("id counter row is missing".to_string()))?;

        trace!(id = next, "allocated link id");
        LinkId::new(next)
            .map_err(|e| StorageError::InvalidData(format!("id counter returned {next}: {e}")))
    }

    async fn insert(&self, id: LinkId, record: &LinkRecord) -> Result<()> {
        let clicks = i64::try_from(record.clicks)
            .map_err(|_| StorageError::InvalidData(format!("click count {} too large", record.clicks)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO links (id, url, created, until, clicks)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.get())
        .bind(&record.url)
        .bind(record.created_at.as_second())
        .bind(expiry_to_unix(record.expires_at))
        .bind(clicks)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(id = %id, "stored link record in SQLite");
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => Err(StorageError::Conflict(id.to_string())),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn fetch(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT url, created, until, clicks
            FROM links
            WHERE id = ?
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            trace!(id = %id, "link record not found in SQLite");
            return Ok(None);
        };

        let url: String = row.try_get("url").map_err(map_sqlx_error)?;
        let created: i64 = row.try_get("created").map_err(map_sqlx_error)?;
        let until: i64 = row.try_get("until").map_err(map_sqlx_error)?;
        let clicks: i64 = row.try_get("clicks").map_err(map_sqlx_error)?;

        Ok(Some(LinkRecord {
            url,
            created_at: timestamp_from_unix(created)?,
            expires_at: expiry_from_unix(until)?,
            clicks: u64::try_from(clicks).map_err(|_| {
                StorageError::InvalidData(format!("record {id} has negative click count {clicks}"))
            })?,
        }))
    }

    async fn record_click(&self, id: LinkId) -> Result<u64> {
        let clicks: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE links
            SET clicks = clicks + 1
            WHERE id = ?
            RETURNING clicks
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let clicks = clicks.ok_or_else(|| {
            StorageError::Operation(format!("cannot count click for missing record {id}"))
        })?;
        u64::try_from(clicks).map_err(|_| {
            StorageError::InvalidData(format!("record {id} has negative click count {clicks}"))
        })
    }
}
