use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use stubby_core::error::{Result, StorageError};
use stubby_core::record::{expiry_from_unix, expiry_to_unix, timestamp_from_unix};
use stubby_core::{LinkBackend, LinkId, LinkRecord};
use tracing::{debug, trace, warn};

pub const DEFAULT_KEY_PREFIX: &str = "stubby:";

const FIELD_URL: &str = "url";
const FIELD_CREATED: &str = "created";
const FIELD_UNTIL: &str = "until";
const FIELD_COUNT: &str = "count";

/// Bumps the click counter only when the hash exists, so a stray increment
/// can never materialize a half-empty record.
const RECORD_CLICK_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return redis.call('HINCRBY', KEYS[1], ARGV[1], 1)
end
return -1
"#;

/// Writes every field of a new record, refusing to touch an existing hash.
const INSERT_RECORD_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2], ARGV[3], ARGV[4], ARGV[5], ARGV[6], ARGV[7], ARGV[8])
return 1
"#;

/// Redis implementation of [`LinkBackend`].
///
/// Layout below the key prefix:
/// - `meta:next_id` holds the id counter (`INCR`)
/// - `link:<id>` is a hash, written once, with the fields `url`, `created`, `until`
///   (unix seconds, 0 = never) and `count`
///
/// Every operation is a single Redis command or script and therefore atomic.
#[derive(Clone)]
pub struct RedisBackend {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
    insert_record: redis::Script,
    record_click: redis::Script,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

pub(crate) fn map_redis_error(operation: &str, err: redis::RedisError) -> StorageError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        StorageError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StorageError::Unavailable(message)
    } else {
        StorageError::Operation(message)
    }
}

impl RedisBackend {
    /// Creates a backend on top of an existing connection using
    /// [`DEFAULT_KEY_PREFIX`].
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a backend with a custom key prefix, e.g. to share one Redis
    /// database between deployments.
    pub fn with_prefix(conn: redis::aio::MultiplexedConnection, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            insert_record: redis::Script::new(INSERT_RECORD_SCRIPT),
            record_click: redis::Script::new(RECORD_CLICK_SCRIPT),
        }
    }

    /// Opens a connection to `redis_url` and checks it with a `PING`.
    pub async fn connect(redis_url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StorageError::Unavailable(format!("invalid redis url: {e}")))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to ping Redis", e))?;

        Ok(Self::with_prefix(conn, key_prefix))
    }

    fn counter_key(&self) -> String {
        format!("{}meta:next_id", self.key_prefix)
    }

    fn record_key(&self, id: LinkId) -> String {
        format!("{}link:{}", self.key_prefix, id)
    }
}

fn parse_field<T: std::str::FromStr>(
    fields: &HashMap<String, String>,
    name: &str,
    id: LinkId,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = fields.get(name).ok_or_else(|| {
        StorageError::InvalidData(format!("record {id} is missing field '{name}'"))
    })?;
    raw.parse().map_err(|e| {
        StorageError::InvalidData(format!("record {id} has invalid '{name}' value '{raw}': {e}"))
    })
}

fn parse_record(id: LinkId, mut fields: HashMap<String, String>) -> Result<LinkRecord> {
    let created = parse_field::<i64>(&fields, FIELD_CREATED, id)?;
    let until = parse_field::<i64>(&fields, FIELD_UNTIL, id)?;
    // a record that was never clicked may lack the field on older data
    let clicks = if fields.contains_key(FIELD_COUNT) {
        parse_field::<u64>(&fields, FIELD_COUNT, id)?
    } else {
        0
    };
    let url = fields.remove(FIELD_URL).ok_or_else(|| {
        StorageError::InvalidData(format!("record {id} is missing field '{FIELD_URL}'"))
    })?;

    Ok(LinkRecord {
        url,
        created_at: timestamp_from_unix(created)?,
        expires_at: expiry_from_unix(until)?,
        clicks,
    })
}

#[async_trait]
impl LinkBackend for RedisBackend {
    async fn allocate_id(&self) -> Result<LinkId> {
        let mut conn = self.conn.clone();
        let next: i64 = conn
            .incr(self.counter_key(), 1)
            .await
            .map_err(|e| map_redis_error("failed to increment id counter", e))?;

        trace!(id = next, "allocated link id");
        LinkId::new(next)
            .map_err(|e| StorageError::InvalidData(format!("id counter returned {next}: {e}")))
    }

    async fn insert(&self, id: LinkId, record: &LinkRecord) -> Result<()> {
        let key = self.record_key(id);
        let mut conn = self.conn.clone();

        let inserted: i64 = self
            .insert_record
            .key(&key)
            .arg(FIELD_URL)
            .arg(&record.url)
            .arg(FIELD_CREATED)
            .arg(record.created_at.as_second())
            .arg(FIELD_UNTIL)
            .arg(expiry_to_unix(record.expires_at))
            .arg(FIELD_COUNT)
            .arg(record.clicks)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(id = %id, error = %e, "failed to store link record in Redis");
                map_redis_error("failed to store link record", e)
            })?;

        if inserted == 0 {
            return Err(StorageError::Conflict(id.to_string()));
        }

        debug!(id = %id, "stored link record in Redis");
        Ok(())
    }

    async fn fetch(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        let key = self.record_key(id);
        let mut conn = self.conn.clone();

        let fields: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| map_redis_error("failed to fetch link record", e))?;

        if fields.is_empty() {
            trace!(id = %id, "link record not found in Redis");
            return Ok(None);
        }

        parse_record(id, fields).map(Some)
    }

    async fn record_click(&self, id: LinkId) -> Result<u64> {
        let key = self.record_key(id);
        let mut conn = self.conn.clone();

        let count: i64 = self
            .record_click
            .key(&key)
            .arg(FIELD_COUNT)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to record click", e))?;

        u64::try_from(count).map_err(|_| {
            StorageError::Operation(format!("cannot count click for missing record {id}"))
        })
    }
}
