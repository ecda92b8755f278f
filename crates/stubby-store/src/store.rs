use crate::settings::{ClickFailurePolicy, StoreSettings};
use jiff::{SignedDuration, Timestamp};
use std::future::Future;
use std::sync::Arc;
use stubby_core::{
    Clock, Key, KeyCodec, LinkBackend, LinkError, LinkId, LinkInfo, LinkRecord, StorageError,
    SystemClock,
};
use tracing::{debug, trace, warn};

type Result<T> = std::result::Result<T, LinkError>;

/// Allocates, persists and resolves short links on top of a [`LinkBackend`].
///
/// The store keeps no mutable state of its own: the id counter and the
/// records are owned by the backend, whose atomic primitives make every
/// operation safe to call from any number of tasks at once.
pub struct LinkStore<B, C = SystemClock> {
    backend: Arc<B>,
    clock: C,
    settings: StoreSettings,
}

impl<B, C: Clone> Clone for LinkStore<B, C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            clock: self.clock.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<B: LinkBackend> LinkStore<B> {
    /// Creates a store with default settings and the system clock.
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, StoreSettings::default())
    }

    pub fn with_settings(backend: B, settings: StoreSettings) -> Self {
        Self::with_clock(backend, settings, SystemClock)
    }
}

impl<B: LinkBackend, C: Clock> LinkStore<B, C> {
    /// Creates a store that reads wall-clock time from `clock`.
    pub fn with_clock(backend: B, settings: StoreSettings, clock: C) -> Self {
        Self {
            backend: Arc::new(backend),
            clock,
            settings,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Stores `url` under a freshly allocated identifier and returns its key.
    ///
    /// A `ttl` of zero or less means the link never expires. Oversized URLs
    /// are rejected before an identifier is allocated. If the write fails
    /// after allocation the identifier stays consumed and no record becomes
    /// visible.
    pub async fn save(&self, url: &str, ttl: SignedDuration) -> Result<Key> {
        if url.len() > self.settings.max_url_length {
            return Err(LinkError::Validation(format!(
                "url is {} bytes long, at most {} are allowed",
                url.len(),
                self.settings.max_url_length
            )));
        }

        let now = self.clock.now();
        let expires_at = expiry_for(now, ttl)?;
        let created_at = whole_second(now)?;

        let id = self
            .call("allocate id", self.backend.allocate_id())
            .await?;

        let record = LinkRecord::new(url, created_at, expires_at);
        if let Err(e) = self.call("insert record", self.backend.insert(id, &record)).await {
            warn!(id = %id, error = %e, "link id consumed but record not stored");
            return Err(e.into());
        }

        let key = KeyCodec::encode(id);
        debug!(id = %id, key = %key, expires_at = ?expires_at, "saved link");
        Ok(key)
    }

    /// Resolves `key` for a redirect and counts the click.
    ///
    /// Fails with `InvalidKey` before touching the backend when the key is
    /// malformed, `NotFound` when nothing is stored under it and `Expired`
    /// when its lifetime is over. A failed click increment is handled per
    /// [`ClickFailurePolicy`].
    pub async fn lookup(&self, key: &str) -> Result<String> {
        let (id, record) = self.load_live(key).await?;

        match self.call("record click", self.backend.record_click(id)).await {
            Ok(clicks) => {
                trace!(id = %id, clicks, "counted click");
            }
            Err(e) => match self.settings.click_failure {
                ClickFailurePolicy::BestEffort => {
                    warn!(id = %id, error = %e, "failed to count click, redirecting anyway");
                }
                ClickFailurePolicy::Strict => {
                    warn!(id = %id, error = %e, "failed to count click");
                    return Err(e.into());
                }
            },
        }

        Ok(record.url)
    }

    /// Returns the metadata of a live link without counting a click.
    ///
    /// Expired links fail with `Expired` exactly like [`LinkStore::lookup`].
    pub async fn info(&self, key: &str) -> Result<LinkInfo> {
        let (_, record) = self.load_live(key).await?;
        Ok(record.info_at(self.clock.now()))
    }

    async fn load_live(&self, key: &str) -> Result<(LinkId, LinkRecord)> {
        let id = KeyCodec::decode(key).inspect_err(|e| {
            debug!(key, error = %e, "rejected key");
        })?;

        let Some(record) = self.call("fetch record", self.backend.fetch(id)).await? else {
            trace!(id = %id, "link not found");
            return Err(LinkError::NotFound);
        };

        if !record.is_live_at(self.clock.now()) {
            debug!(id = %id, expires_at = ?record.expires_at, "link expired");
            return Err(LinkError::Expired);
        }

        Ok((id, record))
    }

    async fn call<T, F>(&self, operation: &'static str, fut: F) -> stubby_core::Result<T>
    where
        F: Future<Output = stubby_core::Result<T>>,
    {
        match self.settings.operation_timeout {
            None => fut.await,
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                StorageError::Timeout(format!("{operation} did not finish within {limit:?}"))
            })?,
        }
    }
}

/// Absolute expiry for a link created at `now`, rounded up to a whole
/// second so the link lives at least `ttl`.
fn expiry_for(now: Timestamp, ttl: SignedDuration) -> Result<Option<Timestamp>> {
    if ttl <= SignedDuration::ZERO {
        return Ok(None);
    }

    let deadline = now
        .checked_add(ttl)
        .map_err(|e| LinkError::Validation(format!("ttl {ttl} is out of range: {e}")))?;
    let mut seconds = deadline.as_second();
    if deadline.subsec_nanosecond() > 0 {
        seconds += 1;
    }

    Timestamp::from_second(seconds)
        .map(Some)
        .map_err(|e| LinkError::Validation(format!("ttl {ttl} is out of range: {e}")))
}

fn whole_second(now: Timestamp) -> Result<Timestamp> {
    Timestamp::from_second(now.as_second())
        .map_err(|e| LinkError::Backend(StorageError::InvalidData(format!("clock out of range: {e}"))))
}
