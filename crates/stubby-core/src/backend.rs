use crate::error::Result;
use crate::record::{LinkId, LinkRecord};
use async_trait::async_trait;

/// Persistence contract of the link store.
///
/// The durable id counter and the records belong to the backend; every
/// method must be a single atomic operation on the backend side so that
/// concurrent callers never need client-side locking.
#[async_trait]
pub trait LinkBackend: Send + Sync + 'static {
    /// Atomically increments the durable counter and returns the new value.
    ///
    /// Values are strictly increasing and never handed out twice, even
    /// across restarts. The first value is 1.
    async fn allocate_id(&self) -> Result<LinkId>;

    /// Writes all fields of a new record in one atomic step.
    ///
    /// The stored click count starts at `record.clicks`.
    async fn insert(&self, id: LinkId, record: &LinkRecord) -> Result<()>;

    /// Reads the record stored under `id`, expired or not.
    /// Returns `None` if nothing was ever stored there.
    async fn fetch(&self, id: LinkId) -> Result<Option<LinkRecord>>;

    /// Atomically adds one to the record's click counter and returns the new
    /// count. Must not create a record that does not exist.
    async fn record_click(&self, id: LinkId) -> Result<u64>;
}

#[async_trait]
impl<B: LinkBackend + ?Sized> LinkBackend for std::sync::Arc<B> {
    async fn allocate_id(&self) -> Result<LinkId> {
        (**self).allocate_id().await
    }

    async fn insert(&self, id: LinkId, record: &LinkRecord) -> Result<()> {
        (**self).insert(id, record).await
    }

    async fn fetch(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        (**self).fetch(id).await
    }

    async fn record_click(&self, id: LinkId) -> Result<u64> {
        (**self).record_click(id).await
    }
}
