use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use stubby_core::error::{Result, StorageError};
use stubby_core::{LinkBackend, LinkId, LinkRecord};

/// In-memory implementation of [`LinkBackend`] using DashMap.
///
/// The counter is an atomic and records live in a sharded map, so inserts
/// and click increments on different links never contend on one lock.
/// Nothing survives the process; use it for tests and single-node demos.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    counter: AtomicI64,
    records: DashMap<LinkId, LinkRecord>,
}

impl InMemoryBackend {
    /// Creates an empty backend whose first allocated id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend whose counter already stands at `last_id`,
    /// so the next allocated id is `last_id + 1`.
    pub fn with_counter(last_id: i64) -> Self {
        Self {
            counter: AtomicI64::new(last_id),
            records: DashMap::new(),
        }
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl LinkBackend for InMemoryBackend {
    async fn allocate_id(&self) -> Result<LinkId> {
        let previous = self.counter.fetch_add(1, Ordering::SeqCst);
        let next = previous
            .checked_add(1)
            .ok_or_else(|| StorageError::Operation("id counter exhausted".to_string()))?;
        LinkId::new(next).map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    async fn insert(&self, id: LinkId, record: &LinkRecord) -> Result<()> {
        match self.records.entry(id) {
            Entry::Occupied(_) => Err(StorageError::Conflict(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn fetch(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn record_click(&self, id: LinkId) -> Result<u64> {
        // the shard write lock makes the read-add-write a single step
        let Some(mut entry) = self.records.get_mut(&id) else {
            return Err(StorageError::Operation(format!(
                "cannot count click for missing record {id}"
            )));
        };
        entry.clicks += 1;
        Ok(entry.clicks)
    }
}
