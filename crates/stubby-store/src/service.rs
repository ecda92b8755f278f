use crate::store::LinkStore;
use async_trait::async_trait;
use jiff::SignedDuration;
use stubby_core::{Clock, Key, LinkBackend, LinkError, LinkInfo};

type Result<T> = std::result::Result<T, LinkError>;

/// Object-safe view of a [`LinkStore`], so callers such as HTTP handlers can
/// hold one behind `Arc<dyn LinkService>` whatever its backend.
#[async_trait]
pub trait LinkService: Send + Sync + 'static {
    /// Stores a URL and returns its key. A non-positive `ttl` never expires.
    async fn save(&self, url: &str, ttl: SignedDuration) -> Result<Key>;

    /// Resolves a key for a redirect, counting the click.
    async fn lookup(&self, key: &str) -> Result<String>;

    /// Returns the metadata of a live link without counting a click.
    async fn info(&self, key: &str) -> Result<LinkInfo>;
}

#[async_trait]
impl<B: LinkBackend, C: Clock> LinkService for LinkStore<B, C> {
    async fn save(&self, url: &str, ttl: SignedDuration) -> Result<Key> {
        LinkStore::save(self, url, ttl).await
    }

    async fn lookup(&self, key: &str) -> Result<String> {
        LinkStore::lookup(self, key).await
    }

    async fn info(&self, key: &str) -> Result<LinkInfo> {
        LinkStore::info(self, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stubby_storage::InMemoryBackend;

    #[tokio::test]
    async fn store_is_usable_as_trait_object() {
        let service: Arc<dyn LinkService> = Arc::new(LinkStore::new(InMemoryBackend::new()));

        let key = service
            .save("https://example.org", SignedDuration::ZERO)
            .await
            .unwrap();
        assert_eq!(service.lookup(key.as_str()).await.unwrap(), "https://example.org");
        assert_eq!(service.info(key.as_str()).await.unwrap().clicks, 1);
    }
}
