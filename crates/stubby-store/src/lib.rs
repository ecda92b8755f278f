//! Link store: identifier allocation, expiry and click counting.
//!
//! [`LinkStore`] is the single entry point used by the gateway. It wraps a
//! [`LinkBackend`](stubby_core::LinkBackend) from `stubby-storage` and owns
//! the policies layered on top of it: the URL length limit, the
//! "non-positive ttl never expires" rule, liveness checks on every read and
//! the handling of failed click increments.

pub mod service;
pub mod settings;
pub mod store;

pub use service::LinkService;
pub use settings::{ClickFailurePolicy, StoreSettings, DEFAULT_MAX_URL_LENGTH};
pub use store::LinkStore;
pub use stubby_core::{Key, LinkError, LinkInfo};
