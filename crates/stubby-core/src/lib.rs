//! Core types and traits for the stubby short-link service.
//!
//! This crate holds the key codec, the record model, the persistence
//! contract implemented by `stubby-storage` and the error kinds shared by
//! the store and the gateway.

pub mod backend;
pub mod clock;
pub mod error;
pub mod key;
pub mod record;

pub use backend::LinkBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{KeyError, LinkError, Result, StorageError};
pub use key::{Key, KeyCodec};
pub use record::{LinkId, LinkInfo, LinkRecord};
