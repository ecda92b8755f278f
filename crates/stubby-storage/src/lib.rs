//! Persistence backends for the stubby link store.
//!
//! Each backend implements [`LinkBackend`] on top of the atomic primitives
//! its store offers natively: an atomic counter for id allocation, a single
//! multi-field write per record and an atomic per-record add for clicks.

pub mod memory;
pub mod redis;
pub mod sqlite;

pub use self::memory::InMemoryBackend;
pub use self::redis::RedisBackend;
pub use self::sqlite::SqliteBackend;
pub use stubby_core::{LinkBackend, StorageError};
