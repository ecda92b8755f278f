use crate::error::{KeyError, StorageError};
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Numeric identity of a link, handed out by the backend's durable counter.
///
/// Always in `0..=i64::MAX`; the first allocated identifier is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct LinkId(i64);

impl LinkId {
    pub const MAX: LinkId = LinkId(i64::MAX);

    pub fn new(value: i64) -> Result<Self, KeyError> {
        if value < 0 {
            return Err(KeyError::OutOfRange);
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for LinkId {
    type Error = KeyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LinkId> for i64 {
    fn from(id: LinkId) -> Self {
        id.0
    }
}

impl Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted short link.
///
/// Everything but `clicks` is fixed when the record is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Destination of the redirect.
    pub url: String,
    pub created_at: Timestamp,
    /// `None` means the link never expires.
    pub expires_at: Option<Timestamp>,
    /// Number of successful redirect lookups.
    pub clicks: u64,
}

impl LinkRecord {
    /// Creates a record that has not been clicked yet.
    pub fn new(url: impl Into<String>, created_at: Timestamp, expires_at: Option<Timestamp>) -> Self {
        Self {
            url: url.into(),
            created_at,
            expires_at,
            clicks: 0,
        }
    }

    /// A record is live iff it never expires or its expiry is still ahead of `now`.
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }

    /// Whole seconds left until expiry, rounded up.
    ///
    /// Returns 0 for links that never expire and for links already expired,
    /// so callers must check [`LinkRecord::is_live_at`] first.
    pub fn remaining_ttl_secs(&self, now: Timestamp) -> u64 {
        let Some(expires_at) = self.expires_at else {
            return 0;
        };
        let remaining = expires_at.duration_since(now);
        if remaining <= SignedDuration::ZERO {
            return 0;
        }
        let secs = remaining.as_secs() as u64;
        if remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    /// Snapshot of this record as reported by the info operation.
    pub fn info_at(&self, now: Timestamp) -> LinkInfo {
        LinkInfo {
            url: self.url.clone(),
            ttl: self.remaining_ttl_secs(now),
            clicks: self.clicks,
            created_at: self.created_at,
        }
    }
}

/// Metadata snapshot of a live link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkInfo {
    pub url: String,
    /// Remaining lifetime in seconds; 0 means unlimited.
    pub ttl: u64,
    pub clicks: u64,
    pub created_at: Timestamp,
}

/// Persisted form of an expiry: unix seconds, with 0 meaning "never".
pub fn expiry_to_unix(expires_at: Option<Timestamp>) -> i64 {
    expires_at.map_or(0, |ts| ts.as_second())
}

/// Reverse of [`expiry_to_unix`].
pub fn expiry_from_unix(seconds: i64) -> Result<Option<Timestamp>, StorageError> {
    if seconds == 0 {
        return Ok(None);
    }
    timestamp_from_unix(seconds).map(Some)
}

pub fn timestamp_from_unix(seconds: i64) -> Result<Timestamp, StorageError> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid unix timestamp '{}': {e}", seconds))
    })
}
