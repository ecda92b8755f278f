use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use stubby_core::LinkInfo;

/// Body of `POST /`.
#[derive(Debug, Deserialize)]
pub struct SaveLinkRequest {
    /// The URL to shorten.
    pub url: String,
    /// Lifetime in seconds. A positive value takes precedence over `expires`.
    #[serde(default)]
    pub ttl: Option<i64>,
    /// Absolute expiry, RFC 3339.
    #[serde(default)]
    pub expires: Option<Timestamp>,
}

impl SaveLinkRequest {
    /// Lifetime to hand to the store, never negative.
    ///
    /// A positive `ttl` wins; otherwise `expires` is turned into the time
    /// left from `now`. Deadlines in the past and absent fields both give
    /// zero, which the store reads as "never expires".
    pub fn ttl_at(&self, now: Timestamp) -> SignedDuration {
        let ttl = match (self.ttl, self.expires) {
            (Some(secs), _) if secs > 0 => SignedDuration::from_secs(secs),
            (_, Some(expires)) => expires.duration_since(now),
            _ => SignedDuration::ZERO,
        };
        ttl.max(SignedDuration::ZERO)
    }
}

#[derive(Debug, Serialize)]
pub struct SaveLinkResponse {
    /// The shortened URL.
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct LinkInfoResponse {
    pub url: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub ttl: u64,
    pub click_count: u64,
    pub created: Timestamp,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl From<LinkInfo> for LinkInfoResponse {
    fn from(info: LinkInfo) -> Self {
        Self {
            url: info.url,
            ttl: info.ttl,
            click_count: info.clicks,
            created: info.created_at,
        }
    }
}
