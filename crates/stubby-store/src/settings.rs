use std::time::Duration;
use typed_builder::TypedBuilder;

/// Longest destination URL accepted by default, in bytes.
pub const DEFAULT_MAX_URL_LENGTH: usize = 2048;

/// What a lookup does when the URL was found live but counting the click
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickFailurePolicy {
    /// Return the URL anyway and log the failed increment.
    #[default]
    BestEffort,
    /// Fail the whole lookup with the backend error.
    Strict,
}

/// Tunables of a [`LinkStore`](crate::LinkStore).
#[derive(Debug, Clone, TypedBuilder)]
pub struct StoreSettings {
    /// Inclusive upper bound on the URL length in bytes.
    #[builder(default = DEFAULT_MAX_URL_LENGTH)]
    pub max_url_length: usize,

    #[builder(default)]
    pub click_failure: ClickFailurePolicy,

    /// Deadline applied to each backend call. `None` waits as long as the
    /// backend client does.
    #[builder(default, setter(strip_option))]
    pub operation_timeout: Option<Duration>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}
