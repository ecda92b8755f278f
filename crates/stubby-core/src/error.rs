use thiserror::Error;

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures of the persistence dependency.
///
/// None of these are retried by the link store; they are surfaced to the
/// caller, which owns any retry policy.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Reasons a key string cannot be turned back into an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key is empty")]
    Empty,
    #[error("key is {len} characters long, at most {max} are allowed")]
    TooLong { len: usize, max: usize },
    #[error("key contains illegal character {0:?}")]
    IllegalCharacter(char),
    #[error("key is not a canonical encoding")]
    Malformed,
    #[error("key decodes to an identifier out of range")]
    OutOfRange,
}

/// Outcome kinds of the link store operations.
///
/// Everything but [`LinkError::Backend`] is an expected result the caller
/// maps to a client-facing response.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),
    #[error("link not found")]
    NotFound,
    #[error("link expired")]
    Expired,
    #[error("backend failure: {0}")]
    Backend(
        #[from]
        #[source]
        StorageError,
    ),
}

impl LinkError {
    /// Whether this error is a normal domain outcome rather than a failure
    /// of the persistence dependency.
    pub fn is_expected(&self) -> bool {
        !matches!(self, LinkError::Backend(_))
    }
}
