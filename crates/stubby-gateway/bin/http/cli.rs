use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;
use stubby_store::{ClickFailurePolicy, DEFAULT_MAX_URL_LENGTH};

pub const LISTEN_ADDR_ENV: &str = "STUBBY_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "STUBBY_STORAGE_BACKEND";
pub const REDIS_URL_ENV: &str = "STUBBY_REDIS_URL";
pub const REDIS_PREFIX_ENV: &str = "STUBBY_REDIS_PREFIX";
pub const SQLITE_URL_ENV: &str = "STUBBY_SQLITE_URL";
pub const MAX_URL_LENGTH_ENV: &str = "STUBBY_MAX_URL_LENGTH";
pub const CLICK_FAILURE_ENV: &str = "STUBBY_CLICK_FAILURE";
pub const OPERATION_TIMEOUT_ENV: &str = "STUBBY_OPERATION_TIMEOUT_MS";
pub const EXPOSE_INFO_ENV: &str = "STUBBY_EXPOSE_INFO";
pub const PUBLIC_BASE_URL_ENV: &str = "STUBBY_PUBLIC_BASE_URL";
pub const LOG_FORMAT_ENV: &str = "STUBBY_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
    #[value(name = "sqlite")]
    Sqlite,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Redis => write!(f, "redis"),
            StorageBackendArg::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClickFailureArg {
    #[value(name = "best-effort")]
    BestEffort,
    #[value(name = "strict")]
    Strict,
}

impl From<ClickFailureArg> for ClickFailurePolicy {
    fn from(arg: ClickFailureArg) -> Self {
        match arg {
            ClickFailureArg::BestEffort => ClickFailurePolicy::BestEffort,
            ClickFailureArg::Strict => ClickFailurePolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "stubby")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    #[arg(
        long,
        env = REDIS_PREFIX_ENV,
        default_value = stubby_storage::redis::DEFAULT_KEY_PREFIX
    )]
    pub redis_prefix: String,

    #[arg(long, env = SQLITE_URL_ENV, required_if_eq("storage", "sqlite"))]
    pub sqlite_url: Option<String>,

    #[arg(long, env = MAX_URL_LENGTH_ENV, default_value_t = DEFAULT_MAX_URL_LENGTH)]
    pub max_url_length: usize,

    #[arg(
        long,
        env = CLICK_FAILURE_ENV,
        value_enum,
        default_value_t = ClickFailureArg::BestEffort
    )]
    pub click_failure: ClickFailureArg,

    /// Upper bound on each backend round-trip, in milliseconds.
    #[arg(long, env = OPERATION_TIMEOUT_ENV)]
    pub operation_timeout_ms: Option<u64>,

    #[arg(long, env = EXPOSE_INFO_ENV)]
    pub expose_info: bool,

    #[arg(long, env = PUBLIC_BASE_URL_ENV)]
    pub public_base_url: Option<String>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

impl CLI {
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }
}
