use crate::types::SourceId;
use std::fmt;

/// Failure of a single source adapter.
///
/// Cloneable because a settled result (success or failure) is cached in a
/// memo cell and handed out to every caller for the rest of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure, including timeouts.
    Network(String),
    /// The response arrived but its shape violated the expected schema.
    Parse(String),
    /// The provider explicitly throttled us.
    RateLimited,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "network error: {}", msg),
            FetchError::Parse(msg) => write!(f, "unexpected response shape: {}", msg),
            FetchError::RateLimited => write!(f, "rate limited by provider"),
        }
    }
}

impl std::error::Error for FetchError {}

/// A regeneration cycle failed because a source classified as critical
/// failed. Best-effort failures never produce this; they degrade the
/// payload instead.
#[derive(Debug, Clone)]
pub struct CycleError {
    pub source: SourceId,
    pub error: FetchError,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle failed: critical source '{}' failed: {}",
            self.source, self.error
        )
    }
}

impl std::error::Error for CycleError {}

#[derive(Debug)]
pub enum Error {
    ConfigParse(String),
    IoError(std::io::Error),
    InvalidData(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigParse(msg) => write!(f, "Configuration parse error: {}", msg),
            Error::IoError(err) => write!(f, "IO error: {}", err),
            Error::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
