//! Unified error types for the offline layer.
//!
//! Each variant renders with a stable code prefix so hosts and logs can
//! match on it without parsing free text.

use tokio_rusqlite::rusqlite;

/// Unified error types for the offline layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty sync tag).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unresolvable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Writing the entry would exceed the storage quota.
    #[error("QUOTA_EXCEEDED: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },

    /// Network unreachable, DNS failure, connection reset.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Static or offline asset could not be cached during install.
    #[error("INSTALL_FAILED: {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    /// Lifecycle transition requested from the wrong state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// A background sync replay reported failure.
    #[error("SYNC_FAILED: {tag}: {reason}")]
    SyncFailed { tag: String, reason: String },

    /// The host could not display or route a notification.
    #[error("NOTIFICATION_ERROR: {0}")]
    Notification(String),
}

impl Error {
    /// Whether the error means the network could not deliver a response.
    ///
    /// These are the failures the fetch strategies recover from by falling
    /// back to the cache or an offline response.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_))
    }

    /// Stable code used in the display prefix.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => "CACHE_ERROR",
            Error::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Error::Network(_) => "NETWORK_ERROR",
            Error::FetchTimeout(_) => "FETCH_TIMEOUT",
            Error::FetchTooLarge(_) => "FETCH_TOO_LARGE",
            Error::InstallFailed { .. } => "INSTALL_FAILED",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::SyncFailed { .. } => "SYNC_FAILED",
            Error::Notification(_) => "NOTIFICATION_ERROR",
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
