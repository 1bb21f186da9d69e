//! Error types for ZIM archive operations

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Result type for ZIM operations
pub type Result<T> = std::result::Result<T, ZimError>;

/// ZIM error types
///
/// The enum is `Clone` so a blob reader can cache its first loading
/// failure and hand it back from every later operation. I/O causes are
/// wrapped in `Arc` to keep that possible.
#[derive(Error, Debug, Clone)]
pub enum ZimError {
    /// Underlying byte source failed
    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// Structurally invalid archive data
    #[error("malformed archive: {0}")]
    Malformed(String),

    /// Entry, cluster, or redirect target index out of bounds
    #[error("index {index} out of bounds (limit {limit})")]
    InvalidIndex { index: u64, limit: u64 },

    /// Requested URL, title, or main page is absent
    #[error("entry not found")]
    NotFound,

    /// Redirect chain does not terminate at a content entry
    #[error("invalid redirect: {0}")]
    InvalidRedirect(String),

    /// Cluster uses a codec outside the supported set
    #[error("compression algorithm {0} not supported")]
    CompressionUnsupported(u8),

    /// Operation on a closed archive or reader
    #[error("archive is closed")]
    Closed,
}

impl From<io::Error> for ZimError {
    fn from(err: io::Error) -> Self {
        ZimError::Io(Arc::new(err))
    }
}

impl ZimError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ZimError::Malformed(msg.into())
    }

    /// True when the error means "nothing there", as opposed to a broken
    /// archive or a failed read. Callers use this for fallback chains.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ZimError::NotFound)
    }
}
