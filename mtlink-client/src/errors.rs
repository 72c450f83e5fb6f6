//! Error types for mtlink-client.

use std::fmt;
use std::io;

// ─── ErrorDetails ─────────────────────────────────────────────────────────────

/// Why a connect operation failed.
///
/// `code` carries the transport's socket error code when the failure came
/// from the socket; sequencing failures only carry text.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorDetails {
    pub code: Option<i32>,
    pub text: String,
}

impl ErrorDetails {
    pub fn text(text: impl Into<String>) -> Self {
        Self { code: None, text: text.into() }
    }

    pub fn socket(code: i32, text: impl Into<String>) -> Self {
        Self { code: Some(code), text: text.into() }
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.text),
            None       => f.write_str(&self.text),
        }
    }
}

impl std::error::Error for ErrorDetails {}

// ─── ClientError ──────────────────────────────────────────────────────────────

/// Misuse of the client API or a failure reaching a DC.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The DC option can only be changed while disconnected.
    #[error("cannot change the DC option while the connection is active")]
    ConnectionActive,
    /// A redirect or lookup named a DC missing from the configuration.
    #[error("DC {0} is not in the configuration")]
    UnknownDc(u32),
    /// No connection exists for the home DC.
    #[error("no connection to the home DC {0}")]
    NoHomeConnection(u32),
    /// The home connection has not negotiated a key yet.
    #[error("no auth key to export")]
    NoAuthKey,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ─── StorageError ─────────────────────────────────────────────────────────────

/// Failure to persist or restore account credentials.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The storage has no file name (or is in-memory).
    #[error("no file name is set")]
    NoFileName,
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The file does not start with the expected magic tag.
    #[error("file is not an account storage file")]
    BadMagic,
    /// The file ended before every field was read.
    #[error("account storage file is truncated")]
    Truncated,
}

impl From<mtlink_tl::deserialize::Error> for StorageError {
    fn from(_: mtlink_tl::deserialize::Error) -> Self {
        Self::Truncated
    }
}
