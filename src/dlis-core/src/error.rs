use thiserror::Error;

use crate::table::Fingerprint;

/// Errors raised while parsing a DLIS file.
///
/// Parse errors abort the record currently being processed; they do not
/// poison the handle. Callers may continue by calling [`crate::file::Handle::reindex`]
/// or [`crate::file::Handle::extract`] to work around the offending record.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage unit label buffer to small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("unable to parse storage unit label version {0:?}, only V1.00 is supported")]
    UnsupportedVersion(String),

    #[error("malformed visible record: {0}")]
    MalformedVr(String),

    #[error("malformed logical record segment: {0}")]
    MalformedLrs(String),

    #[error("unexpected end of input")]
    Truncated,

    #[error("unknown representation code {0}")]
    UnknownReprc(u8),

    #[error("dangling reference to {0}")]
    DanglingReference(Fingerprint),

    #[error("logical record is encrypted, cannot decode contents")]
    Encrypted,

    #[error("handle has been closed")]
    Closed,

    #[error("duplicate object {0} in object table")]
    DuplicateFingerprint(Fingerprint),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
