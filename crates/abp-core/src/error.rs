//! Crate-wide error types.

use thiserror::Error;

/// Failures from decoding a binary snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot buffer is too short to contain a header")]
    Truncated,
    #[error("bad magic number: expected {expected:#x}, found {found:#x}")]
    BadMagic { expected: u32, found: u32 },
    #[error("unsupported snapshot format version {found} (this build supports {supported})")]
    UnsupportedVersion { found: u16, supported: u16 },
    #[error("section directory entry {index} points past the end of the buffer")]
    SectionOutOfBounds { index: usize },
    #[error("section {index} failed its CRC-32 check")]
    SectionChecksumMismatch { index: usize },
    #[error("section {index} contains invalid UTF-8")]
    InvalidUtf8 { index: usize },
    #[error("malformed section {index}: {reason}")]
    MalformedSection { index: usize, reason: &'static str },
}

/// Failures from parsing filter-list text.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("io error while reading filter list: {0}")]
    Io(#[from] std::io::Error),
}
