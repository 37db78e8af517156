use thiserror::Error;

use crate::jpeg::JPEGMarker;

/// Result of a header read
pub type Result<T> = core::result::Result<T, Error>;

/// Describes an error encountered while reading the header segments of an image.
///
/// Every variant carries the byte offset at which the problem was detected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A read needed more bytes than the buffer holds. The image is truncated or corrupt.
    #[error("read of {requested} bytes at offset {offset} exceeds the {available} bytes remaining")]
    OutOfBounds {
        /// Offset of the attempted read
        offset: usize,
        /// Number of bytes the read needed
        requested: usize,
        /// Number of bytes left in the buffer at `offset`
        available: usize,
    },
    /// The data does not start with a start of image marker, so it is not a JPEG.
    #[error("not a JPEG image at offset {offset}: {reason}")]
    InvalidContainer {
        /// Offset of the failed check
        offset: usize,
        /// How the container is invalid
        reason: &'static str,
    },
    /// The bytes at `offset` are not the marker that was required there.
    #[error("invalid marker {:02X} {:02X} at offset {offset} (expected {expected:?})", .actual[0], .actual[1])]
    InvalidMarker {
        /// Offset of the marker's leading byte
        offset: usize,
        /// The marker that was required, if a specific one was
        expected: Option<JPEGMarker>,
        /// The two bytes found instead
        actual: [u8; 2],
    },
    /// A segment violates the layout its marker prescribes. The string describes how.
    #[error("malformed {marker:?} segment at offset {offset}: {reason}")]
    MalformedSegment {
        /// Offset of the offending field
        offset: usize,
        /// Marker of the segment being parsed
        marker: JPEGMarker,
        /// How the segment is malformed
        reason: &'static str,
    },
}

impl Error {
    /// The byte offset at which the problem was detected.
    pub fn offset(&self) -> usize {
        match self {
            Error::OutOfBounds { offset, .. }
            | Error::InvalidContainer { offset, .. }
            | Error::InvalidMarker { offset, .. }
            | Error::MalformedSegment { offset, .. } => *offset,
        }
    }

    pub(crate) fn malformed(marker: JPEGMarker, offset: usize, reason: &'static str) -> Self {
        Error::MalformedSegment {
            offset,
            marker,
            reason,
        }
    }
}
