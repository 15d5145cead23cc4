//! Error types for U3D bitstream coding and block framing.
//!
//! This module provides the [`U3dError`] type which covers every failure the
//! arithmetic coder, the primitive readers/writers and the block framing can
//! report.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Stream | [`StreamExhausted`] | Read past the end of a block's data words |
//! | Model | [`ContextOverflow`] | Frequency table cannot represent the request |
//! | Coder | [`InvariantViolation`] | Encoder/decoder disagreement on the interval |
//! | Framing | [`BufferTooSmall`], [`InvalidString`], [`Io`] | Container and I/O errors |
//!
//! ## Example
//!
//! ```rust
//! use u3d_bitstream::{BlockReader, ContextRegistry, U3dError};
//!
//! let mut contexts = ContextRegistry::new();
//! let mut reader = BlockReader::new(&[], &mut contexts);
//! match reader.read_u32() {
//!     Err(U3dError::StreamExhausted { .. }) => {}
//!     other => panic!("expected exhaustion, got {:?}", other),
//! }
//! ```
//!
//! [`StreamExhausted`]: U3dError::StreamExhausted
//! [`ContextOverflow`]: U3dError::ContextOverflow
//! [`InvariantViolation`]: U3dError::InvariantViolation
//! [`BufferTooSmall`]: U3dError::BufferTooSmall
//! [`InvalidString`]: U3dError::InvalidString
//! [`Io`]: U3dError::Io

use std::fmt;
use std::io;

/// Error type for U3D coding operations.
///
/// None of these are recoverable for the call that produced them. A reader or
/// writer session that returned an error must be discarded; the coder never
/// substitutes a value.
#[derive(Debug)]
pub enum U3dError {
    /// A read started at or past the end of the data words, or a decode
    /// consumed more bits than the block holds.
    ///
    /// Usually means the block is truncated or was written with a different
    /// sequence of contexts than the one being read.
    StreamExhausted {
        /// Bit position of the failing access.
        position: u64,
        /// Total number of bits in the stream.
        length: u64,
    },

    /// A context's total frequency would leave the range the 16-bit interval
    /// arithmetic can split without producing empty sub-intervals.
    ContextOverflow {
        /// Context id.
        context: u32,
        /// The total that was rejected.
        total: u32,
    },

    /// The arithmetic interval broke `0 <= low <= high <= 0xFFFF`, or a code
    /// word fell outside it.
    ///
    /// Always an encoder/decoder mismatch, never something a retry can fix.
    InvariantViolation {
        low: u32,
        high: u32,
        detail: &'static str,
    },

    /// A string read from the stream is not valid UTF-8.
    InvalidString,

    /// The provided buffer is too small to hold the block being parsed.
    BufferTooSmall {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        have: usize,
    },

    /// An I/O error occurred while loading a U3D file.
    Io(io::Error),
}

impl fmt::Display for U3dError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamExhausted { position, length } => write!(
                f,
                "Bit stream exhausted at bit {} (stream length: {} bits)",
                position, length
            ),
            Self::ContextOverflow { context, total } => write!(
                f,
                "Context {} frequency total {} exceeds coder precision",
                context, total
            ),
            Self::InvariantViolation { low, high, detail } => write!(
                f,
                "Arithmetic coder invariant violated ({}): low=0x{:04x}, high=0x{:04x}",
                detail, low, high
            ),
            Self::InvalidString => write!(f, "String is not valid UTF-8"),
            Self::BufferTooSmall { needed, have } => {
                write!(f, "Buffer too small: need {} bytes, have {}", needed, have)
            }
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for U3dError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for U3dError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, U3dError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_stream_exhausted() {
        let err = U3dError::StreamExhausted {
            position: 64,
            length: 64,
        };
        assert_eq!(
            err.to_string(),
            "Bit stream exhausted at bit 64 (stream length: 64 bits)"
        );
    }

    #[test]
    fn test_io_source() {
        use std::error::Error;

        let err = U3dError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert!(U3dError::InvalidString.source().is_none());
    }
}
