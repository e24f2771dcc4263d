#![forbid(unsafe_code)]

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////

/// Errors produced while opening or decoding a compressed stream.
///
/// Every decode-time error is fatal to the stream it came from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not in gzip or zip format")]
    BadMagic,

    #[error("unsupported compression method {0}")]
    UnsupportedMethod(u16),

    #[error("entry is encrypted")]
    Encrypted,

    #[error("multi-part gzip files are not supported")]
    MultiPartUnsupported,

    #[error("reserved header flags set: {0:#04x}")]
    ReservedFlags(u8),

    #[error("bad huffman table: {0}")]
    BadHuffmanTable(&'static str),

    #[error("invalid block type")]
    InvalidBlockType,

    #[error("distance {distance} exceeds the {available} bytes of history")]
    InvalidDistance { distance: usize, available: usize },

    #[error("out of memory")]
    OutOfMemory,

    #[error("crc32 check failed: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("length check failed: expected {expected}, got {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("unexpected end of compressed data")]
    TruncatedInput,

    #[error(transparent)]
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Produces an equivalent error to hand out again after a stream failed.
    ///
    /// I/O errors are not clonable, so they are rebuilt from kind and message.
    pub fn duplicate(&self) -> Self {
        match self {
            Self::BadMagic => Self::BadMagic,
            Self::UnsupportedMethod(m) => Self::UnsupportedMethod(*m),
            Self::Encrypted => Self::Encrypted,
            Self::MultiPartUnsupported => Self::MultiPartUnsupported,
            Self::ReservedFlags(f) => Self::ReservedFlags(*f),
            Self::BadHuffmanTable(why) => Self::BadHuffmanTable(why),
            Self::InvalidBlockType => Self::InvalidBlockType,
            Self::InvalidDistance {
                distance,
                available,
            } => Self::InvalidDistance {
                distance: *distance,
                available: *available,
            },
            Self::OutOfMemory => Self::OutOfMemory,
            Self::CrcMismatch { expected, actual } => Self::CrcMismatch {
                expected: *expected,
                actual: *actual,
            },
            Self::LengthMismatch { expected, actual } => Self::LengthMismatch {
                expected: *expected,
                actual: *actual,
            },
            Self::TruncatedInput => Self::TruncatedInput,
            Self::Io(err) => Self::Io(io::Error::new(err.kind(), err.to_string())),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::TruncatedInput,
            _ => Self::Io(err),
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            Error::TruncatedInput => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Allocates a zeroed buffer, reporting allocation failure instead of aborting.
pub(crate) fn zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, 0);
    Ok(buf)
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_becomes_truncation() {
        let err: Error = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, Error::TruncatedInput));

        let err: Error = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn duplicate_keeps_details() {
        let err = Error::CrcMismatch {
            expected: 1,
            actual: 2,
        };
        assert_eq!(err.duplicate().to_string(), err.to_string());

        let err = Error::Io(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        let copy = err.duplicate();
        assert_eq!(copy.to_string(), "disk on fire");
        assert!(matches!(copy, Error::Io(e) if e.kind() == io::ErrorKind::Other));
    }

    #[test]
    fn io_conversion() {
        let err: io::Error = Error::BadMagic.into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let err: io::Error = Error::TruncatedInput.into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
