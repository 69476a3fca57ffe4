//! Error taxonomy shared by every asset decoder.

use std::fmt;

use thiserror::Error;

/// Category of a decode failure, without the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Declared sizes, offsets or counts are not self-consistent.
    MalformedHeader,
    /// A declared region is missing bytes at the end of the stream.
    UnexpectedEof,
    /// Recognized format variant that is not implemented.
    Unsupported,
    /// Palette or geometry reference outside its table.
    OutOfRange,
    /// The allocator refused a buffer.
    Allocation,
    /// Failure of the underlying stream (open, seek).
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedHeader => "malformed-header",
            ErrorKind::UnexpectedEof => "unexpected-end-of-stream",
            ErrorKind::Unsupported => "unsupported-format",
            ErrorKind::OutOfRange => "out-of-range-index",
            ErrorKind::Allocation => "allocation-failure",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("unexpected end of stream: {0}")]
    UnexpectedEof(String),
    #[error("unsupported format: {0}")]
    Unsupported(String),
    #[error("out-of-range index: {0}")]
    OutOfRange(String),
    #[error("failed to allocate {size} bytes for {what}")]
    Allocation { size: usize, what: &'static str },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::MalformedHeader(_) => ErrorKind::MalformedHeader,
            DecodeError::UnexpectedEof(_) => ErrorKind::UnexpectedEof,
            DecodeError::Unsupported(_) => ErrorKind::Unsupported,
            DecodeError::OutOfRange(_) => ErrorKind::OutOfRange,
            DecodeError::Allocation { .. } => ErrorKind::Allocation,
            DecodeError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Allocate `len` default-initialised elements, reporting allocator refusal
/// as [`DecodeError::Allocation`] instead of aborting.
pub fn alloc_zeroed<T: Clone + Default>(len: usize, what: &'static str) -> DecodeResult<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| DecodeError::Allocation {
        size: len.saturating_mul(std::mem::size_of::<T>()),
        what,
    })?;
    buf.resize(len, T::default());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            DecodeError::MalformedHeader("x".into()).kind(),
            ErrorKind::MalformedHeader
        );
        assert_eq!(
            DecodeError::Allocation { size: 4, what: "palette" }.kind(),
            ErrorKind::Allocation
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(DecodeError::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn alloc_zeroed_has_exact_length() {
        let buf: Vec<u16> = alloc_zeroed(7, "palette").expect("small allocation");
        assert_eq!(buf.len(), 7);
        assert!(buf.iter().all(|&v| v == 0));
    }

    #[test]
    fn alloc_zeroed_reports_refusal() {
        let err = alloc_zeroed::<u64>(usize::MAX / 4, "pixel data").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Allocation);
    }
}
