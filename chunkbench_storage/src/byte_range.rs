//! Byte ranges within a stored value.
//!
//! The container engine reads its superblock, metadata, chunk index, and individual chunks
//! as [`ByteRange`]s of the single value held by a store.

use std::ops::Range;

use thiserror::Error;

/// A byte offset.
pub type ByteOffset = u64;

/// A byte length.
pub type ByteLength = u64;

/// A byte range.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ByteRange {
    /// `length` bytes at `offset`, or every byte from `offset` if the length is [`None`].
    FromStart(ByteOffset, Option<ByteLength>),
    /// The last `length` bytes.
    Suffix(ByteLength),
}

impl From<Range<u64>> for ByteRange {
    fn from(range: Range<u64>) -> Self {
        Self::FromStart(range.start, Some(range.end.saturating_sub(range.start)))
    }
}

impl ByteRange {
    /// The first byte of the range in a value of `size` bytes.
    #[must_use]
    pub fn start(&self, size: u64) -> u64 {
        match self {
            Self::FromStart(offset, _) => *offset,
            Self::Suffix(length) => size.saturating_sub(*length),
        }
    }

    /// The exclusive end of the range in a value of `size` bytes.
    #[must_use]
    pub fn end(&self, size: u64) -> u64 {
        match self {
            Self::FromStart(offset, Some(length)) => offset.saturating_add(*length),
            Self::FromStart(_, None) | Self::Suffix(_) => size,
        }
    }

    /// The number of bytes in the range in a value of `size` bytes.
    #[must_use]
    pub fn length(&self, size: u64) -> u64 {
        self.end(size).saturating_sub(self.start(size))
    }

    /// The range as offsets into a value of `size` bytes.
    #[must_use]
    pub fn to_range(&self, size: u64) -> Range<u64> {
        self.start(size)..self.end(size)
    }

    /// Returns true if the range lies within a value of `size` bytes.
    #[must_use]
    pub fn is_valid(&self, size: u64) -> bool {
        match self {
            Self::FromStart(offset, None) => *offset <= size,
            Self::FromStart(offset, Some(length)) => {
                offset.checked_add(*length).is_some_and(|end| end <= size)
            }
            Self::Suffix(length) => *length <= size,
        }
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FromStart(offset, None) => write!(f, "{offset}.."),
            Self::FromStart(offset, Some(length)) => {
                write!(f, "{offset}..{}", offset.saturating_add(*length))
            }
            Self::Suffix(length) => write!(f, "-{length}.."),
        }
    }
}

/// A byte range does not fit the stored value.
#[derive(Copy, Clone, Debug, Error)]
#[error("byte range {range} is out of bounds for a value of {size} bytes")]
pub struct InvalidByteRangeError {
    range: ByteRange,
    size: u64,
}

impl InvalidByteRangeError {
    /// Create a new [`InvalidByteRangeError`].
    #[must_use]
    pub fn new(range: ByteRange, size: u64) -> Self {
        Self { range, size }
    }
}
