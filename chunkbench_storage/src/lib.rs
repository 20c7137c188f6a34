//! The storage API for the `chunkbench` crate.
//!
//! A store holds a single byte-addressed value, such as one file on disk or an in-memory buffer.
//! The container engine lays its superblock, metadata, chunk index, and chunk data out inside that value,
//! so stores only need positional reads and writes.
//!
//! This crate includes a file store and an in-memory store, see [`store`].

pub mod byte_range;
mod storage_sync;
pub mod store;

use std::sync::Arc;

use thiserror::Error;

use byte_range::InvalidByteRangeError;

pub use self::storage_sync::{
    ReadableStorageTraits, ReadableWritableStorageTraits, WritableStorageTraits,
};

/// The type for bytes used in synchronous store get methods.
///
/// An alias for [`bytes::Bytes`].
pub type Bytes = bytes::Bytes;

/// A storage error.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read only store.
    #[error("a write operation was attempted on a read only store")]
    ReadOnly,
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// An invalid byte range.
    #[error(transparent)]
    InvalidByteRangeError(#[from] InvalidByteRangeError),
    /// The store has been closed.
    #[error("the store has been closed")]
    Closed,
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

impl From<&str> for StorageError {
    fn from(err_string: &str) -> Self {
        Self::Other(err_string.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err_string: String) -> Self {
        Self::Other(err_string)
    }
}
