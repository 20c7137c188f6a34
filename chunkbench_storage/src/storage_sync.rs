use auto_impl::auto_impl;

use super::{
    byte_range::{ByteOffset, ByteRange},
    Bytes, StorageError,
};

/// Readable storage traits.
#[auto_impl(Arc)]
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the entire stored value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn get(&self) -> Result<Bytes, StorageError> {
        self.get_byte_range(ByteRange::FromStart(0, None))
    }

    /// Retrieve partial bytes of the stored value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the byte range is out of bounds or there is an underlying storage error.
    fn get_byte_range(&self, byte_range: ByteRange) -> Result<Bytes, StorageError>;

    /// Return the size in bytes of the stored value.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn size(&self) -> Result<u64, StorageError>;
}

/// Writable storage traits.
#[auto_impl(Arc)]
pub trait WritableStorageTraits: Send + Sync {
    /// Write `value` at `offset`, growing the stored value if required.
    ///
    /// A gap between the current end of the value and `offset` is zero filled.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store is read only or there is an underlying storage error.
    fn set_partial(&self, offset: ByteOffset, value: &[u8]) -> Result<(), StorageError>;

    /// Truncate or extend the stored value to `size` bytes.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the store is read only or there is an underlying storage error.
    fn set_size(&self, size: u64) -> Result<(), StorageError>;

    /// Flush any buffered writes to the underlying medium.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn flush(&self) -> Result<(), StorageError>;

    /// Flush and release the underlying medium.
    ///
    /// Errors that the medium only reports on release are returned here.
    /// The default implementation calls [`flush`](WritableStorageTraits::flush).
    ///
    /// # Errors
    /// Returns a [`StorageError`] if flushing or releasing the medium fails.
    fn close(&self) -> Result<(), StorageError> {
        self.flush()
    }
}

/// A supertrait of [`ReadableStorageTraits`] and [`WritableStorageTraits`].
pub trait ReadableWritableStorageTraits: ReadableStorageTraits + WritableStorageTraits {}

impl<T> ReadableWritableStorageTraits for T where
    T: ?Sized + ReadableStorageTraits + WritableStorageTraits
{
}
