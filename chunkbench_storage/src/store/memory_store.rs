//! A synchronous in-memory store.

use bytes::BytesMut;
use parking_lot::RwLock;

use crate::byte_range::{ByteOffset, ByteRange, InvalidByteRangeError};
use crate::{Bytes, ReadableStorageTraits, StorageError, WritableStorageTraits};

/// A synchronous in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BytesMut>,
}

impl MemoryStore {
    /// Create a new, empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store holding a copy of `value`.
    #[must_use]
    pub fn new_with_value(value: &[u8]) -> Self {
        Self {
            data: RwLock::new(BytesMut::from(value)),
        }
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get_byte_range(&self, byte_range: ByteRange) -> Result<Bytes, StorageError> {
        let data = self.data.read();
        let size = data.len() as u64;
        if !byte_range.is_valid(size) {
            return Err(InvalidByteRangeError::new(byte_range, size).into());
        }
        let range = byte_range.to_range(size);
        let start = usize::try_from(range.start).map_err(|err| err.to_string())?;
        let end = usize::try_from(range.end).map_err(|err| err.to_string())?;
        Ok(Bytes::copy_from_slice(&data[start..end]))
    }

    fn size(&self) -> Result<u64, StorageError> {
        Ok(self.data.read().len() as u64)
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set_partial(&self, offset: ByteOffset, value: &[u8]) -> Result<(), StorageError> {
        let offset = usize::try_from(offset).map_err(|err| err.to_string())?;
        let end = offset + value.len();
        let mut data = self.data.write();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(value);
        Ok(())
    }

    fn set_size(&self, size: u64) -> Result<(), StorageError> {
        let size = usize::try_from(size).map_err(|err| err.to_string())?;
        self.data.write().resize(size, 0);
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
