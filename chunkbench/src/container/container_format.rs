//! The on-disk layout of a container.
//!
//! | offset              | size          | content                                   |
//! |---------------------|---------------|-------------------------------------------|
//! | 0                   | 8             | magic `CHNKBNCH`                          |
//! | 8                   | 4             | format version (`u32` LE)                 |
//! | 12                  | 4             | metadata length `m` (`u32` LE)            |
//! | 16                  | `m`           | [`ContainerMetadata`](super::ContainerMetadata) JSON |
//! | 16 + `m`            | 24 per chunk  | chunk index, C order                      |
//! | index end, 8-aligned|               | chunk data                                |
//!
//! A chunk index entry is a `u64` LE offset, a `u64` LE stored size, a `u32` LE filter mask and 4 reserved bytes.
//! An entry of all zeros is an unallocated chunk.

use chunkbench_codec::FilterMask;

/// The container magic bytes.
pub const MAGIC: &[u8; 8] = b"CHNKBNCH";

/// The container format version.
pub const FORMAT_VERSION: u32 = 1;

/// The size of the superblock.
pub const SUPERBLOCK_SIZE: u64 = 16;

/// The size of a chunk index entry.
pub const INDEX_ENTRY_SIZE: u64 = 24;

/// The alignment of the data region and chunk allocations.
pub const DATA_ALIGNMENT: u64 = 8;

/// The fixed-size container header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Superblock {
    /// The format version.
    pub version: u32,
    /// The length of the metadata JSON.
    pub metadata_len: u32,
}

/// An error decoding a [`Superblock`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SuperblockError {
    /// Fewer than [`SUPERBLOCK_SIZE`] bytes.
    Truncated,
    /// The magic bytes do not match.
    InvalidMagic,
}

impl Superblock {
    /// Encode the superblock.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SUPERBLOCK_SIZE as usize] {
        let mut bytes = [0; SUPERBLOCK_SIZE as usize];
        bytes[..8].copy_from_slice(MAGIC);
        bytes[8..12].copy_from_slice(&self.version.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.metadata_len.to_le_bytes());
        bytes
    }

    /// Decode a superblock.
    ///
    /// # Errors
    /// Returns a [`SuperblockError`] if `bytes` is too short or does not start with [`MAGIC`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SuperblockError> {
        let Some(bytes) = bytes.get(..SUPERBLOCK_SIZE as usize) else {
            return Err(SuperblockError::Truncated);
        };
        if &bytes[..8] != MAGIC {
            return Err(SuperblockError::InvalidMagic);
        }
        Ok(Self {
            version: read_u32(&bytes[8..12]),
            metadata_len: read_u32(&bytes[12..16]),
        })
    }
}

/// The location of a stored chunk.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkIndexEntry {
    /// The byte offset of the chunk in the container.
    pub offset: u64,
    /// The stored (encoded) size of the chunk.
    pub size: u64,
    /// The filters skipped when the chunk was encoded.
    pub filter_mask: FilterMask,
}

impl ChunkIndexEntry {
    /// Returns true if the chunk has been written.
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        *self != Self::default()
    }

    /// Encode the entry.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; INDEX_ENTRY_SIZE as usize] {
        let mut bytes = [0; INDEX_ENTRY_SIZE as usize];
        bytes[..8].copy_from_slice(&self.offset.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.size.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.filter_mask.bits().to_le_bytes());
        bytes
    }

    /// Decode an entry from exactly [`INDEX_ENTRY_SIZE`] bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; INDEX_ENTRY_SIZE as usize]) -> Self {
        Self {
            offset: read_u64(&bytes[..8]),
            size: read_u64(&bytes[8..16]),
            filter_mask: FilterMask::new(read_u32(&bytes[16..20])),
        }
    }
}

/// Round `offset` up to the next multiple of [`DATA_ALIGNMENT`].
#[must_use]
pub const fn align_up(offset: u64) -> u64 {
    offset.next_multiple_of(DATA_ALIGNMENT)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superblock() {
        let superblock = Superblock {
            version: FORMAT_VERSION,
            metadata_len: 300,
        };
        let bytes = superblock.to_bytes();
        assert_eq!(&bytes[..8], b"CHNKBNCH");
        assert_eq!(&bytes[8..], &[1, 0, 0, 0, 44, 1, 0, 0]);
        assert_eq!(Superblock::from_bytes(&bytes), Ok(superblock));
        assert_eq!(
            Superblock::from_bytes(&bytes[..10]),
            Err(SuperblockError::Truncated)
        );
        let mut bytes = bytes;
        bytes[0] = b'X';
        assert_eq!(
            Superblock::from_bytes(&bytes),
            Err(SuperblockError::InvalidMagic)
        );
    }

    #[test]
    fn chunk_index_entry() {
        assert!(!ChunkIndexEntry::from_bytes(&[0; 24]).is_allocated());
        let entry = ChunkIndexEntry {
            offset: 4096,
            size: 20480,
            filter_mask: FilterMask::new(2),
        };
        let bytes = entry.to_bytes();
        assert_eq!(&bytes[16..], &[2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ChunkIndexEntry::from_bytes(&bytes), entry);
        assert!(entry.is_allocated());
    }

    #[test]
    fn alignment() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(17), 24);
        assert_eq!(align_up(24), 24);
    }
}
