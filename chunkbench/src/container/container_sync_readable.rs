use std::borrow::Cow;
use std::sync::Arc;

use chunkbench_codec::{FilterMask, FilterRegistry};
use chunkbench_storage::byte_range::ByteRange;
use chunkbench_storage::{Bytes, ReadableStorageTraits};

use super::array_subset::copy_region;
use super::container_format::{
    ChunkIndexEntry, Superblock, SuperblockError, FORMAT_VERSION, INDEX_ENTRY_SIZE,
    SUPERBLOCK_SIZE,
};
use super::{
    chunk_indices_in, ArraySubset, Container, ContainerCreateError, ContainerError,
    ContainerMetadata,
};

impl<TStorage: ?Sized + ReadableStorageTraits> Container<TStorage> {
    /// Open an existing container in `storage`.
    ///
    /// Filters are instantiated from `registry`.
    /// An unavailable optional filter is tolerated, chunks encoded with it cannot be read.
    ///
    /// # Errors
    /// Returns [`ContainerCreateError`] if the storage does not hold a valid container,
    /// a mandatory filter is unavailable, or there is a storage error.
    pub fn open(
        storage: Arc<TStorage>,
        registry: &FilterRegistry,
    ) -> Result<Self, ContainerCreateError> {
        let size = storage.size()?;
        if size < SUPERBLOCK_SIZE {
            return Err(ContainerCreateError::Truncated {
                size,
                expected: SUPERBLOCK_SIZE,
            });
        }
        let superblock_bytes =
            storage.get_byte_range(ByteRange::FromStart(0, Some(SUPERBLOCK_SIZE)))?;
        let superblock = Superblock::from_bytes(&superblock_bytes).map_err(|err| match err {
            SuperblockError::InvalidMagic => ContainerCreateError::InvalidMagic,
            SuperblockError::Truncated => ContainerCreateError::Truncated {
                size,
                expected: SUPERBLOCK_SIZE,
            },
        })?;
        if superblock.version != FORMAT_VERSION {
            return Err(ContainerCreateError::UnsupportedVersion(superblock.version));
        }

        let index_offset = SUPERBLOCK_SIZE + u64::from(superblock.metadata_len);
        if size < index_offset {
            return Err(ContainerCreateError::Truncated {
                size,
                expected: index_offset,
            });
        }
        let metadata_bytes = storage.get_byte_range(ByteRange::FromStart(
            SUPERBLOCK_SIZE,
            Some(u64::from(superblock.metadata_len)),
        ))?;
        let metadata: ContainerMetadata = serde_json::from_slice(&metadata_bytes)
            .map_err(|err| ContainerCreateError::InvalidMetadata(err.to_string()))?;

        let mut container =
            Self::new_with_metadata(storage, metadata, registry, index_offset, true)?;

        let index_end = container.index_entry_offset(container.index.len());
        if size < index_end {
            return Err(ContainerCreateError::Truncated {
                size,
                expected: index_end,
            });
        }
        let index_bytes = container.storage.get_byte_range(ByteRange::FromStart(
            index_offset,
            Some(index_end - index_offset),
        ))?;
        for (entry, bytes) in std::iter::zip(
            container.index.iter_mut(),
            index_bytes.chunks_exact(INDEX_ENTRY_SIZE as usize),
        ) {
            if let Ok(bytes) = bytes.try_into() {
                *entry = ChunkIndexEntry::from_bytes(bytes);
            }
        }
        container.end = size.max(container.data_offset());
        log::debug!(
            "opened container {:?} with {} of {} chunks allocated",
            container.name(),
            container.index.iter().filter(|entry| entry.is_allocated()).count(),
            container.index.len()
        );
        Ok(container)
    }

    /// Read the stored bytes and filter mask of the chunk at `chunk_indices` without decoding.
    ///
    /// Returns [`None`] if the chunk has never been written.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the chunk indices are invalid or there is a storage error.
    pub fn retrieve_encoded_chunk(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<(Bytes, FilterMask)>, ContainerError> {
        let entry = self.chunk_info(chunk_indices)?;
        if !entry.is_allocated() {
            return Ok(None);
        }
        let bytes = self
            .storage
            .get_byte_range(ByteRange::FromStart(entry.offset, Some(entry.size)))?;
        Ok(Some((bytes, entry.filter_mask)))
    }

    /// Read and decode the chunk at `chunk_indices`.
    ///
    /// A chunk that has never been written is returned as the fill value.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the chunk indices are invalid, a filter fails, the decoded size is wrong, or there is a storage error.
    pub fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Vec<u8>, ContainerError> {
        let chunk_size = self.chunk_size_bytes()?;
        let Some((encoded, filter_mask)) = self.retrieve_encoded_chunk(chunk_indices)? else {
            return Ok(self
                .metadata
                .fill_value
                .repeat(chunk_size / self.metadata.data_type.size()));
        };
        let decoded = self
            .pipeline
            .decode(Cow::Borrowed(encoded.as_ref()), filter_mask)?;
        if decoded.len() != chunk_size {
            return Err(ContainerError::UnexpectedChunkDecodedSize(
                decoded.len(),
                chunk_size,
            ));
        }
        Ok(decoded.into_owned())
    }

    /// Read and decode the `array_subset` of the container.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the subset is out of bounds or a chunk cannot be retrieved.
    pub fn retrieve_array_subset(
        &self,
        array_subset: &ArraySubset,
    ) -> Result<Vec<u8>, ContainerError> {
        let size = array_subset
            .num_elements()
            .checked_mul(self.metadata.data_type.size() as u64)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| {
                ContainerError::InvalidArraySubset(array_subset.clone(), self.shape().to_vec())
            })?;
        let mut bytes = vec![0; size];
        self.retrieve_array_subset_into(array_subset, &mut bytes)?;
        Ok(bytes)
    }

    /// Read and decode the `array_subset` of the container into `bytes`.
    ///
    /// `bytes` must hold exactly the subset in C order.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the subset is out of bounds, `bytes` has the wrong length, or a chunk cannot be retrieved.
    pub fn retrieve_array_subset_into(
        &self,
        array_subset: &ArraySubset,
        bytes: &mut [u8],
    ) -> Result<(), ContainerError> {
        self.validate_array_subset(array_subset, bytes.len())?;
        if array_subset.is_empty() {
            return Ok(());
        }
        let chunk_shape = self.chunk_shape();
        let element_size = self.metadata.data_type.size();
        let chunks = self.chunk_grid.chunks_in_array_subset(array_subset);
        for chunk_indices in chunk_indices_in(&chunks) {
            let chunk_subset = self.chunk_grid.subset(&chunk_indices);
            let overlap = array_subset.overlap(&chunk_subset)?;
            let chunk_bytes = self.retrieve_chunk(&chunk_indices)?;
            copy_region(
                &chunk_bytes,
                &chunk_shape,
                &overlap.relative_to(chunk_subset.start())?,
                bytes,
                array_subset.shape(),
                overlap.relative_to(array_subset.start())?.start(),
                element_size,
            );
        }
        Ok(())
    }
}
