use std::borrow::Cow;

use chunkbench_codec::FilterMask;
use chunkbench_storage::ReadableWritableStorageTraits;

use super::array_subset::copy_region;
use super::container_format::{self, ChunkIndexEntry};
use super::{
    chunk_indices_in, ArraySubset, Container, ContainerError, DirectWriteError,
};

impl<TStorage: ?Sized + ReadableWritableStorageTraits> Container<TStorage> {
    /// Encode and store the chunk at `chunk_indices`.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if
    ///  - `chunk_indices` are invalid,
    ///  - the length of `chunk_bytes` is not equal to the chunk size in bytes,
    ///  - a mandatory filter fails, or
    ///  - there is a storage error.
    pub fn store_chunk(
        &mut self,
        chunk_indices: &[u64],
        chunk_bytes: &[u8],
    ) -> Result<(), ContainerError> {
        let linear_index = self.chunk_linear_index(chunk_indices)?;
        let chunk_size = self.chunk_size_bytes()?;
        if chunk_bytes.len() != chunk_size {
            return Err(ContainerError::InvalidBytesInputSize(
                chunk_bytes.len(),
                chunk_size as u64,
            ));
        }
        self.encode_and_store_chunk(linear_index, chunk_bytes, FilterMask::NONE)
    }

    /// Write the whole chunk whose origin is the element `offset`.
    ///
    /// This is the direct chunk write: no region selection takes place, `chunk_bytes` is the complete chunk in C order.
    /// Filters whose bit is set in `filter_mask` are skipped, the rest of the pipeline is applied as usual.
    ///
    /// # Errors
    /// Every precondition is checked before any I/O. Returns
    ///  - [`DirectWriteError::InvalidArgument`] if the container is not chunked, `offset` has the wrong dimensionality,
    ///    `chunk_bytes` is empty, or `chunk_bytes` is not the chunk size in bytes,
    ///  - [`DirectWriteError::OutOfBounds`] if `offset` is outside the container,
    ///  - [`DirectWriteError::MisalignedOffset`] if `offset` is not the origin of a chunk,
    ///  - [`DirectWriteError::ContainerError`] if a mandatory filter fails or there is a storage error.
    pub fn write_chunk_direct(
        &mut self,
        offset: &[u64],
        filter_mask: FilterMask,
        chunk_bytes: &[u8],
    ) -> Result<(), DirectWriteError> {
        if !self.is_chunked() {
            return Err(DirectWriteError::InvalidArgument(format!(
                "container {:?} does not have a chunked layout",
                self.name()
            )));
        }
        if offset.len() != self.dimensionality() {
            return Err(DirectWriteError::InvalidArgument(format!(
                "offset {offset:?} has dimensionality {}, expected {}",
                offset.len(),
                self.dimensionality()
            )));
        }
        if chunk_bytes.is_empty() {
            return Err(DirectWriteError::InvalidArgument(
                "the chunk buffer is empty".to_string(),
            ));
        }
        if std::iter::zip(offset, self.shape()).any(|(index, extent)| index >= extent) {
            return Err(DirectWriteError::OutOfBounds {
                offset: offset.to_vec(),
                shape: self.shape().to_vec(),
            });
        }
        if !self.chunk_grid.is_chunk_origin(offset) {
            return Err(DirectWriteError::MisalignedOffset {
                offset: offset.to_vec(),
                chunk_shape: self.chunk_shape(),
            });
        }
        let chunk_size = self.chunk_size_bytes()?;
        if chunk_bytes.len() != chunk_size {
            return Err(DirectWriteError::InvalidArgument(format!(
                "got a chunk buffer of {} bytes, expected {chunk_size}",
                chunk_bytes.len()
            )));
        }

        let chunk_indices = self.chunk_grid.chunk_indices(offset);
        let linear_index = self.chunk_linear_index(&chunk_indices)?;
        self.encode_and_store_chunk(linear_index, chunk_bytes, filter_mask)?;
        Ok(())
    }

    /// Encode and store `subset_bytes` in the `array_subset` of the container.
    ///
    /// `subset_bytes` holds the subset in C order.
    /// Chunks only partially covered by the subset are retrieved and updated.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if
    ///  - `array_subset` is out of bounds,
    ///  - the length of `subset_bytes` does not match the subset,
    ///  - a filter fails, or
    ///  - there is a storage error.
    pub fn store_array_subset(
        &mut self,
        array_subset: &ArraySubset,
        subset_bytes: &[u8],
    ) -> Result<(), ContainerError> {
        self.validate_array_subset(array_subset, subset_bytes.len())?;
        if array_subset.is_empty() {
            return Ok(());
        }
        let chunk_shape = self.chunk_shape();
        let chunk_elements = self.chunk_grid.chunk_num_elements();
        let element_size = self.metadata.data_type.size();
        let subset_all = self.subset_all();
        let chunks = self.chunk_grid.chunks_in_array_subset(array_subset);
        for chunk_indices in chunk_indices_in(&chunks) {
            let chunk_subset = self.chunk_grid.subset(&chunk_indices);
            let overlap = array_subset.overlap(&chunk_subset)?;
            let chunk_in_bounds = chunk_subset.overlap(&subset_all)?;

            let mut chunk_bytes = if overlap == chunk_in_bounds {
                self.metadata
                    .fill_value
                    .repeat(usize::try_from(chunk_elements).map_err(|_| {
                        ContainerError::ChunkTooLarge(chunk_elements)
                    })?)
            } else {
                self.retrieve_chunk(&chunk_indices)?
            };
            copy_region(
                subset_bytes,
                array_subset.shape(),
                &overlap.relative_to(array_subset.start())?,
                &mut chunk_bytes,
                &chunk_shape,
                overlap.relative_to(chunk_subset.start())?.start(),
                element_size,
            );

            let linear_index = self.chunk_linear_index(&chunk_indices)?;
            self.encode_and_store_chunk(linear_index, &chunk_bytes, FilterMask::NONE)?;
        }
        Ok(())
    }

    /// Close the container and its storage.
    ///
    /// # Errors
    /// Returns a [`ContainerError`] if the storage cannot be flushed or closed.
    pub fn close(self) -> Result<(), ContainerError> {
        self.storage.close()?;
        Ok(())
    }

    fn encode_and_store_chunk(
        &mut self,
        linear_index: usize,
        chunk_bytes: &[u8],
        filter_mask: FilterMask,
    ) -> Result<(), ContainerError> {
        let (encoded, filter_mask) = self
            .pipeline
            .encode(Cow::Borrowed(chunk_bytes), filter_mask)?;
        let encoded_size = encoded.len() as u64;

        let previous = self.index[linear_index];
        let offset = if previous.is_allocated() && encoded_size <= previous.size {
            previous.offset
        } else {
            let offset = container_format::align_up(self.end);
            self.end = offset + encoded_size;
            offset
        };
        let entry = ChunkIndexEntry {
            offset,
            size: encoded_size,
            filter_mask,
        };

        self.storage.set_partial(offset, &encoded)?;
        self.storage
            .set_partial(self.index_entry_offset(linear_index), &entry.to_bytes())?;
        self.index[linear_index] = entry;
        Ok(())
    }
}
