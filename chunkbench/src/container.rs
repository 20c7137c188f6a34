//! Chunked single-file containers.
//!
//! A container holds one named multidimensional array of fixed-size integer elements in a single storage value (usually one file).
//! It is defined by the following parameters, encoded in its JSON metadata:
//!  - **name**: the dataset name,
//!  - **shape**: the length of each array dimension,
//!  - **data type**: the numerical representation of array elements,
//!  - **layout**: either *contiguous* or *chunked* with a fixed chunk shape,
//!  - **fill value**: the element value of unwritten portions of the array,
//!  - **filters**: an ordered pipeline of chunk filters identified by numeric [`FilterId`](chunkbench_codec::FilterId)s.
//!
//! See [`container_format`] for the byte layout.
//!
//! The documentation for [`Container`] details how to interact with containers.

mod array_subset;
mod chunk_grid;
mod container_builder;
mod container_errors;
mod container_metadata;
mod container_sync_readable;
mod container_sync_writable;
mod data_type;

pub mod container_format;

use std::num::NonZeroU64;
use std::sync::Arc;

use chunkbench_codec::{
    FilterCapabilities, FilterError, FilterFlags, FilterId, FilterPipeline, FilterRegistry,
    FilterTraits, RawBytes,
};
use itertools::Itertools;

pub use self::array_subset::{ArraySubset, ArraySubsetError};
pub use self::chunk_grid::{ravel_indices, RegularChunkGrid};
pub use self::container_builder::ContainerBuilder;
pub use self::container_errors::{ContainerCreateError, ContainerError, DirectWriteError};
pub use self::container_format::ChunkIndexEntry;
pub use self::container_metadata::{ChunkLayout, ContainerMetadata, FilterMetadata};
pub use self::data_type::{DataType, FillValue};

/// An array shape. Dimensions may be zero.
pub type ArrayShape = Vec<u64>;

/// Array indices.
pub type ArrayIndices = Vec<u64>;

/// A chunked single-file container.
///
/// A container is created with a [`ContainerBuilder`] or opened from existing storage with [`Container::open`].
/// The storage type determines the available methods:
///  - [`ReadableStorageTraits`](chunkbench_storage::ReadableStorageTraits): `retrieve_*` and `chunk_info`,
///  - [`ReadableWritableStorageTraits`](chunkbench_storage::ReadableWritableStorageTraits): additionally `store_*`, `write_chunk_direct` and `close`.
///
/// ### Writing
/// [`store_array_subset`](Container::store_array_subset) writes any hyperslab of the array.
/// Chunks that are only partially covered are read, updated, and written again.
///
/// [`write_chunk_direct`](Container::write_chunk_direct) writes one whole chunk addressed by its element offset.
/// The offset must be chunk aligned and in bounds, which is checked before any I/O.
///
/// Both paths encode chunks through the filter pipeline and allocate chunk storage in write order,
/// so writing the same chunks in the same order through either path produces identical bytes.
///
/// ### Reading
/// Chunks that have never been written read back as the fill value.
#[derive(Debug)]
pub struct Container<TStorage: ?Sized> {
    /// The storage.
    storage: Arc<TStorage>,
    /// The metadata used to create the container.
    metadata: ContainerMetadata,
    /// The chunk grid. A contiguous container has one chunk covering the whole array.
    chunk_grid: RegularChunkGrid,
    /// The shape of the chunk grid.
    chunk_grid_shape: ArrayShape,
    /// The filter pipeline.
    pipeline: FilterPipeline,
    /// The chunk index, in C order.
    index: Vec<ChunkIndexEntry>,
    /// The byte offset of the chunk index.
    index_offset: u64,
    /// The end of the allocated storage.
    end: u64,
}

impl<TStorage: ?Sized> Container<TStorage> {
    fn new_with_metadata(
        storage: Arc<TStorage>,
        metadata: ContainerMetadata,
        registry: &FilterRegistry,
        index_offset: u64,
        allow_unavailable_optional: bool,
    ) -> Result<Self, ContainerCreateError> {
        let shape = &metadata.shape;
        if shape.is_empty() {
            return Err(ContainerCreateError::ZeroDimensional);
        }
        if metadata.fill_value.size() != metadata.data_type.size() {
            return Err(ContainerCreateError::InvalidFillValue {
                data_type: metadata.data_type,
                got: metadata.fill_value.size(),
            });
        }
        let chunk_shape = match &metadata.layout {
            ChunkLayout::Chunked { chunk_shape } => {
                if chunk_shape.len() != shape.len() {
                    return Err(ContainerCreateError::InvalidChunkShapeDimensionality(
                        chunk_shape.len(),
                        shape.len(),
                    ));
                }
                chunk_shape.clone()
            }
            ChunkLayout::Contiguous => {
                if !metadata.filters.is_empty() {
                    return Err(ContainerCreateError::FiltersRequireChunkedLayout);
                }
                shape
                    .iter()
                    .map(|&extent| NonZeroU64::new(extent).unwrap_or(NonZeroU64::MIN))
                    .collect()
            }
        };
        let chunk_grid = RegularChunkGrid::new(chunk_shape);
        let chunk_grid_shape = chunk_grid.grid_shape(shape).ok_or(
            ContainerCreateError::InvalidChunkShapeDimensionality(
                chunk_grid.dimensionality(),
                shape.len(),
            ),
        )?;

        let mut pipeline = FilterPipeline::new();
        for filter in &metadata.filters {
            match registry.create(filter.id, &filter.client_data) {
                Ok(created) => pipeline.push(created, filter.flags)?,
                Err(err) if allow_unavailable_optional && filter.flags == FilterFlags::Optional => {
                    log::warn!(
                        "optional filter {} ({}) is unavailable: {err}",
                        filter.id,
                        filter.name
                    );
                    pipeline.push(
                        Arc::new(UnavailableFilter {
                            id: filter.id,
                            name: filter.name.clone(),
                        }),
                        filter.flags,
                    )?;
                }
                Err(source) => {
                    return Err(ContainerCreateError::FilterCreateError {
                        id: filter.id,
                        source,
                    })
                }
            }
        }

        let num_chunks = usize::try_from(chunk_grid_shape.iter().product::<u64>())
            .map_err(|err| ContainerCreateError::InvalidMetadata(err.to_string()))?;
        Ok(Self {
            storage,
            metadata,
            chunk_grid,
            chunk_grid_shape,
            pipeline,
            index: vec![ChunkIndexEntry::default(); num_chunks],
            index_offset,
            end: index_offset,
        })
    }

    /// Get the underlying storage backing the container.
    #[must_use]
    pub fn storage(&self) -> Arc<TStorage> {
        self.storage.clone()
    }

    /// Get the container metadata.
    #[must_use]
    pub fn metadata(&self) -> &ContainerMetadata {
        &self.metadata
    }

    /// Get the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Get the array shape.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.metadata.shape
    }

    /// Get the array dimensionality.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.metadata.shape.len()
    }

    /// Get the data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.metadata.data_type
    }

    /// Get the fill value.
    #[must_use]
    pub fn fill_value(&self) -> &FillValue {
        &self.metadata.fill_value
    }

    /// Get the storage layout.
    #[must_use]
    pub fn layout(&self) -> &ChunkLayout {
        &self.metadata.layout
    }

    /// Returns true if the container has a chunked layout.
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        matches!(self.metadata.layout, ChunkLayout::Chunked { .. })
    }

    /// Get the chunk grid.
    #[must_use]
    pub fn chunk_grid(&self) -> &RegularChunkGrid {
        &self.chunk_grid
    }

    /// Get the chunk shape.
    ///
    /// The chunk shape of a contiguous container is the array shape.
    #[must_use]
    pub fn chunk_shape(&self) -> ArrayShape {
        self.chunk_grid.chunk_shape_u64()
    }

    /// Get the shape of the chunk grid.
    #[must_use]
    pub fn chunk_grid_shape(&self) -> &[u64] {
        &self.chunk_grid_shape
    }

    /// Get the number of chunks.
    #[must_use]
    pub fn num_chunks(&self) -> u64 {
        self.index.len() as u64
    }

    /// Get the metadata of the filter pipeline.
    #[must_use]
    pub fn filters(&self) -> &[FilterMetadata] {
        &self.metadata.filters
    }

    /// Get the filter pipeline.
    #[must_use]
    pub fn filter_pipeline(&self) -> &FilterPipeline {
        &self.pipeline
    }

    /// Return the array subset covering the whole container.
    #[must_use]
    pub fn subset_all(&self) -> ArraySubset {
        ArraySubset::new_with_shape(self.metadata.shape.clone())
    }

    /// Return the size in bytes of one decoded chunk.
    ///
    /// # Errors
    /// Returns [`ContainerError::ChunkTooLarge`] if the chunk size exceeds [`usize::MAX`].
    pub fn chunk_size_bytes(&self) -> Result<usize, ContainerError> {
        let size = self
            .chunk_grid
            .chunk_num_elements()
            .checked_mul(self.metadata.data_type.size() as u64)
            .ok_or(ContainerError::ChunkTooLarge(u64::MAX))?;
        usize::try_from(size).map_err(|_| ContainerError::ChunkTooLarge(size))
    }

    /// Return the index entry of the chunk at `chunk_indices`.
    ///
    /// The entry is unallocated if the chunk has never been written.
    ///
    /// # Errors
    /// Returns [`ContainerError::InvalidChunkGridIndicesError`] if `chunk_indices` are not in the chunk grid.
    pub fn chunk_info(&self, chunk_indices: &[u64]) -> Result<ChunkIndexEntry, ContainerError> {
        Ok(self.index[self.chunk_linear_index(chunk_indices)?])
    }

    fn chunk_linear_index(&self, chunk_indices: &[u64]) -> Result<usize, ContainerError> {
        ravel_indices(chunk_indices, &self.chunk_grid_shape)
            .and_then(|index| usize::try_from(index).ok())
            .ok_or_else(|| ContainerError::InvalidChunkGridIndicesError(chunk_indices.to_vec()))
    }

    fn validate_array_subset(
        &self,
        array_subset: &ArraySubset,
        bytes_len: usize,
    ) -> Result<(), ContainerError> {
        if !array_subset.inbounds_shape(&self.metadata.shape) {
            return Err(ContainerError::InvalidArraySubset(
                array_subset.clone(),
                self.metadata.shape.clone(),
            ));
        }
        let expected = array_subset
            .num_elements()
            .saturating_mul(self.metadata.data_type.size() as u64);
        if bytes_len as u64 != expected {
            return Err(ContainerError::InvalidBytesInputSize(bytes_len, expected));
        }
        Ok(())
    }

    /// Return the byte offset of the entry of chunk `linear_index` in the chunk index.
    fn index_entry_offset(&self, linear_index: usize) -> u64 {
        self.index_offset + linear_index as u64 * container_format::INDEX_ENTRY_SIZE
    }

    /// The end of the chunk index, rounded up to the data alignment.
    fn data_offset(&self) -> u64 {
        container_format::align_up(self.index_entry_offset(self.index.len()))
    }
}

/// Iterate over the chunk indices in `chunks` in C order.
fn chunk_indices_in(chunks: &ArraySubset) -> impl Iterator<Item = ArrayIndices> {
    chunks.to_ranges().into_iter().multi_cartesian_product()
}

/// Stands in for an optional filter whose plugin is unavailable when a container is opened.
///
/// It is never applied when writing, and reading a chunk that was encoded with it fails.
#[derive(Debug)]
struct UnavailableFilter {
    id: FilterId,
    name: String,
}

impl FilterTraits for UnavailableFilter {
    fn id(&self) -> FilterId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> FilterCapabilities {
        FilterCapabilities {
            encode: false,
            decode: false,
        }
    }

    fn encode<'a>(&self, _decoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError> {
        Err(FilterError::DirectionUnavailable {
            id: self.id,
            direction: chunkbench_codec::FilterDirection::Forward,
        })
    }

    fn decode<'a>(&self, _encoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError> {
        Err(FilterError::DirectionUnavailable {
            id: self.id,
            direction: chunkbench_codec::FilterDirection::Reverse,
        })
    }

    fn encoded_size(&self, _decoded_size: u64) -> Option<u64> {
        None
    }
}
