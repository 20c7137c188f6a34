use std::num::NonZeroU64;
use std::sync::Arc;

use chunkbench_codec::{FilterFlags, FilterId, FilterRegistry};
use chunkbench_storage::ReadableWritableStorageTraits;

use super::container_format::{Superblock, FORMAT_VERSION, SUPERBLOCK_SIZE};
use super::{
    ArrayShape, ChunkLayout, Container, ContainerCreateError, ContainerMetadata, DataType,
    FillValue, FilterMetadata,
};

/// A [`Container`] builder.
///
/// [`ContainerBuilder`] is initialised from an array shape and data type.
///  - The layout is contiguous unless a chunk shape is set with [`chunk_shape`](ContainerBuilder::chunk_shape).
///  - The fill value is zero.
///  - The filter pipeline is empty.
///  - The dataset name is `data`.
///
/// [`create`](ContainerBuilder::create) writes the superblock, metadata, and an empty chunk index to the storage.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::sync::Arc;
/// use chunkbench::container::{ContainerBuilder, DataType};
/// use chunkbench_codec::{FilterFlags, FilterId, FilterRegistry};
/// # let store = Arc::new(chunkbench_storage::store::MemoryStore::new());
/// let registry = FilterRegistry::new();
/// let container = ContainerBuilder::new(vec![100, 32, 64], DataType::UInt8)
///     .chunk_shape(vec![10, 32, 64])
///     .filter(FilterId::new(400), FilterFlags::Mandatory, vec![])
///     .create(store, &registry)?;
/// assert_eq!(container.num_chunks(), 10);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    /// Array shape.
    pub shape: ArrayShape,
    /// Data type.
    pub data_type: DataType,
    /// Chunk shape. [`None`] for a contiguous layout.
    pub chunk_shape: Option<ArrayShape>,
    /// Fill value. [`None`] for zero.
    pub fill_value: Option<FillValue>,
    /// Filters as `(id, flags, client_data)`.
    pub filters: Vec<(FilterId, FilterFlags, Vec<u32>)>,
    /// Dataset name.
    pub name: String,
}

impl ContainerBuilder {
    /// Create a new container builder.
    #[must_use]
    pub fn new(shape: impl Into<ArrayShape>, data_type: DataType) -> Self {
        Self {
            shape: shape.into(),
            data_type,
            chunk_shape: None,
            fill_value: None,
            filters: Vec::new(),
            name: "data".to_string(),
        }
    }

    /// Set the chunk shape, selecting a chunked layout.
    pub fn chunk_shape(&mut self, chunk_shape: impl Into<ArrayShape>) -> &mut Self {
        self.chunk_shape = Some(chunk_shape.into());
        self
    }

    /// Set the fill value.
    pub fn fill_value(&mut self, fill_value: impl Into<FillValue>) -> &mut Self {
        self.fill_value = Some(fill_value.into());
        self
    }

    /// Append a filter to the pipeline.
    pub fn filter(&mut self, id: FilterId, flags: FilterFlags, client_data: Vec<u32>) -> &mut Self {
        self.filters.push((id, flags, client_data));
        self
    }

    /// Set the dataset name.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Build the container metadata.
    ///
    /// # Errors
    /// Returns [`ContainerCreateError`] if the chunk shape contains zero or a filter is not available in `registry`.
    pub fn build_metadata(
        &self,
        registry: &FilterRegistry,
    ) -> Result<ContainerMetadata, ContainerCreateError> {
        let layout = match &self.chunk_shape {
            Some(chunk_shape) => ChunkLayout::Chunked {
                chunk_shape: chunk_shape
                    .iter()
                    .map(|&size| NonZeroU64::new(size))
                    .collect::<Option<_>>()
                    .ok_or_else(|| ContainerCreateError::InvalidChunkShape(chunk_shape.clone()))?,
            },
            None => ChunkLayout::Contiguous,
        };
        let filters = self
            .filters
            .iter()
            .map(|(id, flags, client_data)| {
                let filter = registry.create(*id, client_data).map_err(|source| {
                    ContainerCreateError::FilterCreateError { id: *id, source }
                })?;
                Ok(FilterMetadata {
                    id: *id,
                    name: filter.name().to_string(),
                    flags: *flags,
                    client_data: client_data.clone(),
                })
            })
            .collect::<Result<Vec<_>, ContainerCreateError>>()?;
        let fill_value = self.fill_value.clone().unwrap_or_else(|| {
            FillValue::new(vec![0; self.data_type.size()])
        });
        Ok(ContainerMetadata {
            name: self.name.clone(),
            shape: self.shape.clone(),
            data_type: self.data_type,
            layout,
            fill_value,
            filters,
        })
    }

    /// Create the container in `storage`, replacing any existing content.
    ///
    /// Filters are instantiated from `registry`.
    ///
    /// # Errors
    /// Returns [`ContainerCreateError`] if the configuration is invalid, a filter is unavailable, or there is a storage error.
    pub fn create<TStorage: ?Sized + ReadableWritableStorageTraits>(
        &self,
        storage: Arc<TStorage>,
        registry: &FilterRegistry,
    ) -> Result<Container<TStorage>, ContainerCreateError> {
        let metadata = self.build_metadata(registry)?;
        let metadata_json = serde_json::to_vec(&metadata)
            .map_err(|err| ContainerCreateError::InvalidMetadata(err.to_string()))?;
        let metadata_len = u32::try_from(metadata_json.len())
            .map_err(|err| ContainerCreateError::InvalidMetadata(err.to_string()))?;

        let mut container = Container::new_with_metadata(
            storage,
            metadata,
            registry,
            SUPERBLOCK_SIZE + u64::from(metadata_len),
            false,
        )?;

        let superblock = Superblock {
            version: FORMAT_VERSION,
            metadata_len,
        };
        let data_offset = container.data_offset();
        let data_len = usize::try_from(data_offset)
            .map_err(|err| ContainerCreateError::InvalidMetadata(err.to_string()))?;
        let mut header = Vec::with_capacity(data_len);
        header.extend_from_slice(&superblock.to_bytes());
        header.extend_from_slice(&metadata_json);
        header.resize(data_len, 0);

        container.storage.set_size(0)?;
        container.storage.set_partial(0, &header)?;
        container.end = data_offset;
        log::debug!(
            "created container {:?} with shape {:?} and {} chunks",
            container.name(),
            container.shape(),
            container.num_chunks()
        );
        Ok(container)
    }
}
