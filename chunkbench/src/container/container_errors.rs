use chunkbench_codec::{FilterError, FilterId, PluginCreateError};
use chunkbench_storage::StorageError;
use thiserror::Error;

use super::{ArrayIndices, ArrayShape, ArraySubset, ArraySubsetError, DataType};

/// A container creation error.
#[derive(Clone, Debug, Error)]
pub enum ContainerCreateError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// The container shape is empty.
    #[error("a container must have at least one dimension")]
    ZeroDimensional,
    /// The dimensionality of the chunk shape does not match the container shape.
    #[error("chunk shape dimensionality {0} does not match container dimensionality {1}")]
    InvalidChunkShapeDimensionality(usize, usize),
    /// Invalid chunk shape (contains zero).
    #[error("invalid chunk shape {0:?}: all elements must be non-zero")]
    InvalidChunkShape(ArrayShape),
    /// The fill value does not match the data type.
    #[error("invalid fill value for data type `{data_type}`: got {got} bytes")]
    InvalidFillValue {
        /// The data type.
        data_type: DataType,
        /// The size of the fill value.
        got: usize,
    },
    /// Filters require a chunked layout.
    #[error("filters cannot be applied to a contiguous layout")]
    FiltersRequireChunkedLayout,
    /// A filter could not be created.
    #[error("filter {id} could not be created: {source}")]
    FilterCreateError {
        /// The filter identifier.
        id: FilterId,
        /// The plugin error.
        #[source]
        source: PluginCreateError,
    },
    /// The filter pipeline is invalid.
    #[error(transparent)]
    FilterError(#[from] FilterError),
    /// The storage does not start with a container superblock.
    #[error("not a container: the magic bytes are missing")]
    InvalidMagic,
    /// The container format version is not supported.
    #[error("unsupported container format version {0}")]
    UnsupportedVersion(u32),
    /// The metadata could not be parsed.
    #[error("invalid container metadata: {0}")]
    InvalidMetadata(String),
    /// The storage ends before the chunk index.
    #[error("the container is truncated: {size} bytes, the chunk index ends at {expected}")]
    Truncated {
        /// The storage size.
        size: u64,
        /// The minimum size.
        expected: u64,
    },
}

/// Container errors.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    /// A store error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A filter error.
    #[error(transparent)]
    FilterError(#[from] FilterError),
    /// Invalid chunk grid indices.
    #[error("invalid chunk grid indices: {_0:?}")]
    InvalidChunkGridIndicesError(ArrayIndices),
    /// An [`ArraySubsetError`].
    #[error(transparent)]
    ArraySubsetError(#[from] ArraySubsetError),
    /// Incompatible array subset.
    #[error("array subset {_0} is not compatible with container shape {_1:?}")]
    InvalidArraySubset(ArraySubset, ArrayShape),
    /// An unexpected chunk decoded size.
    #[error("got chunk decoded size {_0}, expected {_1}")]
    UnexpectedChunkDecodedSize(usize, usize),
    /// An unexpected bytes input size.
    #[error("got bytes with size {_0}, expected {_1}")]
    InvalidBytesInputSize(usize, u64),
    /// A chunk does not fit in memory.
    #[error("a chunk of {0} bytes cannot be addressed on this platform")]
    ChunkTooLarge(u64),
}

/// A direct chunk write error.
///
/// Every precondition of [`Container::write_chunk_direct`](super::Container::write_chunk_direct) is checked before any I/O.
#[derive(Clone, Debug, Error)]
pub enum DirectWriteError {
    /// An argument is invalid, for example an empty buffer or an offset of the wrong dimensionality.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The offset is not the origin of a chunk.
    #[error("offset {offset:?} is not aligned to the chunk shape {chunk_shape:?}")]
    MisalignedOffset {
        /// The offset.
        offset: ArrayIndices,
        /// The chunk shape.
        chunk_shape: ArrayShape,
    },
    /// The offset is outside the container.
    #[error("offset {offset:?} is out of bounds for container shape {shape:?}")]
    OutOfBounds {
        /// The offset.
        offset: ArrayIndices,
        /// The container shape.
        shape: ArrayShape,
    },
    /// A container error.
    #[error(transparent)]
    ContainerError(#[from] ContainerError),
}

impl From<StorageError> for DirectWriteError {
    fn from(err: StorageError) -> Self {
        Self::ContainerError(err.into())
    }
}

impl From<FilterError> for DirectWriteError {
    fn from(err: FilterError) -> Self {
        Self::ContainerError(err.into())
    }
}
