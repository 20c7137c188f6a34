use std::num::NonZeroU64;

use chunkbench_codec::{FilterFlags, FilterId};
use serde::{Deserialize, Serialize};

use super::{ArrayShape, DataType, FillValue};

/// The storage layout of a container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChunkLayout {
    /// The container is a single unfiltered chunk covering the whole array.
    Contiguous,
    /// The container is split into chunks of `chunk_shape`, each passed through the filter pipeline.
    Chunked {
        /// The chunk shape.
        chunk_shape: Vec<NonZeroU64>,
    },
}

/// A filter in the pipeline of a container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMetadata {
    /// The filter identifier.
    pub id: FilterId,
    /// The filter name when the container was written.
    pub name: String,
    /// How the pipeline treats a failure of the filter.
    #[serde(default)]
    pub flags: FilterFlags,
    /// Filter parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_data: Vec<u32>,
}

/// Container metadata.
///
/// Stored as JSON after the superblock.
/// ```json
/// {
///   "name": "data",
///   "shape": [100, 32, 64],
///   "data_type": "uint8",
///   "layout": { "type": "chunked", "chunk_shape": [10, 32, 64] },
///   "fill_value": [0],
///   "filters": [{ "id": 400, "name": "passthrough", "flags": "mandatory" }]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    /// The dataset name.
    pub name: String,
    /// The array shape.
    pub shape: ArrayShape,
    /// The element data type.
    pub data_type: DataType,
    /// The storage layout.
    pub layout: ChunkLayout,
    /// The fill value.
    pub fill_value: FillValue,
    /// The filter pipeline, applied first to last when writing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterMetadata>,
}
