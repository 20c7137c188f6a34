//! `chunkbench` measures the cost of writing chunks into a chunked, filtered single-file array container
//! and compares it with writing the same bytes to a flat file.
//!
//! The crate has two parts:
//! - [`container`]: a chunked array container stored in a single file, with a numeric filter pipeline,
//!   a *direct chunk write* that stores whole chunks addressed by their element offset,
//!   and a generic *hyperslab* write and read that work on any rectangular region.
//! - [`bench`]: the benchmark harness. It writes a fixed-value workload to a raw file and to a container,
//!   times both phases, verifies the first chunk, and reports throughput and overhead.
//!
//! Filters and stores live in the [`chunkbench_codec`] and [`chunkbench_storage`] crates.
//!
//! ## Example
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use chunkbench::container::{ArraySubset, ContainerBuilder, DataType};
//! use chunkbench_codec::{FilterFlags, FilterId, FilterMask, FilterRegistry};
//! use chunkbench_storage::store::MemoryStore;
//!
//! let registry = FilterRegistry::new();
//! let store = Arc::new(MemoryStore::new());
//! let mut container = ContainerBuilder::new(vec![4, 2, 3], DataType::UInt8)
//!     .chunk_shape(vec![2, 2, 3])
//!     .filter(FilterId::new(3), FilterFlags::Mandatory, vec![])
//!     .create(store, &registry)?;
//!
//! // Write the second chunk directly
//! container.write_chunk_direct(&[2, 0, 0], FilterMask::NONE, &[7; 12])?;
//!
//! // Read back the whole array, the first chunk is the fill value
//! let bytes = container.retrieve_array_subset(&container.subset_all())?;
//! assert_eq!(&bytes[..12], &[0; 12]);
//! assert_eq!(&bytes[12..], &[7; 12]);
//!
//! // Overwrite a region spanning both chunks
//! container.store_array_subset(&ArraySubset::new_with_ranges(&[1..3, 0..1, 0..3]), &[1; 6])?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Command line
//! The `chunkbench` binary runs one benchmark. See `chunkbench --help`.
//!
//! ## Logging
//! `chunkbench` logs through the [`log`] crate. The binary installs `env_logger` and defaults to `chunkbench=info`.

pub mod bench;
pub mod container;

pub use chunkbench_codec as codec;
pub use chunkbench_storage as storage;
