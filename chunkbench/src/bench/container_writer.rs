//! The container write phase.

use std::path::Path;
use std::sync::Arc;

use chunkbench_codec::filter::passthrough::PassthroughFilter;
use chunkbench_codec::{FilterFlags, FilterMask, FilterRegistry};
use chunkbench_storage::store::FileStore;

use super::config::{BenchmarkConfig, WriteStrategy, DATASET_NAME};
use super::timing::{Stopwatch, TimingSample};
use super::BenchError;
use crate::container::{ArraySubset, Container, ContainerBuilder, DataType};

/// Create the benchmark container at `path` and close it.
///
/// The container holds one `uint8` dataset of shape `(n_images, ny, nx)` chunked as `(chunk_size, ny, nx)`,
/// with the passthrough filter attached as a mandatory filter.
///
/// # Errors
/// Returns a [`BenchError`] if the file cannot be created or the passthrough filter is unavailable in `registry`.
pub fn create_container(
    path: &Path,
    config: &BenchmarkConfig,
    registry: &FilterRegistry,
) -> Result<(), BenchError> {
    let storage = Arc::new(FileStore::create(path)?);
    let container = ContainerBuilder::new(config.array_shape(), DataType::UInt8)
        .chunk_shape(config.chunk_shape())
        .filter(PassthroughFilter::ID, FilterFlags::Mandatory, vec![])
        .name(DATASET_NAME)
        .create(storage, registry)?;
    container.close()?;
    Ok(())
}

/// Create the benchmark container, then reopen it and write `buffer` into each of its chunks in order.
///
/// The timing starts at the reopen and stops after the container is closed,
/// so it includes the cold open cost but not the creation cost.
///
/// # Errors
/// Returns a [`BenchError`] if the container cannot be created or opened, or any chunk write fails.
/// There is no retry.
pub fn write_container(
    config: &BenchmarkConfig,
    buffer: &[u8],
    registry: &FilterRegistry,
) -> Result<TimingSample, BenchError> {
    let path = config.container_path();
    create_container(&path, config, registry)?;

    let stopwatch = Stopwatch::start(config.cpu_time());
    let storage = Arc::new(FileStore::open(&path)?);
    let mut container = Container::open(storage, registry)?;
    write_chunks(&mut container, config, buffer)?;
    container.close()?;
    let sample = stopwatch.stop();

    log::debug!(
        "wrote {} chunks to {} with the {} strategy",
        config.ncalls(),
        path.display(),
        config.strategy()
    );
    Ok(sample)
}

/// Write `buffer` into each chunk of `container` in order, using the configured strategy.
///
/// # Errors
/// Returns a [`BenchError`] if any chunk write fails.
pub fn write_chunks<TStorage>(
    container: &mut Container<TStorage>,
    config: &BenchmarkConfig,
    buffer: &[u8],
) -> Result<(), BenchError>
where
    TStorage: ?Sized + chunkbench_storage::ReadableWritableStorageTraits,
{
    let chunk_shape = config.chunk_shape();
    for chunk in 0..config.ncalls() {
        let offset = vec![chunk * config.chunk_size(), 0, 0];
        match config.strategy() {
            WriteStrategy::Direct => container
                .write_chunk_direct(&offset, FilterMask::NONE, buffer)
                .map_err(|source| BenchError::DirectWrite { chunk, source })?,
            WriteStrategy::Traditional => {
                let subset = ArraySubset::new_with_start_shape(offset, chunk_shape.clone())?;
                container.store_array_subset(&subset, buffer)?;
            }
        }
    }
    Ok(())
}
