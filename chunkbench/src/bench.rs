//! The direct chunk write benchmark.
//!
//! A run proceeds through these phases, any failure aborts the run:
//!  1. delete the outputs of a previous run and print the `#PARAM` block,
//!  2. write a chunk-sized workload buffer `ncalls` times to `<basename>.raw`,
//!  3. create `<basename>.h5` with the passthrough filter, close it, reopen it, and write the same buffer into each chunk
//!     with the configured [`WriteStrategy`],
//!  4. reopen the container and check that the first chunk holds only the sentinel value,
//!  5. print the `#RESULTS` block and append a JSON record if configured.
//!
//! The passthrough filter is registered on a per-run [`FilterRegistry`] with a fresh [`PassthroughLatch`],
//! so the first-call messages appear once per run and nothing leaks between runs in the same process.
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use chunkbench::bench::{run, BenchmarkConfig, WriteStrategy};
//! let config = BenchmarkConfig::builder()
//!     .nx(1024)
//!     .ny(1024)
//!     .n_images(1000)
//!     .chunk_size(10)
//!     .basename("/tmp/bench")
//!     .strategy(WriteStrategy::Traditional)
//!     .build()?;
//! let result = run(&config)?;
//! println!("{:.0}%", result.metrics().relative_performance);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod container_writer;
pub mod host;
pub mod raw_writer;
pub mod report;
pub mod timing;
pub mod verify;
mod workload;

use std::collections::TryReserveError;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chunkbench_codec::filter::passthrough::{self, PassthroughLatch};
use chunkbench_codec::{FilterDirection, FilterRegistry};
use chunkbench_storage::store::FileStoreCreateError;
use thiserror::Error;

pub use self::config::{BenchmarkConfig, BenchmarkConfigBuilder, ConfigError, WriteStrategy, MAX_IMAGE_DIM};
pub use self::host::HostInfo;
pub use self::report::{FilterCalls, JsonRecord, Metrics, RunResult};
pub use self::timing::TimingSample;
pub use self::verify::VerifyError;
pub use self::workload::WorkloadBuffer;
use crate::container::{ArraySubsetError, ContainerCreateError, ContainerError, DirectWriteError};

/// A benchmark error. Every error is fatal to the run.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The workload buffer could not be allocated.
    #[error("failed to allocate a buffer of {len} bytes: {source}")]
    Allocation {
        /// The requested size.
        len: usize,
        /// The allocation error.
        #[source]
        source: TryReserveError,
    },
    /// An output of a previous run could not be removed.
    #[error("failed to remove {path}: {source}")]
    RemoveStale {
        /// The path.
        path: PathBuf,
        /// The IO error.
        #[source]
        source: io::Error,
    },
    /// The raw file could not be created, written, or closed.
    #[error("raw write to {path} failed: {source}")]
    RawIo {
        /// The path.
        path: PathBuf,
        /// The IO error.
        #[source]
        source: io::Error,
    },
    /// A raw write was short.
    #[error("raw write to {path} was short: wrote {written} of {expected} bytes")]
    ShortWrite {
        /// The path.
        path: PathBuf,
        /// The number of bytes written.
        written: usize,
        /// The number of bytes requested.
        expected: usize,
    },
    /// The container file could not be opened.
    #[error(transparent)]
    ContainerFile(#[from] FileStoreCreateError),
    /// The container could not be created or opened.
    #[error(transparent)]
    ContainerCreate(#[from] ContainerCreateError),
    /// A container operation failed.
    #[error(transparent)]
    Container(#[from] ContainerError),
    /// A chunk region could not be selected.
    #[error(transparent)]
    ArraySubset(#[from] ArraySubsetError),
    /// A direct chunk write failed.
    #[error("direct write of chunk {chunk} failed: {source}")]
    DirectWrite {
        /// The chunk number.
        chunk: u64,
        /// The direct write error.
        #[source]
        source: DirectWriteError,
    },
    /// The read-back check failed.
    #[error(transparent)]
    Verify(#[from] VerifyError),
    /// The size of an output file could not be read.
    #[error("failed to stat {path}: {source}")]
    FileSize {
        /// The path.
        path: PathBuf,
        /// The IO error.
        #[source]
        source: io::Error,
    },
    /// The report could not be written.
    #[error("failed to write the report: {0}")]
    Report(#[source] io::Error),
    /// The JSON record could not be appended.
    #[error("failed to append the JSON record to {path}: {source}")]
    Json {
        /// The path.
        path: PathBuf,
        /// The IO error.
        #[source]
        source: io::Error,
    },
}

/// Run the benchmark described by `config`, printing the report to standard output.
///
/// # Errors
/// Returns a [`BenchError`] on the first failure of any phase.
pub fn run(config: &BenchmarkConfig) -> Result<RunResult, BenchError> {
    run_with_output(config, &mut io::stdout().lock())
}

/// Run the benchmark described by `config`, writing the report to `out`.
///
/// # Errors
/// Returns a [`BenchError`] on the first failure of any phase.
pub fn run_with_output(
    config: &BenchmarkConfig,
    out: &mut impl Write,
) -> Result<RunResult, BenchError> {
    let raw_path = config.raw_path();
    let container_path = config.container_path();

    let mut buffer = WorkloadBuffer::new(config.chunk_bytes(), config.sentinel())?;
    remove_stale(&raw_path)?;
    remove_stale(&container_path)?;

    let host = config.node_info().then(HostInfo::detect);
    report::write_params(out, config, host.as_ref()).map_err(BenchError::Report)?;

    writeln!(out, "# start raw writes ...").map_err(BenchError::Report)?;
    let raw = raw_writer::write_raw(&raw_path, &buffer, config.ncalls(), config.cpu_time())?;
    writeln!(out, "# raw write done").map_err(BenchError::Report)?;
    writeln!(out, "# elapsed time for raw writes: {:.3}s", raw.wall).map_err(BenchError::Report)?;

    let latch = Arc::new(PassthroughLatch::new());
    let registry = FilterRegistry::new();
    registry.register(passthrough::runtime_plugin(latch.clone()));

    writeln!(out, "# start h5 writes ({}) ...", config.strategy()).map_err(BenchError::Report)?;
    let container = container_writer::write_container(config, &buffer, &registry)?;
    writeln!(out, "# h5 write done").map_err(BenchError::Report)?;
    writeln!(out, "# elapsed time for h5 writes: {:.3}s", container.wall)
        .map_err(BenchError::Report)?;

    verify::verify_first_chunk(&container_path, &registry, config.sentinel(), &mut buffer)?;
    writeln!(out, "# read-back of the first chunk verified").map_err(BenchError::Report)?;

    let result = RunResult {
        strategy: config.strategy(),
        ncalls: config.ncalls(),
        chunk_bytes: config.chunk_bytes() as u64,
        total_bytes: config.total_bytes(),
        raw,
        container,
        raw_file_size: file_size(&raw_path)?,
        container_file_size: file_size(&container_path)?,
        filter_calls: FilterCalls {
            forward: latch.calls(FilterDirection::Forward),
            reverse: latch.calls(FilterDirection::Reverse),
        },
    };
    let metrics = result.metrics();
    report::write_results(out, &result, &metrics).map_err(BenchError::Report)?;

    if let Some(json) = config.json() {
        JsonRecord::new(config, host.as_ref(), &result, &metrics)
            .append_to(json)
            .map_err(|source| BenchError::Json {
                path: json.to_path_buf(),
                source,
            })?;
    }
    Ok(result)
}

fn remove_stale(path: &Path) -> Result<(), BenchError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BenchError::RemoveStale {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn file_size(path: &Path) -> Result<u64, BenchError> {
    std::fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|source| BenchError::FileSize {
            path: path.to_path_buf(),
            source,
        })
}
