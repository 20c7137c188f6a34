//! The raw file baseline.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chunkbench_storage::store::close_file;

use super::timing::{Stopwatch, TimingSample};
use super::BenchError;

/// Create or truncate the file at `path` and write `buffer` to it `ncalls` times.
///
/// The timing covers file creation, every write, and closing the file.
///
/// # Errors
/// Returns [`BenchError::RawIo`] if the file cannot be created, a write is short, or the file cannot be closed.
pub fn write_raw(
    path: &Path,
    buffer: &[u8],
    ncalls: u64,
    cpu_time: bool,
) -> Result<TimingSample, BenchError> {
    let raw_io = |source| BenchError::RawIo {
        path: path.to_path_buf(),
        source,
    };

    let stopwatch = Stopwatch::start(cpu_time);
    let mut file = File::create(path).map_err(raw_io)?;
    for _ in 0..ncalls {
        let written = file.write(buffer).map_err(raw_io)?;
        if written != buffer.len() {
            return Err(BenchError::ShortWrite {
                path: path.to_path_buf(),
                written,
                expected: buffer.len(),
            });
        }
    }
    close_file(file).map_err(raw_io)?;
    let sample = stopwatch.stop();

    log::debug!("wrote {ncalls} chunks of {} bytes to {}", buffer.len(), path.display());
    Ok(sample)
}
