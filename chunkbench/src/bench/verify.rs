//! Read-back verification.

use std::path::Path;
use std::sync::Arc;

use chunkbench_codec::FilterRegistry;
use chunkbench_storage::store::FileStore;
use thiserror::Error;

use super::workload::WorkloadBuffer;
use super::BenchError;
use crate::container::{ArraySubset, Container};

/// A read-back byte did not match the written value.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("read-back mismatch at byte {offset}: got {value}, expected {expected}")]
pub struct VerifyError {
    /// The offset of the first mismatching byte in the chunk.
    pub offset: usize,
    /// The value read back.
    pub value: u8,
    /// The value written.
    pub expected: u8,
}

/// Reopen the container at `path` read only and check that its first chunk holds only `expected`.
///
/// `buffer` is zeroed and then receives the first chunk, it must be exactly one chunk in size.
///
/// # Errors
/// Returns [`BenchError::Verify`] on the first mismatching byte,
/// or another [`BenchError`] if the container cannot be opened or read.
pub fn verify_first_chunk(
    path: &Path,
    registry: &FilterRegistry,
    expected: u8,
    buffer: &mut WorkloadBuffer,
) -> Result<(), BenchError> {
    let storage = Arc::new(FileStore::open_read_only(path)?);
    let container = Container::open(storage, registry)?;

    buffer.fill(0);
    let first_chunk = ArraySubset::new_with_shape(container.chunk_shape());
    container.retrieve_array_subset_into(&first_chunk, buffer)?;

    if let Some((offset, value)) = buffer.first_mismatch(expected) {
        return Err(VerifyError {
            offset,
            value,
            expected,
        }
        .into());
    }
    log::debug!("verified {} bytes of the first chunk of {}", buffer.len(), path.display());
    Ok(())
}
