use derive_more::{Deref, DerefMut};

use super::BenchError;

/// A chunk-sized buffer filled with a constant byte value.
///
/// The buffer is allocated fallibly, so an oversized workload is reported as [`BenchError::Allocation`] rather than aborting the process.
#[derive(Debug, Clone, PartialEq, Eq, Deref, DerefMut)]
#[deref(forward)]
#[deref_mut(forward)]
pub struct WorkloadBuffer(Vec<u8>);

impl WorkloadBuffer {
    /// Allocate a buffer of `len` bytes and fill it with `value`.
    ///
    /// # Errors
    /// Returns [`BenchError::Allocation`] if the buffer cannot be allocated.
    pub fn new(len: usize, value: u8) -> Result<Self, BenchError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|source| BenchError::Allocation { len, source })?;
        bytes.resize(len, value);
        Ok(Self(bytes))
    }

    /// Overwrite every byte with `value`.
    pub fn fill(&mut self, value: u8) {
        self.0.fill(value);
    }

    /// Return the offset and value of the first byte that is not `value`.
    #[must_use]
    pub fn first_mismatch(&self, value: u8) -> Option<(usize, u8)> {
        self.0
            .iter()
            .position(|&byte| byte != value)
            .map(|offset| (offset, self.0[offset]))
    }
}
