//! The chunk filter API for the `chunkbench` crate.
//!
//! A filter transforms the bytes of a single chunk on their way to storage (the *forward* direction)
//! and back again on their way out of storage (the *reverse* direction).
//! Filters are identified by a numeric [`FilterId`] that is persisted in container metadata.
//!
//! Filters are created by plugins:
//!  - compile-time plugins are registered with [`inventory`](https://docs.rs/inventory/latest/inventory/) via [`FilterPlugin`],
//!  - runtime plugins are registered with a [`FilterRegistry`] instance via [`RuntimeFilterPlugin`].
//!
//! Runtime plugins take precedence, so a caller can swap in a filter instance that carries its own state.
//!
//! Built-in filters live in [`filter`].

pub mod filter;
mod pipeline;
mod plugin;
mod registry;

use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use pipeline::{FilterMask, FilterPipeline, FilterPipelineEntry, MAX_FILTERS};
pub use plugin::{FilterPlugin, PluginCreateError, RuntimeFilterPlugin};
pub use registry::{FilterInfo, FilterRegistrationHandle, FilterRegistry};

/// Chunk bytes flowing through a filter.
pub type RawBytes<'a> = Cow<'a, [u8]>;

/// A numeric filter identifier.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FilterId(u32);

impl FilterId {
    /// Create a new filter identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Return the identifier as an integer.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// The direction a filter is applied in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum FilterDirection {
    /// Outgoing data, applied when a chunk is written.
    #[display("forward")]
    Forward,
    /// Incoming data, applied when a chunk is read.
    #[display("reverse")]
    Reverse,
}

/// How a pipeline treats a filter that fails in the forward direction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterFlags {
    /// A failure aborts the write.
    #[default]
    #[display("mandatory")]
    Mandatory,
    /// A failure skips the filter for that chunk and records it in the chunk's filter mask.
    #[display("optional")]
    Optional,
}

/// Which directions a filter implements.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FilterCapabilities {
    /// The filter can be applied in the forward direction.
    pub encode: bool,
    /// The filter can be applied in the reverse direction.
    pub decode: bool,
}

impl Default for FilterCapabilities {
    fn default() -> Self {
        Self {
            encode: true,
            decode: true,
        }
    }
}

/// Traits for a chunk filter.
pub trait FilterTraits: Debug + Send + Sync {
    /// The identifier of the filter.
    fn id(&self) -> FilterId;

    /// A human readable name, used in diagnostics and metadata.
    fn name(&self) -> &str;

    /// The directions this filter implements.
    fn capabilities(&self) -> FilterCapabilities {
        FilterCapabilities::default()
    }

    /// Client data parameters persisted alongside the filter identifier.
    fn client_data(&self) -> Vec<u32> {
        Vec::new()
    }

    /// Apply the filter in the forward direction.
    ///
    /// # Errors
    /// Returns a [`FilterError`] if the filter fails.
    fn encode<'a>(&self, decoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError>;

    /// Apply the filter in the reverse direction.
    ///
    /// # Errors
    /// Returns a [`FilterError`] if the filter fails, for example on a checksum mismatch.
    fn decode<'a>(&self, encoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError>;

    /// Apply the filter in `direction`.
    ///
    /// # Errors
    /// Returns a [`FilterError`] if the filter fails.
    fn apply<'a>(
        &self,
        direction: FilterDirection,
        value: RawBytes<'a>,
    ) -> Result<RawBytes<'a>, FilterError> {
        match direction {
            FilterDirection::Forward => self.encode(value),
            FilterDirection::Reverse => self.decode(value),
        }
    }

    /// The encoded size of a chunk with `decoded_size` bytes, if it is fixed.
    fn encoded_size(&self, decoded_size: u64) -> Option<u64> {
        Some(decoded_size)
    }
}

/// A shared filter instance.
pub type Filter = Arc<dyn FilterTraits>;

/// A filter error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum FilterError {
    /// The filter does not implement the requested direction.
    #[error("filter {id} is not enabled in the {direction} direction")]
    DirectionUnavailable {
        /// The filter identifier.
        id: FilterId,
        /// The requested direction.
        direction: FilterDirection,
    },
    /// An embedded checksum does not match the decoded value.
    #[error("filter {0}: the checksum is invalid")]
    InvalidChecksum(FilterId),
    /// The filter input was malformed.
    #[error("filter {id}: {reason}")]
    InvalidInput {
        /// The filter identifier.
        id: FilterId,
        /// A description of the problem.
        reason: String,
    },
    /// A pipeline cannot hold more filters.
    #[error("a filter pipeline holds at most {} filters", MAX_FILTERS)]
    TooManyFilters,
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for FilterError {
    fn from(err_string: &str) -> Self {
        Self::Other(err_string.to_string())
    }
}

impl From<String> for FilterError {
    fn from(err_string: String) -> Self {
        Self::Other(err_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_id_serde() {
        let id = FilterId::new(400);
        assert_eq!(id.to_string(), "400");
        assert_eq!(serde_json::to_string(&id).unwrap(), "400");
        assert_eq!(serde_json::from_str::<FilterId>("3").unwrap(), FilterId::from(3));
    }

    #[test]
    fn filter_flags_serde() {
        assert_eq!(
            serde_json::to_string(&FilterFlags::Mandatory).unwrap(),
            r#""mandatory""#
        );
        assert_eq!(
            serde_json::from_str::<FilterFlags>(r#""optional""#).unwrap(),
            FilterFlags::Optional
        );
        assert_eq!(FilterDirection::Reverse.to_string(), "reverse");
    }
}
