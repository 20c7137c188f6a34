use std::borrow::Cow;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::{Filter, FilterDirection, FilterError, FilterFlags, RawBytes};

/// The maximum number of filters in a [`FilterPipeline`].
pub const MAX_FILTERS: usize = 32;

/// A per-chunk filter mask.
///
/// Bit `i` set means filter `i` of the pipeline was *not* applied to the stored chunk.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    From,
    Serialize,
    Deserialize,
)]
#[display("{_0:#010x}")]
#[serde(transparent)]
pub struct FilterMask(u32);

impl FilterMask {
    /// A mask where every filter is applied.
    pub const NONE: Self = Self(0);

    /// Create a mask from its bits.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bits of the mask.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns true if filter `index` is skipped.
    #[must_use]
    pub const fn is_skipped(&self, index: usize) -> bool {
        index < MAX_FILTERS && self.0 & (1 << index) != 0
    }

    /// Return the mask with filter `index` skipped.
    #[must_use]
    pub const fn with_skipped(self, index: usize) -> Self {
        if index < MAX_FILTERS {
            Self(self.0 | (1 << index))
        } else {
            self
        }
    }
}

/// A filter and how the pipeline treats its failures.
#[derive(Clone, Debug)]
pub struct FilterPipelineEntry {
    filter: Filter,
    flags: FilterFlags,
}

impl FilterPipelineEntry {
    /// Create a new pipeline entry.
    #[must_use]
    pub fn new(filter: Filter, flags: FilterFlags) -> Self {
        Self { filter, flags }
    }

    /// The filter.
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// The filter flags.
    #[must_use]
    pub const fn flags(&self) -> FilterFlags {
        self.flags
    }
}

/// An ordered chain of filters applied to every chunk.
///
/// Filters are applied first to last when writing and last to first when reading.
#[derive(Clone, Debug, Default)]
pub struct FilterPipeline {
    entries: Vec<FilterPipelineEntry>,
}

impl FilterPipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter.
    ///
    /// # Errors
    /// Returns [`FilterError::TooManyFilters`] if the pipeline already holds [`MAX_FILTERS`] filters.
    pub fn push(&mut self, filter: Filter, flags: FilterFlags) -> Result<(), FilterError> {
        if self.entries.len() >= MAX_FILTERS {
            return Err(FilterError::TooManyFilters);
        }
        self.entries.push(FilterPipelineEntry::new(filter, flags));
        Ok(())
    }

    /// The filters of the pipeline.
    #[must_use]
    pub fn entries(&self) -> &[FilterPipelineEntry] {
        &self.entries
    }

    /// Returns true if the pipeline has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Apply the pipeline in the forward direction.
    ///
    /// Filters skipped by `mask` are not applied.
    /// An optional filter that fails is skipped and added to the returned mask.
    ///
    /// # Errors
    /// Returns a [`FilterError`] if a mandatory filter fails.
    pub fn encode<'a>(
        &self,
        decoded_value: RawBytes<'a>,
        mask: FilterMask,
    ) -> Result<(RawBytes<'a>, FilterMask), FilterError> {
        let mut value = decoded_value;
        let mut mask = mask;
        for (index, entry) in self.entries.iter().enumerate() {
            if mask.is_skipped(index) {
                continue;
            }
            let filter = &entry.filter;
            match entry.flags {
                FilterFlags::Mandatory => {
                    if !filter.capabilities().encode {
                        return Err(FilterError::DirectionUnavailable {
                            id: filter.id(),
                            direction: FilterDirection::Forward,
                        });
                    }
                    value = filter.encode(value)?;
                }
                FilterFlags::Optional => {
                    let encoded = if filter.capabilities().encode {
                        filter
                            .encode(Cow::Borrowed(&*value))
                            .map(Cow::into_owned)
                    } else {
                        Err(FilterError::DirectionUnavailable {
                            id: filter.id(),
                            direction: FilterDirection::Forward,
                        })
                    };
                    match encoded {
                        Ok(encoded) => value = Cow::Owned(encoded),
                        Err(err) => {
                            log::debug!("skipping optional filter {}: {err}", filter.id());
                            mask = mask.with_skipped(index);
                        }
                    }
                }
            }
        }
        Ok((value, mask))
    }

    /// Apply the pipeline in the reverse direction.
    ///
    /// Filters skipped by `mask` are not applied.
    ///
    /// # Errors
    /// Returns a [`FilterError`] if any applied filter fails.
    pub fn decode<'a>(
        &self,
        encoded_value: RawBytes<'a>,
        mask: FilterMask,
    ) -> Result<RawBytes<'a>, FilterError> {
        let mut value = encoded_value;
        for (index, entry) in self.entries.iter().enumerate().rev() {
            if mask.is_skipped(index) {
                continue;
            }
            let filter = &entry.filter;
            if !filter.capabilities().decode {
                return Err(FilterError::DirectionUnavailable {
                    id: filter.id(),
                    direction: FilterDirection::Reverse,
                });
            }
            value = filter.decode(value)?;
        }
        Ok(value)
    }

    /// The encoded size of a chunk with `decoded_size` bytes when no filter is skipped, if it is fixed.
    #[must_use]
    pub fn encoded_size(&self, decoded_size: u64) -> Option<u64> {
        self.entries
            .iter()
            .try_fold(decoded_size, |size, entry| entry.filter.encoded_size(size))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::filter::fletcher32::Fletcher32Filter;
    use crate::{FilterCapabilities, FilterId, FilterTraits};

    #[derive(Debug)]
    struct Failing;

    impl FilterTraits for Failing {
        fn id(&self) -> FilterId {
            FilterId::new(60000)
        }

        fn name(&self) -> &str {
            "failing"
        }

        fn capabilities(&self) -> FilterCapabilities {
            FilterCapabilities {
                encode: true,
                decode: false,
            }
        }

        fn encode<'a>(&self, _decoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError> {
            Err("always fails".into())
        }

        fn decode<'a>(&self, _encoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError> {
            Err("always fails".into())
        }
    }

    #[test]
    fn filter_mask() {
        let mask = FilterMask::NONE.with_skipped(0).with_skipped(3);
        assert_eq!(mask.bits(), 0b1001);
        assert!(mask.is_skipped(0));
        assert!(!mask.is_skipped(1));
        assert!(mask.is_skipped(3));
        assert!(!mask.is_skipped(40));
        assert_eq!(mask.with_skipped(40), mask);
        assert_eq!(mask.to_string(), "0x00000009");
    }

    #[test]
    fn pipeline_optional_failure_is_masked() {
        let mut pipeline = FilterPipeline::new();
        pipeline
            .push(Arc::new(Failing), FilterFlags::Optional)
            .unwrap();
        pipeline
            .push(Arc::new(Fletcher32Filter::new()), FilterFlags::Mandatory)
            .unwrap();

        let data: Vec<u8> = (0..16).collect();
        let (encoded, mask) = pipeline
            .encode(Cow::Borrowed(data.as_slice()), FilterMask::NONE)
            .unwrap();
        assert_eq!(mask, FilterMask::new(1));
        assert_eq!(encoded.len(), 20);

        // The failing filter cannot decode, but it is masked out
        let decoded = pipeline.decode(encoded, mask).unwrap();
        assert_eq!(decoded.as_ref(), data.as_slice());
    }

    #[test]
    fn pipeline_mandatory_failure() {
        let mut pipeline = FilterPipeline::new();
        pipeline
            .push(Arc::new(Failing), FilterFlags::Mandatory)
            .unwrap();
        let data = vec![1u8; 4];
        assert!(pipeline
            .encode(Cow::Borrowed(data.as_slice()), FilterMask::NONE)
            .is_err());
        // Skipped by the caller
        let (encoded, mask) = pipeline
            .encode(Cow::Borrowed(data.as_slice()), FilterMask::new(1))
            .unwrap();
        assert_eq!(mask, FilterMask::new(1));
        assert!(matches!(encoded, Cow::Borrowed(_)));
    }

    #[test]
    fn pipeline_too_many_filters() {
        let mut pipeline = FilterPipeline::new();
        for _ in 0..MAX_FILTERS {
            pipeline
                .push(Arc::new(Fletcher32Filter::new()), FilterFlags::Mandatory)
                .unwrap();
        }
        assert!(matches!(
            pipeline.push(Arc::new(Fletcher32Filter::new()), FilterFlags::Mandatory),
            Err(FilterError::TooManyFilters)
        ));
        assert_eq!(
            pipeline.encoded_size(100),
            Some(100 + 4 * MAX_FILTERS as u64)
        );
    }
}
