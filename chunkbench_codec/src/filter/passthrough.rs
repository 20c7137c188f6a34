//! The `passthrough` filter.
//!
//! Returns chunk bytes unchanged in both directions.
//! The first call in each direction is reported once through [`log::info!`],
//! which makes it possible to tell whether a write path actually invoked the filter pipeline.
//!
//! Call state lives in a [`PassthroughLatch`] shared by every filter instance created from it.
//! The compile-time plugin gives each created filter a fresh latch;
//! use [`runtime_plugin`] to share a latch across a container and observe it afterwards.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    Filter, FilterDirection, FilterError, FilterId, FilterPlugin, FilterTraits, PluginCreateError,
    RawBytes, RuntimeFilterPlugin,
};

// Register the filter.
inventory::submit! {
    FilterPlugin::new(PassthroughFilter::ID, PassthroughFilter::NAME, create_filter_passthrough)
}

fn create_filter_passthrough(_client_data: &[u32]) -> Result<Filter, PluginCreateError> {
    Ok(Arc::new(PassthroughFilter::new()))
}

/// Create a runtime plugin whose filters all share `latch`.
///
/// Client data is accepted and ignored.
#[must_use]
pub fn runtime_plugin(latch: Arc<PassthroughLatch>) -> RuntimeFilterPlugin {
    RuntimeFilterPlugin::new(PassthroughFilter::ID, PassthroughFilter::NAME, move |_| {
        Ok(Arc::new(PassthroughFilter::new_with_latch(latch.clone())) as Filter)
    })
}

/// First-call latches and call counters for a [`PassthroughFilter`].
#[derive(Debug, Default)]
pub struct PassthroughLatch {
    forward_reported: AtomicBool,
    reverse_reported: AtomicBool,
    forward_calls: AtomicU64,
    reverse_calls: AtomicU64,
}

impl PassthroughLatch {
    /// Create a latch with no calls recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reported(&self, direction: FilterDirection) -> &AtomicBool {
        match direction {
            FilterDirection::Forward => &self.forward_reported,
            FilterDirection::Reverse => &self.reverse_reported,
        }
    }

    fn counter(&self, direction: FilterDirection) -> &AtomicU64 {
        match direction {
            FilterDirection::Forward => &self.forward_calls,
            FilterDirection::Reverse => &self.reverse_calls,
        }
    }

    /// Record a call in `direction`.
    ///
    /// Returns true for the first call in that direction only.
    pub fn record(&self, direction: FilterDirection) -> bool {
        self.counter(direction).fetch_add(1, Ordering::Relaxed);
        !self.reported(direction).swap(true, Ordering::AcqRel)
    }

    /// The number of calls recorded in `direction`.
    #[must_use]
    pub fn calls(&self, direction: FilterDirection) -> u64 {
        self.counter(direction).load(Ordering::Relaxed)
    }

    /// Returns true if a call in `direction` has been recorded.
    #[must_use]
    pub fn is_reported(&self, direction: FilterDirection) -> bool {
        self.reported(direction).load(Ordering::Acquire)
    }
}

/// A `passthrough` filter.
#[derive(Clone, Debug, Default)]
pub struct PassthroughFilter {
    latch: Arc<PassthroughLatch>,
}

impl PassthroughFilter {
    /// The filter identifier.
    pub const ID: FilterId = FilterId::new(400);

    /// The filter name.
    pub const NAME: &'static str = "passthrough";

    /// Create a new `passthrough` filter with its own latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new `passthrough` filter sharing `latch`.
    #[must_use]
    pub fn new_with_latch(latch: Arc<PassthroughLatch>) -> Self {
        Self { latch }
    }

    /// The latch of this filter.
    #[must_use]
    pub fn latch(&self) -> &Arc<PassthroughLatch> {
        &self.latch
    }

    fn call<'a>(&self, direction: FilterDirection, value: RawBytes<'a>) -> RawBytes<'a> {
        if self.latch.record(direction) {
            log::info!("passthrough filter called for the first time in {direction} direction");
        }
        value
    }
}

impl FilterTraits for PassthroughFilter {
    fn id(&self) -> FilterId {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn encode<'a>(&self, decoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError> {
        Ok(self.call(FilterDirection::Forward, decoded_value))
    }

    fn decode<'a>(&self, encoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError> {
        Ok(self.call(FilterDirection::Reverse, encoded_value))
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn filter_passthrough() {
        let bytes: Vec<u8> = (0..6).collect();
        let filter = PassthroughFilter::new();

        let encoded = filter.encode(Cow::Borrowed(bytes.as_slice())).unwrap();
        assert!(matches!(encoded, Cow::Borrowed(_)));
        assert_eq!(encoded.as_ref(), bytes.as_slice());
        let decoded = filter.decode(encoded).unwrap();
        assert_eq!(decoded.as_ref(), bytes.as_slice());

        let latch = filter.latch();
        assert_eq!(latch.calls(FilterDirection::Forward), 1);
        assert_eq!(latch.calls(FilterDirection::Reverse), 1);
    }

    #[test]
    fn passthrough_latch() {
        let latch = PassthroughLatch::new();
        assert!(!latch.is_reported(FilterDirection::Forward));
        assert!(latch.record(FilterDirection::Forward));
        assert!(!latch.record(FilterDirection::Forward));
        assert!(latch.is_reported(FilterDirection::Forward));
        assert!(!latch.is_reported(FilterDirection::Reverse));
        assert!(latch.record(FilterDirection::Reverse));
        assert_eq!(latch.calls(FilterDirection::Forward), 2);
    }

    #[test]
    fn passthrough_runtime_plugin_shares_latch() {
        let latch = Arc::new(PassthroughLatch::new());
        let plugin = runtime_plugin(latch.clone());
        let filter_a = plugin.create(&[]).unwrap();
        let filter_b = plugin.create(&[7]).unwrap();
        filter_a.encode(Cow::Owned(vec![1])).unwrap();
        filter_b.encode(Cow::Owned(vec![2])).unwrap();
        assert_eq!(latch.calls(FilterDirection::Forward), 2);
    }
}
