//! The `fletcher32` checksum filter.
//!
//! Appends a little-endian fletcher32 checksum of the chunk bytes in the forward direction.
//! The reverse direction verifies and strips the checksum.
//!
//! The checksum sums big-endian 16-bit words and is compatible with the HDF5 fletcher32 filter.

use std::borrow::Cow;
use std::sync::Arc;

use crate::{Filter, FilterError, FilterId, FilterPlugin, FilterTraits, PluginCreateError, RawBytes};

const CHECKSUM_SIZE: usize = size_of::<u32>();

// Register the filter.
inventory::submit! {
    FilterPlugin::new(Fletcher32Filter::ID, Fletcher32Filter::NAME, create_filter_fletcher32)
}

fn create_filter_fletcher32(client_data: &[u32]) -> Result<Filter, PluginCreateError> {
    if client_data.is_empty() {
        Ok(Arc::new(Fletcher32Filter::new()))
    } else {
        Err(PluginCreateError::ClientDataInvalid {
            id: Fletcher32Filter::ID,
            client_data: client_data.to_vec(),
        })
    }
}

/// A `fletcher32` checksum filter.
#[derive(Clone, Debug, Default)]
pub struct Fletcher32Filter;

impl Fletcher32Filter {
    /// The filter identifier.
    pub const ID: FilterId = FilterId::new(3);

    /// The filter name.
    pub const NAME: &'static str = "fletcher32";

    /// Create a new `fletcher32` filter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Compute the fletcher32 checksum of `data`.
#[must_use]
pub fn fletcher32(data: &[u8]) -> u32 {
    // 360 words keeps the 32-bit sums from overflowing between folds
    const BLOCK_WORDS: usize = 360;
    let fold = |sum: u32| (sum & 0xffff) + (sum >> 16);

    let mut sum1: u32 = 0;
    let mut sum2: u32 = 0;
    let (words, remainder) = data.split_at(data.len() & !1);
    for block in words.chunks(BLOCK_WORDS * 2) {
        for word in block.chunks_exact(2) {
            sum1 = sum1.wrapping_add(u32::from(u16::from_be_bytes([word[0], word[1]])));
            sum2 = sum2.wrapping_add(sum1);
        }
        sum1 = fold(sum1);
        sum2 = fold(sum2);
    }
    if let [last] = remainder {
        sum1 = sum1.wrapping_add(u32::from(*last) << 8);
        sum2 = sum2.wrapping_add(sum1);
        sum1 = fold(sum1);
        sum2 = fold(sum2);
    }
    sum1 = fold(sum1);
    sum2 = fold(sum2);
    (sum2 << 16) | sum1
}

impl FilterTraits for Fletcher32Filter {
    fn id(&self) -> FilterId {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn encode<'a>(&self, decoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError> {
        let checksum = fletcher32(&decoded_value).to_le_bytes();
        let mut encoded_value = decoded_value.into_owned();
        encoded_value.reserve_exact(CHECKSUM_SIZE);
        encoded_value.extend_from_slice(&checksum);
        Ok(Cow::Owned(encoded_value))
    }

    fn decode<'a>(&self, encoded_value: RawBytes<'a>) -> Result<RawBytes<'a>, FilterError> {
        let Some(decoded_len) = encoded_value.len().checked_sub(CHECKSUM_SIZE) else {
            return Err(FilterError::InvalidInput {
                id: Self::ID,
                reason: format!(
                    "{} bytes is too short to hold a checksum",
                    encoded_value.len()
                ),
            });
        };
        let (decoded, checksum) = encoded_value.split_at(decoded_len);
        let checksum = u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]);
        if fletcher32(decoded) != checksum {
            return Err(FilterError::InvalidChecksum(Self::ID));
        }
        let decoded_value = match encoded_value {
            Cow::Borrowed(bytes) => Cow::Borrowed(&bytes[..decoded_len]),
            Cow::Owned(mut bytes) => {
                bytes.truncate(decoded_len);
                Cow::Owned(bytes)
            }
        };
        Ok(decoded_value)
    }

    fn encoded_size(&self, decoded_size: u64) -> Option<u64> {
        decoded_size.checked_add(CHECKSUM_SIZE as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_fletcher32() {
        let bytes: Vec<u8> = (0..6).collect();
        let filter = Fletcher32Filter::new();

        let encoded = filter.encode(Cow::Borrowed(bytes.as_slice())).unwrap();
        assert_eq!(&encoded[6..], &[9, 6, 14, 8]);
        let decoded = filter.decode(encoded).unwrap();
        assert_eq!(decoded.as_ref(), bytes.as_slice());
    }

    #[test]
    fn filter_fletcher32_odd_length() {
        let bytes: Vec<u8> = (0..5).collect();
        let encoded = Fletcher32Filter::new()
            .encode(Cow::Borrowed(bytes.as_slice()))
            .unwrap();
        assert_eq!(&encoded[5..], &[4, 6, 9, 8]);
    }

    #[test]
    fn filter_fletcher32_multiple_blocks() {
        assert_eq!(fletcher32(&[42; 1000]).to_le_bytes(), [90, 90, 105, 105]);
        assert_eq!(fletcher32(&[]), 0);
    }

    #[test]
    fn filter_fletcher32_corrupt() {
        let filter = Fletcher32Filter::new();
        let mut encoded = filter
            .encode(Cow::Owned(vec![1, 2, 3, 4]))
            .unwrap()
            .into_owned();
        encoded[0] = 0;
        assert!(matches!(
            filter.decode(Cow::Owned(encoded)),
            Err(FilterError::InvalidChecksum(Fletcher32Filter::ID))
        ));
        assert!(matches!(
            filter.decode(Cow::Owned(vec![1, 2])),
            Err(FilterError::InvalidInput { .. })
        ));
    }

    #[test]
    fn filter_fletcher32_client_data() {
        assert!(create_filter_fletcher32(&[]).is_ok());
        assert!(matches!(
            create_filter_fletcher32(&[1]),
            Err(PluginCreateError::ClientDataInvalid { .. })
        ));
    }
}
