//! Container data types and fill values.
//!
//! Elements are stored little-endian.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A fixed-size integer data type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// `uint8` Integer in `[0, 2^8-1]`.
    #[display("uint8")]
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    #[display("uint16")]
    UInt16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    #[display("int32")]
    Int32,
    /// `uint32` Integer in `[0, 2^32-1]`.
    #[display("uint32")]
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    #[display("uint64")]
    UInt64,
}

impl DataType {
    /// The size in bytes of one element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 => 4,
            Self::UInt64 => 8,
        }
    }
}

/// The element value of unwritten portions of a container.
///
/// Holds the little-endian bytes of one element.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FillValue(Vec<u8>);

impl FillValue {
    /// Create a fill value from the little-endian bytes of one element.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The bytes of the fill value.
    #[must_use]
    pub fn as_le_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The size in bytes of the fill value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Return `num_elements` repetitions of the fill value.
    #[must_use]
    pub fn repeat(&self, num_elements: usize) -> Vec<u8> {
        if let [byte] = self.0.as_slice() {
            vec![*byte; num_elements]
        } else {
            self.0.repeat(num_elements)
        }
    }
}

macro_rules! impl_fill_value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FillValue {
                fn from(value: $t) -> Self {
                    Self(value.to_le_bytes().to_vec())
                }
            }
        )*
    };
}

impl_fill_value_from!(u8, u16, i32, u32, u64);
