//! Array subsets.
//!
//! An [`ArraySubset`] represents a rectangular region (a hyperslab) of a container or chunk.

use std::fmt::Display;
use std::ops::Range;

use itertools::Itertools;
use thiserror::Error;

use super::{ArrayIndices, ArrayShape};

/// An array subset error.
#[derive(Clone, Debug, Error)]
#[allow(missing_docs)]
pub enum ArraySubsetError {
    /// Incompatible dimensionality.
    #[error("incompatible dimensionality {got}, expected {expected}")]
    IncompatibleDimensionality { got: usize, expected: usize },
    /// Incompatible start and shape.
    #[error("incompatible start {start:?} with shape {shape:?}")]
    IncompatibleStartShape {
        start: ArrayIndices,
        shape: ArrayShape,
    },
    /// Incompatible offset.
    #[error("incompatible offset {offset:?} for region with start {start:?}")]
    IncompatibleOffset { start: Vec<u64>, offset: Vec<u64> },
}

/// An array subset.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct ArraySubset {
    start: ArrayIndices,
    shape: ArrayShape,
}

impl Display for ArraySubset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}]",
            self.to_ranges()
                .iter()
                .map(|range| format!("{}..{}", range.start, range.end))
                .join(", ")
        )
    }
}

impl<T: IntoIterator<Item = Range<u64>>> From<T> for ArraySubset {
    fn from(ranges: T) -> Self {
        let (start, shape) = ranges
            .into_iter()
            .map(|range| (range.start, range.end.saturating_sub(range.start)))
            .unzip();
        Self { start, shape }
    }
}

impl ArraySubset {
    /// Create a new array subset from a list of [`Range`]s.
    #[must_use]
    pub fn new_with_ranges(ranges: &[Range<u64>]) -> Self {
        Self::from(ranges.iter().cloned())
    }

    /// Create a new array subset with `shape` starting at the origin.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new array subset.
    ///
    /// # Errors
    /// Returns [`ArraySubsetError`] if the length of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, ArraySubsetError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(ArraySubsetError::IncompatibleStartShape { start, shape })
        }
    }

    /// Return the start of the array subset.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the shape of the array subset.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the end (exclusive) of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start.saturating_add(*size))
            .collect()
    }

    /// Return the array subset as a list of ranges.
    #[must_use]
    pub fn to_ranges(&self) -> Vec<Range<u64>> {
        std::iter::zip(&self.start, self.end_exc())
            .map(|(&start, end)| start..end)
            .collect()
    }

    /// Returns if the array subset is empty (i.e. has a zero element in its shape).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|i| i == &0)
    }

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the number of elements of the array subset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Returns true if the array subset is within the bounds of an array of `array_shape`.
    #[must_use]
    pub fn inbounds_shape(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && itertools::izip!(&self.start, &self.shape, array_shape).all(
                |(&start, &size, &extent)| {
                    start.checked_add(size).is_some_and(|end| end <= extent)
                },
            )
    }

    /// Return the overlapping subset between this array subset and `subset_other`.
    ///
    /// # Errors
    /// Returns [`ArraySubsetError`] if the dimensionality of `subset_other` does not match.
    pub fn overlap(&self, subset_other: &ArraySubset) -> Result<Self, ArraySubsetError> {
        if subset_other.dimensionality() != self.dimensionality() {
            return Err(ArraySubsetError::IncompatibleDimensionality {
                got: subset_other.dimensionality(),
                expected: self.dimensionality(),
            });
        }
        Ok(itertools::izip!(self.to_ranges(), subset_other.to_ranges())
            .map(|(a, b)| {
                let start = a.start.max(b.start);
                let end = a.end.min(b.end).max(start);
                start..end
            })
            .collect::<Vec<_>>()
            .into())
    }

    /// Return the subset relative to `start`.
    ///
    /// # Errors
    /// Returns [`ArraySubsetError`] if `start` does not match the dimensionality or exceeds the subset start.
    pub fn relative_to(&self, start: &[u64]) -> Result<Self, ArraySubsetError> {
        if start.len() != self.dimensionality()
            || std::iter::zip(start, &self.start).any(|(offset, start)| offset > start)
        {
            return Err(ArraySubsetError::IncompatibleOffset {
                start: self.start.clone(),
                offset: start.to_vec(),
            });
        }
        Ok(Self {
            start: std::iter::zip(&self.start, start)
                .map(|(a, b)| a - b)
                .collect(),
            shape: self.shape.clone(),
        })
    }
}

/// Copy the `region` of an array of `src_shape` into the `dst_start` of an array of `dst_shape`.
///
/// Arrays are C-order with `element_size` bytes per element.
/// Trailing dimensions spanned completely by both arrays are merged into a single contiguous copy.
/// The caller guarantees that both regions are in bounds.
pub(crate) fn copy_region(
    src: &[u8],
    src_shape: &[u64],
    region: &ArraySubset,
    dst: &mut [u8],
    dst_shape: &[u64],
    dst_start: &[u64],
    element_size: usize,
) {
    let ndim = src_shape.len();
    let region_shape = region.shape();
    if region.is_empty() {
        return;
    }

    // Find the outermost dimension of the contiguous run
    let mut run_elements: u64 = 1;
    let mut split = ndim;
    while split > 0 {
        let d = split - 1;
        run_elements *= region_shape[d];
        split = d;
        if region_shape[d] != src_shape[d] || region_shape[d] != dst_shape[d] {
            break;
        }
    }
    let run_bytes = to_usize(run_elements) * element_size;

    let src_strides = strides(src_shape);
    let dst_strides = strides(dst_shape);
    let linear = |strides: &[u64], start: &[u64], outer: &[u64]| -> usize {
        let offset: u64 = (0..ndim)
            .map(|d| (start[d] + outer.get(d).copied().unwrap_or(0)) * strides[d])
            .sum();
        to_usize(offset) * element_size
    };

    if split == 0 {
        let src_offset = linear(&src_strides, region.start(), &[]);
        let dst_offset = linear(&dst_strides, dst_start, &[]);
        dst[dst_offset..dst_offset + run_bytes]
            .copy_from_slice(&src[src_offset..src_offset + run_bytes]);
        return;
    }

    for outer in region_shape[..split]
        .iter()
        .map(|&size| 0..size)
        .multi_cartesian_product()
    {
        let src_offset = linear(&src_strides, region.start(), &outer);
        let dst_offset = linear(&dst_strides, dst_start, &outer);
        dst[dst_offset..dst_offset + run_bytes]
            .copy_from_slice(&src[src_offset..src_offset + run_bytes]);
    }
}

/// The C-order element strides of an array of `shape`.
fn strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1; shape.len()];
    for d in (0..shape.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * shape[d + 1];
    }
    strides
}

#[allow(clippy::cast_possible_truncation)]
fn to_usize(value: u64) -> usize {
    value as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset() {
        assert!(ArraySubset::new_with_start_shape(vec![0, 0], vec![10, 10]).is_ok());
        assert!(ArraySubset::new_with_start_shape(vec![0, 0], vec![10]).is_err());
        let subset = ArraySubset::new_with_ranges(&[1..3, 4..10]);
        assert_eq!(subset.start(), &[1, 4]);
        assert_eq!(subset.shape(), &[2, 6]);
        assert_eq!(subset.end_exc(), vec![3, 10]);
        assert_eq!(subset.num_elements(), 12);
        assert_eq!(subset.to_string(), "[1..3, 4..10]");
        assert!(subset.inbounds_shape(&[3, 10]));
        assert!(!subset.inbounds_shape(&[3, 9]));
        assert!(!subset.inbounds_shape(&[3]));
        assert!(ArraySubset::new_with_ranges(&[0..0, 0..2]).is_empty());
    }

    #[test]
    fn array_subset_overlap() {
        let a = ArraySubset::new_with_ranges(&[0..4, 0..4]);
        let b = ArraySubset::new_with_ranges(&[2..6, 3..8]);
        let overlap = a.overlap(&b).unwrap();
        assert_eq!(overlap, ArraySubset::new_with_ranges(&[2..4, 3..4]));
        let c = ArraySubset::new_with_ranges(&[10..12, 0..1]);
        assert!(a.overlap(&c).unwrap().is_empty());
        assert!(a.overlap(&ArraySubset::new_with_ranges(&[0..1])).is_err());

        assert_eq!(
            overlap.relative_to(&[2, 0]).unwrap(),
            ArraySubset::new_with_ranges(&[0..2, 3..4])
        );
        assert!(overlap.relative_to(&[3, 0]).is_err());
    }

    #[test]
    fn copy_region_partial() {
        // 3x4 source, copy rows 1..3 cols 1..3 into the corner of a 2x2 destination
        let src: Vec<u8> = (0..12).collect();
        let mut dst = vec![0u8; 4];
        copy_region(
            &src,
            &[3, 4],
            &ArraySubset::new_with_ranges(&[1..3, 1..3]),
            &mut dst,
            &[2, 2],
            &[0, 0],
            1,
        );
        assert_eq!(dst, vec![5, 6, 9, 10]);
    }

    #[test]
    fn copy_region_contiguous_multibyte() {
        // Full rows of 2-byte elements collapse into one copy
        let src: Vec<u8> = (0..16).collect();
        let mut dst = vec![0u8; 32];
        copy_region(
            &src,
            &[2, 4],
            &ArraySubset::new_with_shape(vec![2, 4]),
            &mut dst,
            &[4, 4],
            &[2, 0],
            2,
        );
        assert_eq!(&dst[..16], &[0; 16]);
        assert_eq!(&dst[16..], src.as_slice());
    }
}
