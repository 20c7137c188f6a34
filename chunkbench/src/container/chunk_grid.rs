//! The regular chunk grid.
//!
//! Every chunk has the same shape.
//! Chunks on the upper boundary of a container whose shape is not a multiple of the chunk shape extend past the container,
//! the out of bounds region is never read.

use std::num::NonZeroU64;

use super::{ArrayIndices, ArrayShape, ArraySubset};

/// A regular chunk grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegularChunkGrid {
    chunk_shape: Vec<NonZeroU64>,
}

impl RegularChunkGrid {
    /// Create a new regular chunk grid with chunk shape `chunk_shape`.
    #[must_use]
    pub fn new(chunk_shape: Vec<NonZeroU64>) -> Self {
        Self { chunk_shape }
    }

    /// Return the dimensionality of the chunk grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.chunk_shape.len()
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &[NonZeroU64] {
        &self.chunk_shape
    }

    /// Return the chunk shape as [`u64`]s.
    #[must_use]
    pub fn chunk_shape_u64(&self) -> ArrayShape {
        self.chunk_shape.iter().map(|size| size.get()).collect()
    }

    /// Return the number of elements in a chunk.
    #[must_use]
    pub fn chunk_num_elements(&self) -> u64 {
        self.chunk_shape.iter().map(|size| size.get()).product()
    }

    /// Return the shape of the grid of chunks covering an array of `array_shape`.
    ///
    /// Returns [`None`] if the dimensionality does not match.
    #[must_use]
    pub fn grid_shape(&self, array_shape: &[u64]) -> Option<ArrayShape> {
        (array_shape.len() == self.dimensionality()).then(|| {
            std::iter::zip(array_shape, &self.chunk_shape)
                .map(|(extent, size)| extent.div_ceil(size.get()))
                .collect()
        })
    }

    /// Return the element indices of the origin of the chunk at `chunk_indices`.
    #[must_use]
    pub fn chunk_origin(&self, chunk_indices: &[u64]) -> ArrayIndices {
        std::iter::zip(chunk_indices, &self.chunk_shape)
            .map(|(index, size)| index * size.get())
            .collect()
    }

    /// Return the array subset of the chunk at `chunk_indices`.
    #[must_use]
    pub fn subset(&self, chunk_indices: &[u64]) -> ArraySubset {
        ArraySubset::from(
            std::iter::zip(self.chunk_origin(chunk_indices), &self.chunk_shape)
                .map(|(origin, size)| origin..origin + size.get()),
        )
    }

    /// Return the indices of the chunk containing the element at `array_indices`.
    #[must_use]
    pub fn chunk_indices(&self, array_indices: &[u64]) -> ArrayIndices {
        std::iter::zip(array_indices, &self.chunk_shape)
            .map(|(index, size)| index / size.get())
            .collect()
    }

    /// Returns true if `array_indices` is the origin of a chunk.
    #[must_use]
    pub fn is_chunk_origin(&self, array_indices: &[u64]) -> bool {
        array_indices.len() == self.dimensionality()
            && std::iter::zip(array_indices, &self.chunk_shape)
                .all(|(index, size)| index % size.get() == 0)
    }

    /// Return the subset of chunk indices of the chunks intersecting `array_subset`.
    ///
    /// `array_subset` must not be empty.
    #[must_use]
    pub fn chunks_in_array_subset(&self, array_subset: &ArraySubset) -> ArraySubset {
        ArraySubset::from(
            itertools::izip!(array_subset.start(), array_subset.shape(), &self.chunk_shape).map(
                |(&start, &size, chunk_size)| {
                    let first = start / chunk_size.get();
                    let last = (start + size.saturating_sub(1)) / chunk_size.get();
                    first..last + 1
                },
            ),
        )
    }
}

/// Return the C-order linear index of `indices` in a grid of `shape`.
///
/// Returns [`None`] if `indices` is out of bounds.
#[must_use]
pub fn ravel_indices(indices: &[u64], shape: &[u64]) -> Option<u64> {
    if indices.len() != shape.len() {
        return None;
    }
    let mut index: u64 = 0;
    for (&i, &extent) in std::iter::zip(indices, shape) {
        if i >= extent {
            return None;
        }
        index = index * extent + i;
    }
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_grid(chunk_shape: &[u64]) -> RegularChunkGrid {
        RegularChunkGrid::new(
            chunk_shape
                .iter()
                .map(|&size| NonZeroU64::new(size).unwrap())
                .collect(),
        )
    }

    #[test]
    fn regular_chunk_grid() {
        let chunk_grid = chunk_grid(&[10, 32, 64]);
        assert_eq!(chunk_grid.grid_shape(&[100, 32, 64]), Some(vec![10, 1, 1]));
        assert_eq!(chunk_grid.grid_shape(&[101, 33, 64]), Some(vec![11, 2, 1]));
        assert_eq!(chunk_grid.grid_shape(&[100, 32]), None);
        assert_eq!(chunk_grid.chunk_num_elements(), 10 * 32 * 64);
        assert_eq!(chunk_grid.chunk_origin(&[3, 0, 0]), vec![30, 0, 0]);
        assert_eq!(
            chunk_grid.subset(&[3, 0, 0]),
            ArraySubset::new_with_ranges(&[30..40, 0..32, 0..64])
        );
        assert_eq!(chunk_grid.chunk_indices(&[39, 31, 0]), vec![3, 0, 0]);
        assert!(chunk_grid.is_chunk_origin(&[30, 0, 0]));
        assert!(!chunk_grid.is_chunk_origin(&[31, 0, 0]));
        assert!(!chunk_grid.is_chunk_origin(&[30, 0]));
    }

    #[test]
    fn chunks_in_array_subset() {
        let chunk_grid = chunk_grid(&[2, 2]);
        let subset = ArraySubset::new_with_ranges(&[1..4, 0..2]);
        assert_eq!(
            chunk_grid.chunks_in_array_subset(&subset),
            ArraySubset::new_with_ranges(&[0..2, 0..1])
        );
    }

    #[test]
    fn ravel() {
        assert_eq!(ravel_indices(&[1, 2], &[3, 4]), Some(6));
        assert_eq!(ravel_indices(&[2, 3], &[3, 4]), Some(11));
        assert_eq!(ravel_indices(&[3, 0], &[3, 4]), None);
        assert_eq!(ravel_indices(&[0], &[3, 4]), None);
    }
}
