//! Array subsets.
//!
//! An [`ArraySubset`] is the region-selection type used for every read, write,
//! and rechunk operation: an N-dimensional half-open interval described by a
//! start and a shape. Its [`chunks`](ArraySubset::chunks) iterator is the
//! blocking algorithm that decomposes a selection into the chunks it touches.

mod iterators;

pub use iterators::{Chunks, ChunksIterator, Indices, IndicesIterator};

use derive_more::Display;
use itertools::izip;
use thiserror::Error;

/// The shape of an array or region: one extent per dimension.
pub type ArrayShape = Vec<u64>;

/// Indices of an element or chunk: one coordinate per dimension.
pub type ArrayIndices = Vec<u64>;

/// An array subset.
#[derive(Clone, Eq, PartialEq, Debug, Display, Default)]
#[display("start {start:?} shape {shape:?}")]
pub struct ArraySubset {
    /// The start of the array subset.
    start: ArrayIndices,
    /// The shape of the array subset.
    shape: ArrayShape,
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// An incompatible array shape error.
#[derive(Clone, Debug, Error)]
#[error("array shape {0:?} is incompatible with array subset {1}")]
pub struct IncompatibleArrayShapeError(ArrayShape, ArraySubset);

impl ArraySubset {
    /// Create a new array subset at the origin with `shape`.
    #[must_use]
    pub fn new_with_shape(shape: ArrayShape) -> Self {
        Self {
            start: vec![0; shape.len()],
            shape,
        }
    }

    /// Create a new empty array subset with `dimensionality`.
    #[must_use]
    pub fn new_empty(dimensionality: usize) -> Self {
        Self {
            start: vec![0; dimensionality],
            shape: vec![0; dimensionality],
        }
    }

    /// Create a new array subset from a start and a shape.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the lengths of `start` and `shape` do not match.
    pub fn new_with_start_shape(
        start: ArrayIndices,
        shape: ArrayShape,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == shape.len() {
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError(start.len(), shape.len()))
        }
    }

    /// Create a new array subset from a start and an end (exclusive).
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the lengths of `start` and `end` do not match.
    ///
    /// # Panics
    /// Panics if any element of `end` is less than the matching element of `start`.
    pub fn new_with_start_end_exc(
        start: ArrayIndices,
        end: ArrayIndices,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == end.len() {
            let shape = std::iter::zip(&start, end)
                .map(|(&start, end)| {
                    assert!(end >= start);
                    end - start
                })
                .collect();
            Ok(Self { start, shape })
        } else {
            Err(IncompatibleDimensionalityError(start.len(), end.len()))
        }
    }

    /// Create a new array subset from per-dimension half-open ranges.
    #[must_use]
    pub fn new_with_ranges(ranges: &[std::ops::Range<u64>]) -> Self {
        let start = ranges.iter().map(|range| range.start).collect();
        let shape = ranges
            .iter()
            .map(|range| range.end.saturating_sub(range.start))
            .collect();
        Self { start, shape }
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

    /// Return the dimensionality of the array subset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the end (exclusive) of the array subset.
    #[must_use]
    pub fn end_exc(&self) -> ArrayIndices {
        std::iter::zip(&self.start, &self.shape)
            .map(|(start, size)| start + size)
            .collect()
    }

    /// Return the number of elements of the array subset.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return the number of elements of the array subset as a [`usize`].
    ///
    /// # Panics
    /// Panics if [`num_elements()`](Self::num_elements) is greater than [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Returns true if the array subset contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.contains(&0)
    }

    /// Returns true if the array subset is within the bounds of `array_shape`.
    #[must_use]
    pub fn inbounds(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && izip!(&self.start, &self.shape, array_shape)
                .all(|(start, size, shape)| start + size <= *shape)
    }

    /// Bound the array subset to the domain of an array with `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `array_shape` does not match the dimensionality.
    #[allow(clippy::missing_panics_doc)]
    pub fn bound(&self, array_shape: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        if array_shape.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError(
                array_shape.len(),
                self.dimensionality(),
            ));
        }
        let start: ArrayIndices = std::iter::zip(&self.start, array_shape)
            .map(|(&start, &bound)| start.min(bound))
            .collect();
        let end = std::iter::zip(self.end_exc(), array_shape)
            .map(|(end, &bound)| end.min(bound))
            .collect();
        Ok(Self::new_with_start_end_exc(start, end).expect("dimensionality checked"))
    }

    /// Return the overlap of this array subset with `other`, in the whole-array coordinates shared by both.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the dimensionality of `other` does not match.
    #[allow(clippy::missing_panics_doc)]
    pub fn overlap(&self, other: &Self) -> Result<Self, IncompatibleDimensionalityError> {
        if other.dimensionality() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError(
                other.dimensionality(),
                self.dimensionality(),
            ));
        }
        let start: ArrayIndices = std::iter::zip(&self.start, other.start())
            .map(|(&a, &b)| a.max(b))
            .collect();
        // Disjoint axes clamp to an empty extent rather than underflowing.
        let end = izip!(self.end_exc(), other.end_exc(), &start)
            .map(|(a, b, &start)| a.min(b).max(start))
            .collect();
        Ok(Self::new_with_start_end_exc(start, end).expect("dimensionality checked"))
    }

    /// Translate this array subset so its coordinates are relative to `origin`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `origin` does not match the
    /// dimensionality.
    ///
    /// # Panics
    /// Panics if `origin` exceeds the subset start on any axis.
    pub fn relative_to(&self, origin: &[u64]) -> Result<Self, IncompatibleDimensionalityError> {
        if origin.len() != self.dimensionality() {
            return Err(IncompatibleDimensionalityError(
                origin.len(),
                self.dimensionality(),
            ));
        }
        let start = std::iter::zip(&self.start, origin)
            .map(|(&start, &origin)| {
                assert!(start >= origin);
                start - origin
            })
            .collect();
        Ok(Self {
            start,
            shape: self.shape.clone(),
        })
    }

    /// Return the bytes in this array subset from the bytes of an array with
    /// `array_shape` and `element_size`.
    ///
    /// # Errors
    /// Returns [`IncompatibleArrayShapeError`] if the subset is not within
    /// `array_shape` or the length of `bytes` does not match.
    #[allow(clippy::missing_panics_doc)]
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<Vec<u8>, IncompatibleArrayShapeError> {
        let err = || IncompatibleArrayShapeError(array_shape.to_vec(), self.clone());
        if !self.inbounds(array_shape)
            || bytes.len() as u64 != array_shape.iter().product::<u64>() * element_size as u64
        {
            return Err(err());
        }
        let mut subset_bytes = Vec::with_capacity(self.num_elements_usize() * element_size);
        self.for_each_contiguous_run(array_shape, |offset, length| {
            let byte_offset = usize::try_from(offset).unwrap() * element_size;
            let byte_length = usize::try_from(length).unwrap() * element_size;
            subset_bytes.extend_from_slice(&bytes[byte_offset..byte_offset + byte_length]);
        });
        Ok(subset_bytes)
    }

    /// Store `subset_bytes` into the bytes of an array with `array_shape` and
    /// `element_size`, at this array subset.
    ///
    /// # Errors
    /// Returns [`IncompatibleArrayShapeError`] if the subset is not within
    /// `array_shape` or the byte lengths do not match.
    #[allow(clippy::missing_panics_doc)]
    pub fn store_bytes(
        &self,
        subset_bytes: &[u8],
        array_bytes: &mut [u8],
        array_shape: &[u64],
        element_size: usize,
    ) -> Result<(), IncompatibleArrayShapeError> {
        let err = || IncompatibleArrayShapeError(array_shape.to_vec(), self.clone());
        if !self.inbounds(array_shape)
            || array_bytes.len() as u64 != array_shape.iter().product::<u64>() * element_size as u64
            || subset_bytes.len() as u64 != self.num_elements() * element_size as u64
        {
            return Err(err());
        }
        let mut subset_offset = 0;
        self.for_each_contiguous_run(array_shape, |offset, length| {
            let byte_offset = usize::try_from(offset).unwrap() * element_size;
            let byte_length = usize::try_from(length).unwrap() * element_size;
            array_bytes[byte_offset..byte_offset + byte_length]
                .copy_from_slice(&subset_bytes[subset_offset..subset_offset + byte_length]);
            subset_offset += byte_length;
        });
        Ok(())
    }

    /// Fill this array subset of an array with `array_shape` with copies of `element`.
    ///
    /// # Errors
    /// Returns [`IncompatibleArrayShapeError`] if the subset is not within
    /// `array_shape` or the byte lengths do not match.
    #[allow(clippy::missing_panics_doc)]
    pub fn fill_bytes(
        &self,
        element: &[u8],
        array_bytes: &mut [u8],
        array_shape: &[u64],
    ) -> Result<(), IncompatibleArrayShapeError> {
        let element_size = element.len();
        let err = || IncompatibleArrayShapeError(array_shape.to_vec(), self.clone());
        if !self.inbounds(array_shape)
            || array_bytes.len() as u64 != array_shape.iter().product::<u64>() * element_size as u64
        {
            return Err(err());
        }
        self.for_each_contiguous_run(array_shape, |offset, length| {
            let byte_offset = usize::try_from(offset).unwrap() * element_size;
            for element_bytes in array_bytes[byte_offset..]
                .chunks_exact_mut(element_size)
                .take(usize::try_from(length).unwrap())
            {
                element_bytes.copy_from_slice(element);
            }
        });
        Ok(())
    }

    /// Call `f` with the linearised element offset and length of every
    /// contiguous run of this subset within a row-major array of `array_shape`.
    ///
    /// The subset must be inbounds of `array_shape` (checked by callers).
    fn for_each_contiguous_run(&self, array_shape: &[u64], mut f: impl FnMut(u64, u64)) {
        if self.is_empty() {
            return;
        }

        // Merge trailing dimensions that the subset spans entirely.
        let mut run_length = 1;
        let mut outer_dims = self.dimensionality();
        for (&size, &shape) in std::iter::zip(&self.shape, array_shape).rev() {
            run_length *= size;
            outer_dims -= 1;
            if size != shape {
                break;
            }
        }

        let strides = row_major_strides(array_shape);
        let outer = ArraySubset::new_with_start_shape(
            self.start[..outer_dims].to_vec(),
            self.shape[..outer_dims].to_vec(),
        )
        .expect("lengths match");
        let run_start_offset: u64 = std::iter::zip(&self.start[outer_dims..], &strides[outer_dims..])
            .map(|(&index, &stride)| index * stride)
            .sum();
        for indices in &outer.indices() {
            let offset: u64 = std::iter::zip(&indices, &strides)
                .map(|(&index, &stride)| index * stride)
                .sum();
            f(offset + run_start_offset, run_length);
        }
    }

    /// Returns an iterator over the indices of elements within the subset.
    #[must_use]
    pub fn indices(&self) -> Indices {
        Indices::new(self.clone())
    }

    /// Returns an iterator over the chunks of shape `chunk_shape` overlapping
    /// this array subset.
    ///
    /// All overlapping chunks are returned and they all have the same shape,
    /// so chunk subsets at the end of the array may extend beyond it.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of `chunk_shape`
    /// does not match the dimensionality.
    ///
    /// # Panics
    /// Panics if any element of `chunk_shape` is zero.
    pub fn chunks(&self, chunk_shape: &[u64]) -> Result<Chunks, IncompatibleDimensionalityError> {
        Chunks::new(self, chunk_shape)
    }
}

/// Return the row-major strides (in elements) of an array with `shape`.
#[must_use]
pub(crate) fn row_major_strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_subset_basics() {
        let subset = ArraySubset::new_with_ranges(&[1..3, 2..6]);
        assert_eq!(subset.start(), &[1, 2]);
        assert_eq!(subset.shape(), &[2, 4]);
        assert_eq!(subset.end_exc(), vec![3, 6]);
        assert_eq!(subset.num_elements(), 8);
        assert!(subset.inbounds(&[3, 6]));
        assert!(!subset.inbounds(&[3, 5]));
        assert!(!subset.inbounds(&[3, 6, 1]));
        assert!(ArraySubset::new_with_ranges(&[1..1]).is_empty());
    }

    #[test]
    fn array_subset_overlap_relative_to() {
        let subset = ArraySubset::new_with_ranges(&[0..5, 0..5]);
        let chunk = ArraySubset::new_with_ranges(&[3..6, 3..6]);
        let overlap = subset.overlap(&chunk).unwrap();
        assert_eq!(overlap, ArraySubset::new_with_ranges(&[3..5, 3..5]));
        let local = overlap.relative_to(chunk.start()).unwrap();
        assert_eq!(local, ArraySubset::new_with_ranges(&[0..2, 0..2]));
        let disjoint = subset
            .overlap(&ArraySubset::new_with_ranges(&[7..9, 0..2]))
            .unwrap();
        assert!(disjoint.is_empty());
    }

    #[test]
    fn array_subset_extract_store_bytes() {
        //  0  1  2  3
        //  4  5  6  7
        //  8  9 10 11
        let array: Vec<u8> = (0..12).collect();
        let subset = ArraySubset::new_with_ranges(&[1..3, 1..3]);
        let extracted = subset.extract_bytes(&array, &[3, 4], 1).unwrap();
        assert_eq!(extracted, vec![5, 6, 9, 10]);

        let mut array = array;
        subset
            .store_bytes(&[50, 60, 90, 100], &mut array, &[3, 4], 1)
            .unwrap();
        assert_eq!(array, vec![0, 1, 2, 3, 4, 50, 60, 7, 8, 90, 100, 11]);

        assert!(subset.extract_bytes(&array, &[2, 2], 1).is_err());
    }

    #[test]
    fn array_subset_fill_bytes() {
        let mut array = vec![0u8; 12];
        let subset = ArraySubset::new_with_ranges(&[0..2, 2..4]);
        subset.fill_bytes(&[7], &mut array, &[3, 4]).unwrap();
        assert_eq!(array, vec![0, 0, 7, 7, 0, 0, 7, 7, 0, 0, 0, 0]);
    }

    #[test]
    fn array_subset_contiguous_runs_merge_trailing_dims() {
        let subset = ArraySubset::new_with_ranges(&[1..3, 0..1, 0..2, 0..2]);
        let mut runs = Vec::new();
        subset.for_each_contiguous_run(&[3, 1, 2, 2], |offset, length| runs.push((offset, length)));
        assert_eq!(runs, vec![(4, 8)]);
    }
}
