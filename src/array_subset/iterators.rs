//! Iterators over array subsets.

use std::iter::FusedIterator;

use crate::array_subset::{ArrayIndices, ArraySubset, IncompatibleDimensionalityError};

/// The indices of elements within an array subset, in row-major order
/// (last axis varies fastest).
#[derive(Clone, Debug)]
pub struct Indices {
    subset: ArraySubset,
}

impl Indices {
    /// Create a new indices iterable over `subset`.
    #[must_use]
    pub fn new(subset: ArraySubset) -> Self {
        Self { subset }
    }

    /// Return the number of indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subset.num_elements_usize()
    }

    /// Returns true if there are no indices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a new serial iterator.
    #[must_use]
    pub fn iter(&self) -> IndicesIterator<'_> {
        IndicesIterator::new(&self.subset)
    }
}

impl<'a> IntoIterator for &'a Indices {
    type Item = ArrayIndices;
    type IntoIter = IndicesIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Serial indices iterator. See [`Indices`].
pub struct IndicesIterator<'a> {
    subset: &'a ArraySubset,
    next: Option<ArrayIndices>,
    remaining: usize,
}

impl<'a> IndicesIterator<'a> {
    fn new(subset: &'a ArraySubset) -> Self {
        let remaining = subset.num_elements_usize();
        let next = (remaining > 0).then(|| subset.start().to_vec());
        Self {
            subset,
            next,
            remaining,
        }
    }
}

impl Iterator for IndicesIterator<'_> {
    type Item = ArrayIndices;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.remaining -= 1;

        // Advance the odometer, last axis fastest.
        let mut next = current.clone();
        let start = self.subset.start();
        let end = self.subset.end_exc();
        for axis in (0..next.len()).rev() {
            next[axis] += 1;
            if next[axis] < end[axis] {
                self.next = Some(next);
                return Some(current);
            }
            next[axis] = start[axis];
        }
        // A zero-dimensional subset yields a single empty index.
        self.next = None;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for IndicesIterator<'_> {}

impl FusedIterator for IndicesIterator<'_> {}

/// The chunks of a regular chunk grid overlapping an array subset.
///
/// Iteration yields `(chunk_indices, chunk_subset)` pairs in row-major order,
/// where `chunk_subset` is the chunk's extent in whole-array coordinates.
/// Chunk subsets are not clamped to the array subset or the array shape.
#[derive(Clone, Debug)]
pub struct Chunks {
    chunk_indices: Indices,
    chunk_shape: Vec<u64>,
}

impl Chunks {
    /// Create a new chunks iterable over the chunks of `chunk_shape`
    /// overlapping `subset`.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the length of
    /// `chunk_shape` does not match the dimensionality of `subset`.
    ///
    /// # Panics
    /// Panics if any element of `chunk_shape` is zero.
    pub fn new(
        subset: &ArraySubset,
        chunk_shape: &[u64],
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if chunk_shape.len() != subset.dimensionality() {
            return Err(IncompatibleDimensionalityError::new(
                chunk_shape.len(),
                subset.dimensionality(),
            ));
        }
        assert!(chunk_shape.iter().all(|&c| c > 0));
        let chunk_indices = if subset.is_empty() {
            ArraySubset::new_empty(subset.dimensionality())
        } else {
            let first = std::iter::zip(subset.start(), chunk_shape)
                .map(|(&start, &chunk)| start / chunk)
                .collect();
            let last_exc = std::iter::zip(subset.end_exc(), chunk_shape)
                .map(|(end, &chunk)| (end - 1) / chunk + 1)
                .collect();
            ArraySubset::new_with_start_end_exc(first, last_exc).expect("dimensionality checked")
        };
        Ok(Self {
            chunk_indices: chunk_indices.indices(),
            chunk_shape: chunk_shape.to_vec(),
        })
    }

    /// Return the number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunk_indices.len()
    }

    /// Returns true if there are no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a new serial iterator.
    #[must_use]
    pub fn iter(&self) -> ChunksIterator<'_> {
        ChunksIterator {
            inner: self.chunk_indices.iter(),
            chunk_shape: &self.chunk_shape,
        }
    }
}

impl<'a> IntoIterator for &'a Chunks {
    type Item = (ArrayIndices, ArraySubset);
    type IntoIter = ChunksIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Serial chunks iterator. See [`Chunks`].
pub struct ChunksIterator<'a> {
    inner: IndicesIterator<'a>,
    chunk_shape: &'a [u64],
}

impl ChunksIterator<'_> {
    fn chunk_indices_with_subset(&self, chunk_indices: ArrayIndices) -> (ArrayIndices, ArraySubset) {
        let start = std::iter::zip(&chunk_indices, self.chunk_shape)
            .map(|(&index, &chunk)| index * chunk)
            .collect();
        let chunk_subset = ArraySubset::new_with_start_shape(start, self.chunk_shape.to_vec())
            .expect("dimensionality checked");
        (chunk_indices, chunk_subset)
    }
}

impl Iterator for ChunksIterator<'_> {
    type Item = (ArrayIndices, ArraySubset);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|chunk_indices| self.chunk_indices_with_subset(chunk_indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ChunksIterator<'_> {}

impl FusedIterator for ChunksIterator<'_> {}
