//! Region and chunk reads.

use super::{Dataset, DatasetError};
use crate::array_subset::ArraySubset;
use crate::data_type::Element;
use crate::storage::ReadableStorageTraits;

impl<TStorage: ?Sized + ReadableStorageTraits> Dataset<TStorage> {
    /// Returns true if the chunk at `chunk_indices` is stored.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if `chunk_indices` is invalid or storage
    /// fails.
    pub fn chunk_exists(&self, chunk_indices: &[u64]) -> Result<bool, DatasetError> {
        self.chunk_subset_bounded(chunk_indices)?;
        Ok(self.storage.exists(&self.chunk_key(chunk_indices))?)
    }

    /// Read the chunk at `chunk_indices` if it is stored, as native-endian
    /// element bytes of the truncated chunk subset.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if `chunk_indices` is invalid, the blob is
    /// malformed, or storage fails.
    pub fn retrieve_chunk_if_exists(
        &self,
        chunk_indices: &[u64],
    ) -> Result<Option<Vec<u8>>, DatasetError> {
        let chunk_subset = self.chunk_subset_bounded(chunk_indices)?;
        let Some(blob) = self.storage.get(&self.chunk_key(chunk_indices))? else {
            return Ok(None);
        };
        let bytes = self.format.decode_chunk(
            blob.to_vec(),
            chunk_subset.shape(),
            self.data_type(),
            &*self.codec,
        )?;
        Ok(Some(bytes))
    }

    /// Read the chunk at `chunk_indices`, synthesizing the fill value if it
    /// is not stored.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if `chunk_indices` is invalid, the blob is
    /// malformed, or storage fails.
    pub fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Vec<u8>, DatasetError> {
        match self.retrieve_chunk_if_exists(chunk_indices)? {
            Some(bytes) => Ok(bytes),
            None => {
                let chunk_subset = self.chunk_subset_bounded(chunk_indices)?;
                Ok(self.fill_bytes(&chunk_subset))
            }
        }
    }

    /// Read `region` into a row-major buffer of native-endian element bytes.
    ///
    /// Absent chunks contribute the fill value. A malformed chunk aborts the
    /// whole read.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the region is out of bounds, a chunk is
    /// malformed, or storage fails.
    #[allow(clippy::missing_panics_doc)]
    pub fn read_region(&self, region: &ArraySubset) -> Result<Vec<u8>, DatasetError> {
        self.validate_region(region)?;
        let element_size = self.data_type().size();
        let chunks = region.chunks(self.chunk_shape())?;

        // A region spanning exactly one stored chunk needs no reassembly.
        if chunks.len() == 1 {
            let (chunk_indices, _) = chunks.iter().next().expect("one chunk");
            let chunk_subset = self.chunk_subset_bounded(&chunk_indices)?;
            if chunk_subset == *region {
                return self.retrieve_chunk(&chunk_indices);
            }
        }

        let mut out = self.fill_bytes(region);
        for (chunk_indices, _) in &chunks {
            let Some(chunk_bytes) = self.retrieve_chunk_if_exists(&chunk_indices)? else {
                continue;
            };
            let chunk_subset = self.chunk_subset_bounded(&chunk_indices)?;
            let overlap = chunk_subset.overlap(region)?;
            let extracted = overlap.relative_to(chunk_subset.start())?.extract_bytes(
                &chunk_bytes,
                chunk_subset.shape(),
                element_size,
            )?;
            overlap.relative_to(region.start())?.store_bytes(
                &extracted,
                &mut out,
                region.shape(),
                element_size,
            )?;
        }
        Ok(out)
    }

    /// Read `region` into a row-major vector of elements of type `T`.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if `T` does not match the dataset data type
    /// or the read fails.
    pub fn read_region_elements<T: Element>(
        &self,
        region: &ArraySubset,
    ) -> Result<Vec<T>, DatasetError> {
        if T::DATA_TYPE != self.data_type() {
            return Err(DatasetError::IncompatibleElementType {
                dataset: self.data_type(),
                requested: T::DATA_TYPE,
            });
        }
        let bytes = self.read_region(region)?;
        Ok(bytemuck::allocation::try_cast_vec(bytes)
            .unwrap_or_else(|(_err, bytes)| bytemuck::cast_slice(&bytes).to_vec()))
    }

    /// Read the whole dataset into a row-major vector of elements of type
    /// `T`.
    ///
    /// # Errors
    /// See [`Dataset::read_region_elements`].
    pub fn read_all_elements<T: Element>(&self) -> Result<Vec<T>, DatasetError> {
        self.read_region_elements(&self.subset_all())
    }
}
