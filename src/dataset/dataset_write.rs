//! Region and chunk writes.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use super::{Dataset, DatasetError};
use crate::array_subset::ArraySubset;
use crate::data_type::Element;
use crate::storage::ReadableWritableStorageTraits;

impl<TStorage: ?Sized + ReadableWritableStorageTraits> Dataset<TStorage> {
    /// Store the chunk at `chunk_indices`. `bytes` must hold the
    /// native-endian elements of the truncated chunk subset.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if `chunk_indices` or the buffer size is
    /// invalid, or encoding or storage fails.
    pub fn store_chunk(&self, chunk_indices: &[u64], bytes: Vec<u8>) -> Result<(), DatasetError> {
        let chunk_subset = self.chunk_subset_bounded(chunk_indices)?;
        let expected = self.subset_num_bytes(&chunk_subset);
        if bytes.len() != expected {
            return Err(DatasetError::InvalidBytesLength {
                expected,
                actual: bytes.len(),
            });
        }
        let blob =
            self.format
                .encode_chunk(bytes, chunk_subset.shape(), self.data_type(), &*self.codec)?;
        self.storage.set(&self.chunk_key(chunk_indices), &blob)?;
        Ok(())
    }

    /// Erase the chunk at `chunk_indices`. Succeeds if it is not stored.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if `chunk_indices` is invalid or storage
    /// fails.
    pub fn erase_chunk(&self, chunk_indices: &[u64]) -> Result<(), DatasetError> {
        self.chunk_subset_bounded(chunk_indices)?;
        Ok(self.storage.erase(&self.chunk_key(chunk_indices))?)
    }

    /// Write `bytes` into `region`. The buffer must hold exactly the
    /// row-major native-endian elements of the region, no broadcasting.
    ///
    /// Chunks fully covered by the region are overwritten directly; partially
    /// covered chunks are read (or synthesized from the fill value), updated
    /// and rewritten. Chunks are written concurrently.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the region is out of bounds, the buffer
    /// size does not match, or encoding or storage fails.
    pub fn write_region(&self, region: &ArraySubset, bytes: &[u8]) -> Result<(), DatasetError> {
        self.validate_region(region)?;
        let expected = self.subset_num_bytes(region);
        if bytes.len() != expected {
            return Err(DatasetError::InvalidBytesLength {
                expected,
                actual: bytes.len(),
            });
        }

        let chunks: Vec<Vec<u64>> = region
            .chunks(self.chunk_shape())?
            .iter()
            .map(|(chunk_indices, _)| chunk_indices)
            .collect();
        chunks
            .par_iter()
            .try_for_each(|chunk_indices| self.write_chunk_region(chunk_indices, region, bytes))
    }

    /// Write `elements` into `region`. See [`Dataset::write_region`].
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if `T` does not match the dataset data type
    /// or the write fails.
    pub fn write_region_elements<T: Element>(
        &self,
        region: &ArraySubset,
        elements: &[T],
    ) -> Result<(), DatasetError> {
        if T::DATA_TYPE != self.data_type() {
            return Err(DatasetError::IncompatibleElementType {
                dataset: self.data_type(),
                requested: T::DATA_TYPE,
            });
        }
        self.write_region(region, bytemuck::cast_slice(elements))
    }

    /// Replace the user attributes of the dataset and persist them.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if serialization or storage fails.
    pub fn set_attributes(
        &mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), DatasetError> {
        self.metadata.attributes = attributes;
        let (key, document) = match self.format {
            crate::format::DataFormat::Zarr => (
                self.path.key(self.format.attributes_filename()),
                serde_json::to_vec_pretty(&self.metadata.attributes)
                    .map_err(crate::metadata::MetadataError::from)?,
            ),
            // n5 keeps attributes in the dataset metadata document.
            crate::format::DataFormat::N5 => (
                self.path.key(self.format.array_metadata_filename()),
                self.metadata.to_format_json(self.format)?,
            ),
        };
        self.storage.set(&key, &document)?;
        Ok(())
    }

    /// Write the overlap of `region` with one chunk, reading the prior chunk
    /// first unless the overlap spans the whole chunk.
    fn write_chunk_region(
        &self,
        chunk_indices: &[u64],
        region: &ArraySubset,
        bytes: &[u8],
    ) -> Result<(), DatasetError> {
        let chunk_subset = self.chunk_subset_bounded(chunk_indices)?;
        let overlap = chunk_subset.overlap(region)?;
        let element_size = self.data_type().size();
        let subset_bytes = overlap.relative_to(region.start())?.extract_bytes(
            bytes,
            region.shape(),
            element_size,
        )?;

        let chunk_bytes = if overlap == chunk_subset {
            subset_bytes
        } else {
            let mut chunk_bytes = self.retrieve_chunk(chunk_indices)?;
            overlap.relative_to(chunk_subset.start())?.store_bytes(
                &subset_bytes,
                &mut chunk_bytes,
                chunk_subset.shape(),
                element_size,
            )?;
            chunk_bytes
        };
        self.store_chunk(chunk_indices, chunk_bytes)
    }
}
