//! The dataset abstraction.
//!
//! A [`Dataset`] is a chunked N-dimensional array at a [`NodePath`] within a
//! store. Its metadata (shape, chunk shape, data type, fill value,
//! compression, attributes) is fixed at creation through the
//! [`DatasetBuilder`] and read back by [`Dataset::open`], which detects the
//! on-disk format from the metadata files present.
//!
//! Reading and writing happens per region ([`Dataset::read_region`],
//! [`Dataset::write_region`]) or per chunk ([`Dataset::retrieve_chunk`],
//! [`Dataset::store_chunk`]). Absent chunks read as the fill value.

mod array_data;
mod dataset_builder;
mod dataset_read;
mod dataset_write;

pub use array_data::{ArrayData, ArrayDataError};
pub use dataset_builder::DatasetBuilder;

use std::sync::Arc;

use thiserror::Error;

use crate::array_subset::{
    ArrayShape, ArraySubset, IncompatibleArrayShapeError, IncompatibleDimensionalityError,
};
use crate::codec::{try_create_codec, CodecTraits, PluginCreateError, RawCodec};
use crate::data_type::{DataType, IncompatibleFillValueError};
use crate::fill_value::FillValue;
use crate::format::{ChunkFormatError, DataFormat};
use crate::metadata::{DatasetMetadata, MetadataError};
use crate::node::{NodePath, NodePathError};
use crate::storage::{ReadableStorageTraits, StorageError, StoreKey};

/// A dataset.
pub struct Dataset<TStorage: ?Sized> {
    /// The store of the dataset.
    storage: Arc<TStorage>,
    /// The path of the dataset within the store.
    path: NodePath,
    /// The on-disk format.
    format: DataFormat,
    /// The dataset metadata.
    metadata: DatasetMetadata,
    /// The codec decoding and encoding chunk payloads.
    codec: Arc<dyn CodecTraits>,
}

/// A dataset creation or open error.
#[derive(Debug, Error)]
pub enum DatasetCreateError {
    /// The path already holds a dataset or group.
    #[error("node {_0} already exists")]
    NodeExists(NodePath),
    /// The path holds no node.
    #[error("node {_0} does not exist")]
    NodeNotFound(NodePath),
    /// The path holds a group.
    #[error("node {_0} is a group, not a dataset")]
    NotADataset(NodePath),
    /// The shape or chunk shape is unusable.
    #[error("invalid chunk grid: shape {shape:?}, chunk shape {chunk_shape:?}")]
    InvalidChunkGrid {
        /// The array shape.
        shape: ArrayShape,
        /// The chunk shape.
        chunk_shape: ArrayShape,
    },
    /// The compressor is not valid for the format.
    #[error("codec {identifier} is not supported by the {format} format")]
    UnsupportedCodec {
        /// The on-disk format.
        format: DataFormat,
        /// The canonical codec identifier.
        identifier: String,
    },
    /// Supplied data conflicts with explicit creation parameters.
    #[error("array data conflicts with creation parameters: {_0}")]
    DataConflict(String),
    /// The supplied array data is invalid.
    #[error(transparent)]
    ArrayData(#[from] ArrayDataError),
    /// A codec creation error.
    #[error(transparent)]
    PluginCreate(#[from] PluginCreateError),
    /// A metadata error.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// A storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An invalid node path.
    #[error(transparent)]
    NodePath(#[from] NodePathError),
    /// An invalid fill value for the data type.
    #[error(transparent)]
    IncompatibleFillValue(#[from] IncompatibleFillValueError),
    /// A read or write error while storing initial data.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// A dataset read or write error.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A malformed chunk blob or codec failure.
    #[error(transparent)]
    ChunkFormat(#[from] ChunkFormatError),
    /// Chunk indices outside the chunk grid.
    #[error("chunk indices {chunk_indices:?} are outside the chunk grid {grid_shape:?}")]
    InvalidChunkIndices {
        /// The requested chunk indices.
        chunk_indices: Vec<u64>,
        /// The chunk grid shape.
        grid_shape: ArrayShape,
    },
    /// A region not contained in the array.
    #[error("region {region} is not within an array of shape {shape:?}")]
    InvalidRegion {
        /// The requested region.
        region: ArraySubset,
        /// The array shape.
        shape: ArrayShape,
    },
    /// An input buffer of the wrong size.
    #[error("invalid input length {actual}, expected {expected} bytes")]
    InvalidBytesLength {
        /// The size implied by the region and data type.
        expected: usize,
        /// The size supplied.
        actual: usize,
    },
    /// An element type not matching the dataset data type.
    #[error("element type {requested} does not match the dataset data type {dataset}")]
    IncompatibleElementType {
        /// The data type of the dataset.
        dataset: DataType,
        /// The element type requested by the caller.
        requested: DataType,
    },
    /// A dimensionality mismatch.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// A buffer not matching its stated array shape.
    #[error(transparent)]
    IncompatibleArrayShape(#[from] IncompatibleArrayShapeError),
    /// A metadata error.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl<TStorage: ?Sized> Dataset<TStorage> {
    fn new(
        storage: Arc<TStorage>,
        path: NodePath,
        format: DataFormat,
        metadata: DatasetMetadata,
    ) -> Result<Self, DatasetCreateError> {
        if metadata.shape.is_empty()
            || metadata.shape.len() != metadata.chunk_shape.len()
            || metadata.shape.contains(&0)
            || metadata.chunk_shape.contains(&0)
        {
            return Err(DatasetCreateError::InvalidChunkGrid {
                shape: metadata.shape.clone(),
                chunk_shape: metadata.chunk_shape.clone(),
            });
        }
        let codec: Arc<dyn CodecTraits> = match &metadata.compressor {
            Some((identifier, configuration)) => {
                if !format.supports_codec(identifier) {
                    return Err(DatasetCreateError::UnsupportedCodec {
                        format,
                        identifier: identifier.clone(),
                    });
                }
                try_create_codec(identifier, configuration)?
            }
            None => Arc::new(RawCodec),
        };
        Ok(Self {
            storage,
            path,
            format,
            metadata,
            codec,
        })
    }

    /// The path of the dataset within the store.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// The on-disk format of the dataset.
    #[must_use]
    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// The shape of the dataset.
    #[must_use]
    pub fn shape(&self) -> &ArrayShape {
        &self.metadata.shape
    }

    /// The chunk shape of the dataset.
    #[must_use]
    pub fn chunk_shape(&self) -> &ArrayShape {
        &self.metadata.chunk_shape
    }

    /// The data type of the dataset.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.metadata.data_type
    }

    /// The fill value of the dataset.
    #[must_use]
    pub fn fill_value(&self) -> &FillValue {
        &self.metadata.fill_value
    }

    /// The canonical codec identifier and configuration, or [`None`] if the
    /// dataset is uncompressed.
    #[must_use]
    pub fn compressor(&self) -> Option<&(String, crate::codec::CodecConfiguration)> {
        self.metadata.compressor.as_ref()
    }

    /// The user attributes of the dataset.
    #[must_use]
    pub fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata.attributes
    }

    /// The dimensionality of the dataset.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.metadata.shape.len()
    }

    /// The subset spanning the whole dataset.
    #[must_use]
    pub fn subset_all(&self) -> ArraySubset {
        ArraySubset::new_with_shape(self.metadata.shape.clone())
    }

    /// The shape of the chunk grid.
    #[must_use]
    pub fn chunk_grid_shape(&self) -> ArrayShape {
        std::iter::zip(&self.metadata.shape, &self.metadata.chunk_shape)
            .map(|(&shape, &chunk)| shape.div_ceil(chunk))
            .collect()
    }

    /// The store key of the chunk at `chunk_indices`.
    #[must_use]
    pub fn chunk_key(&self, chunk_indices: &[u64]) -> StoreKey {
        self.path.key(&self.format.chunk_key(chunk_indices))
    }

    /// The subset of the chunk at `chunk_indices`, truncated to the array
    /// bounds for edge chunks. This is the extent stored on disk.
    ///
    /// # Errors
    /// Returns [`DatasetError::InvalidChunkIndices`] if `chunk_indices` is
    /// outside the chunk grid.
    #[allow(clippy::missing_panics_doc)]
    pub fn chunk_subset_bounded(&self, chunk_indices: &[u64]) -> Result<ArraySubset, DatasetError> {
        let grid_shape = self.chunk_grid_shape();
        if chunk_indices.len() != grid_shape.len()
            || std::iter::zip(chunk_indices, &grid_shape).any(|(&index, &extent)| index >= extent)
        {
            return Err(DatasetError::InvalidChunkIndices {
                chunk_indices: chunk_indices.to_vec(),
                grid_shape,
            });
        }
        let start: Vec<u64> = std::iter::zip(chunk_indices, &self.metadata.chunk_shape)
            .map(|(&index, &chunk)| index * chunk)
            .collect();
        let shape = itertools::izip!(&start, &self.metadata.chunk_shape, &self.metadata.shape)
            .map(|(&start, &chunk, &extent)| chunk.min(extent - start))
            .collect();
        Ok(ArraySubset::new_with_start_shape(start, shape).expect("equal dimensionality"))
    }

    /// The size in bytes of a subset of this dataset.
    pub(crate) fn subset_num_bytes(&self, subset: &ArraySubset) -> usize {
        subset.num_elements_usize() * self.metadata.data_type.size()
    }

    /// The fill value repeated over `subset`.
    pub(crate) fn fill_bytes(&self, subset: &ArraySubset) -> Vec<u8> {
        self.metadata
            .fill_value
            .as_ne_bytes()
            .repeat(subset.num_elements_usize())
    }

    pub(crate) fn validate_region(&self, region: &ArraySubset) -> Result<(), DatasetError> {
        if region.dimensionality() != self.dimensionality()
            || !std::iter::zip(region.end_exc(), &self.metadata.shape)
                .all(|(end, &extent)| end <= extent)
        {
            return Err(DatasetError::InvalidRegion {
                region: region.clone(),
                shape: self.metadata.shape.clone(),
            });
        }
        Ok(())
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> Dataset<TStorage> {
    /// Open an existing dataset at `path`, detecting the on-disk format from
    /// the metadata files present.
    ///
    /// # Errors
    /// Returns a [`DatasetCreateError`] if there is no dataset at `path` or
    /// its metadata is unsupported.
    pub fn open(storage: Arc<TStorage>, path: &str) -> Result<Self, DatasetCreateError> {
        let node_path = NodePath::new(path)?;
        for format in [DataFormat::Zarr, DataFormat::N5] {
            let key = node_path.key(format.array_metadata_filename());
            if storage.get(&key)?.is_some() {
                return Self::open_with_format(storage, path, format);
            }
        }
        // A zarr group marker means the node exists but is not a dataset.
        if storage
            .get(&node_path.key(DataFormat::Zarr.group_metadata_filename()))?
            .is_some()
        {
            return Err(DatasetCreateError::NotADataset(node_path));
        }
        Err(DatasetCreateError::NodeNotFound(node_path))
    }

    /// Open an existing dataset at `path` with a known `format`.
    ///
    /// # Errors
    /// Returns a [`DatasetCreateError`] if there is no `format` dataset at
    /// `path` or its metadata is unsupported.
    pub fn open_with_format(
        storage: Arc<TStorage>,
        path: &str,
        format: DataFormat,
    ) -> Result<Self, DatasetCreateError> {
        let node_path = NodePath::new(path)?;
        let key = node_path.key(format.array_metadata_filename());
        let Some(document) = storage.get(&key)? else {
            return Err(DatasetCreateError::NodeNotFound(node_path));
        };
        if format == DataFormat::N5 {
            // An attributes.json without "dimensions" marks a group.
            let value: serde_json::Value =
                serde_json::from_slice(&document).map_err(MetadataError::from)?;
            if value.get("dimensions").is_none() {
                return Err(DatasetCreateError::NotADataset(node_path));
            }
        }
        let mut metadata = DatasetMetadata::from_format_json(format, &document)?;
        if format == DataFormat::Zarr {
            let attributes_key = node_path.key(format.attributes_filename());
            if let Some(attributes) = storage.get(&attributes_key)? {
                metadata.attributes =
                    serde_json::from_slice(&attributes).map_err(MetadataError::from)?;
            }
        }
        Self::new(storage, node_path, format, metadata)
    }
}
