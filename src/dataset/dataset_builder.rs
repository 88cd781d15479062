//! A dataset builder.

use std::sync::Arc;

use crate::array_subset::ArrayShape;
use crate::codec::{try_create_codec, CodecConfiguration};
use crate::config::CreateDefaults;
use crate::data_type::{cast_elements, DataType};
use crate::format::DataFormat;
use crate::metadata::DatasetMetadata;
use crate::node::NodePath;
use crate::storage::ReadableWritableStorageTraits;

use super::{array_data, ArrayData, Dataset, DatasetCreateError};

/// A [`Dataset`] builder.
///
/// Omitted parameters fall back to [`CreateDefaults`]: the chunk shape
/// becomes `min(shape[d], 64)` per axis and an omitted data type logs a
/// warning and uses `float32`. The default compressor is none (`raw`).
///
/// ```
/// # use std::sync::Arc;
/// # use zn5::dataset::DatasetBuilder;
/// # use zn5::data_type::DataType;
/// # use zn5::format::DataFormat;
/// # use zn5::storage::FilesystemStore;
/// # let tmp = tempfile::TempDir::new()?;
/// let store = Arc::new(FilesystemStore::new(tmp.path().join("c.zarr"))?);
/// let dataset = DatasetBuilder::new(vec![1000, 50])
///     .data_type(DataType::UInt8)
///     .compressor("zlib", serde_json::Map::default())
///     .build(store, DataFormat::Zarr, "/labels")?;
/// assert_eq!(dataset.chunk_shape(), &vec![64, 50]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct DatasetBuilder {
    shape: ArrayShape,
    data_type: Option<DataType>,
    chunk_shape: Option<ArrayShape>,
    fill_value: Option<serde_json::Value>,
    compressor: Option<Option<(String, CodecConfiguration)>>,
    attributes: serde_json::Map<String, serde_json::Value>,
    defaults: CreateDefaults,
}

impl DatasetBuilder {
    /// Create a new dataset builder for an array of `shape`.
    #[must_use]
    pub fn new(shape: ArrayShape) -> Self {
        Self {
            shape,
            data_type: None,
            chunk_shape: None,
            fill_value: None,
            compressor: None,
            attributes: serde_json::Map::default(),
            defaults: CreateDefaults::default(),
        }
    }

    /// Set the data type.
    pub fn data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = Some(data_type);
        self
    }

    /// Set the chunk shape.
    pub fn chunk_shape(&mut self, chunk_shape: ArrayShape) -> &mut Self {
        self.chunk_shape = Some(chunk_shape);
        self
    }

    /// Set the fill value, e.g. `0`, `1.5`, or `"NaN"` for float data types.
    pub fn fill_value(&mut self, fill_value: impl Into<serde_json::Value>) -> &mut Self {
        self.fill_value = Some(fill_value.into());
        self
    }

    /// Set the compressor by canonical identifier with its configuration.
    pub fn compressor(&mut self, identifier: &str, configuration: CodecConfiguration) -> &mut Self {
        self.compressor = Some(Some((identifier.to_string(), configuration)));
        self
    }

    /// Store chunks uncompressed.
    pub fn no_compressor(&mut self) -> &mut Self {
        self.compressor = Some(None);
        self
    }

    /// Set the user attributes.
    pub fn attributes(
        &mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> &mut Self {
        self.attributes = attributes;
        self
    }

    /// Set the creation defaults.
    pub fn defaults(&mut self, defaults: CreateDefaults) -> &mut Self {
        self.defaults = defaults;
        self
    }

    /// Create the dataset at `path` in `storage`.
    ///
    /// Fails without touching the store if `path` already holds a dataset or
    /// group.
    ///
    /// # Errors
    /// Returns a [`DatasetCreateError`] if the node exists, a parameter is
    /// invalid, or storage fails.
    pub fn build<TStorage: ?Sized + ReadableWritableStorageTraits>(
        &self,
        storage: Arc<TStorage>,
        format: DataFormat,
        path: &str,
    ) -> Result<Dataset<TStorage>, DatasetCreateError> {
        let node_path = NodePath::new(path)?;
        for filename in [
            DataFormat::Zarr.array_metadata_filename(),
            DataFormat::Zarr.group_metadata_filename(),
            DataFormat::N5.array_metadata_filename(),
        ] {
            if storage.get(&node_path.key(filename))?.is_some() {
                return Err(DatasetCreateError::NodeExists(node_path));
            }
        }

        let data_type = self.resolved_data_type(path);
        let chunk_shape = match &self.chunk_shape {
            Some(chunk_shape) => chunk_shape.clone(),
            None => self.defaults.chunk_shape(&self.shape),
        };
        let fill_value = match &self.fill_value {
            Some(fill_value) => data_type.fill_value_from_json(fill_value)?,
            None => data_type.default_fill_value(),
        };
        // The n5 metadata document has no fill value field.
        if format == DataFormat::N5 && fill_value != data_type.default_fill_value() {
            log::warn!("the n5 format does not store fill values; dataset {path} will read as zero once reopened");
        }
        let compressor = match &self.compressor {
            Some(compressor) => compressor.clone(),
            None => None,
        };
        if let Some((identifier, configuration)) = &compressor {
            if !format.supports_codec(identifier) {
                return Err(DatasetCreateError::UnsupportedCodec {
                    format,
                    identifier: identifier.clone(),
                });
            }
            try_create_codec(identifier, configuration)?;
        }

        let metadata = DatasetMetadata {
            shape: self.shape.clone(),
            chunk_shape,
            data_type,
            fill_value,
            compressor,
            attributes: self.attributes.clone(),
        };
        let dataset = Dataset::new(storage, node_path, format, metadata)?;

        dataset.storage.set(
            &dataset.path.key(format.array_metadata_filename()),
            &dataset.metadata.to_format_json(format)?,
        )?;
        if format == DataFormat::Zarr && !dataset.metadata.attributes.is_empty() {
            let attributes = serde_json::to_vec_pretty(&dataset.metadata.attributes)
                .map_err(crate::metadata::MetadataError::from)?;
            dataset
                .storage
                .set(&dataset.path.key(format.attributes_filename()), &attributes)?;
        }
        Ok(dataset)
    }

    /// Create the dataset at `path` and write `data` over its full extent.
    ///
    /// The shape is taken from the builder and must match the shape of
    /// `data`. Typed data fixes the data type, and untyped nested data
    /// resolves to `float64`; an explicit conflicting data type is an error
    /// for typed data, while nested numbers are cast to it. A chunk shape
    /// carried by the data is adopted when the builder has none.
    ///
    /// # Errors
    /// Returns a [`DatasetCreateError`] if the data conflicts with the
    /// builder parameters or creation or the initial write fails.
    pub fn build_with_data<TStorage: ?Sized + ReadableWritableStorageTraits>(
        &self,
        storage: Arc<TStorage>,
        format: DataFormat,
        path: &str,
        data: ArrayData,
    ) -> Result<Dataset<TStorage>, DatasetCreateError> {
        let data_shape = data.shape()?;
        if data_shape != self.shape {
            return Err(DatasetCreateError::DataConflict(format!(
                "data shape {data_shape:?} does not match shape {:?}",
                self.shape
            )));
        }
        let mut builder = self.clone();
        match &data {
            ArrayData::Elements { data_type, .. } => match self.data_type {
                Some(explicit) if explicit != *data_type => {
                    return Err(DatasetCreateError::DataConflict(format!(
                        "data of type {data_type} does not match data type {explicit}"
                    )));
                }
                _ => {
                    builder.data_type = Some(*data_type);
                }
            },
            ArrayData::Nested(_) => {
                if self.data_type.is_none() {
                    builder.data_type = Some(DataType::Float64);
                }
            }
        }
        if let Some(data_chunks) = data.chunk_shape() {
            match &self.chunk_shape {
                Some(explicit) if explicit != data_chunks => {
                    return Err(DatasetCreateError::DataConflict(format!(
                        "data chunked as {data_chunks:?} does not match chunk shape {explicit:?}"
                    )));
                }
                _ => {
                    builder.chunk_shape = Some(data_chunks.clone());
                }
            }
        }

        let dataset = builder.build(storage, format, path)?;
        let bytes = match data {
            ArrayData::Elements { bytes, .. } => bytes,
            ArrayData::Nested(value) => {
                let (_, values) = array_data::parse_nested(&value)?;
                cast_elements(
                    DataType::Float64,
                    dataset.data_type(),
                    bytemuck::cast_slice(&values),
                )
            }
        };
        dataset.write_region(&dataset.subset_all(), &bytes)?;
        Ok(dataset)
    }

    fn resolved_data_type(&self, path: &str) -> DataType {
        self.data_type.unwrap_or_else(|| {
            log::warn!(
                "no data type specified for dataset {path}, using {}",
                self.defaults.data_type
            );
            self.defaults.data_type
        })
    }
}
