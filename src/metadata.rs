//! Dataset and group metadata.
//!
//! [`DatasetMetadata`] is the format-neutral description of a dataset, with
//! row-major shapes and canonical codec identifiers. Conversion to and from
//! the on-disk JSON documents (`.zarray` for zarr, `attributes.json` for n5)
//! lives here, including the axis reversal of n5 metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::array_subset::ArrayShape;
use crate::codec::CodecConfiguration;
use crate::data_type::{DataType, IncompatibleFillValueError, UnsupportedDataTypeError};
use crate::fill_value::FillValue;
use crate::format::DataFormat;

/// The n5 format version written to the root `attributes.json`.
pub const N5_VERSION: &str = "2.0.0";

/// A metadata error.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The JSON document could not be parsed.
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    /// The document parsed but does not describe a supported dataset.
    #[error("invalid dataset metadata: {_0}")]
    Invalid(String),
    /// An unsupported data type name.
    #[error(transparent)]
    UnsupportedDataType(#[from] UnsupportedDataTypeError),
    /// A fill value incompatible with the data type.
    #[error(transparent)]
    IncompatibleFillValue(#[from] IncompatibleFillValueError),
}

/// A compressor in zarr `.zarray` metadata, e.g. `{"id": "zlib", "level": 5}`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ZarrCompressor {
    /// The numcodecs compressor id.
    pub id: String,
    /// The remaining compressor fields.
    #[serde(flatten)]
    pub configuration: CodecConfiguration,
}

/// A zarr v2 `.zarray` document.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ZarrArrayMetadata {
    /// Always 2.
    pub zarr_format: u64,
    /// The array shape.
    pub shape: ArrayShape,
    /// The chunk shape.
    pub chunks: ArrayShape,
    /// The NumPy dtype string, e.g. `"<f4"`.
    pub dtype: String,
    /// The compressor, or `null` for uncompressed data.
    pub compressor: Option<ZarrCompressor>,
    /// The fill value for absent chunks.
    pub fill_value: Value,
    /// The memory layout. Only `"C"` is supported.
    pub order: String,
    /// Numcodecs filters. Not supported, must be `null`.
    #[serde(default)]
    pub filters: Option<Value>,
}

/// A zarr v2 `.zgroup` document.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ZarrGroupMetadata {
    /// Always 2.
    pub zarr_format: u64,
}

impl Default for ZarrGroupMetadata {
    fn default() -> Self {
        Self { zarr_format: 2 }
    }
}

/// A compression in n5 dataset metadata, e.g. `{"type": "gzip", "level": -1}`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct N5Compression {
    /// The n5 compression type.
    #[serde(rename = "type")]
    pub compression_type: String,
    /// The remaining compression fields.
    #[serde(flatten)]
    pub configuration: CodecConfiguration,
}

/// An n5 dataset `attributes.json` document.
///
/// `dimensions` and `blockSize` are stored in reversed (column-major) axis
/// order, the n5 ecosystem convention.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct N5DatasetMetadata {
    /// The array shape, reversed.
    pub dimensions: ArrayShape,
    /// The chunk shape, reversed.
    pub block_size: ArrayShape,
    /// The data type name, e.g. `"uint8"`.
    pub data_type: String,
    /// The compression. Absent in legacy datasets using `compressionType`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<N5Compression>,
    /// The legacy compression field of n5 versions before 2.0.
    #[serde(
        rename = "compressionType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub compression_type: Option<String>,
    /// User attributes, stored alongside the dataset keys.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, Value>,
}

/// Format-neutral dataset metadata. Shapes are row-major and the compressor
/// is a canonical codec identifier with its configuration.
#[derive(Clone, Debug)]
pub struct DatasetMetadata {
    /// The array shape.
    pub shape: ArrayShape,
    /// The chunk shape.
    pub chunk_shape: ArrayShape,
    /// The element data type.
    pub data_type: DataType,
    /// The fill value for absent chunks.
    pub fill_value: FillValue,
    /// The canonical codec identifier and its configuration, or [`None`] for
    /// uncompressed data.
    pub compressor: Option<(String, CodecConfiguration)>,
    /// User attributes. Persisted with the dataset metadata for n5 and in a
    /// separate `.zattrs` document for zarr.
    pub attributes: serde_json::Map<String, Value>,
}

impl DatasetMetadata {
    /// Serialize to the on-disk JSON document of `format`.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if serialization fails.
    pub fn to_format_json(&self, format: DataFormat) -> Result<Vec<u8>, MetadataError> {
        let document = match format {
            DataFormat::Zarr => serde_json::to_vec_pretty(&ZarrArrayMetadata {
                zarr_format: 2,
                shape: self.shape.clone(),
                chunks: self.chunk_shape.clone(),
                dtype: self.data_type.zarr_dtype().to_string(),
                compressor: self.compressor.as_ref().map(|(identifier, configuration)| {
                    ZarrCompressor {
                        id: format.codec_metadata_name(identifier),
                        configuration: configuration.clone(),
                    }
                }),
                fill_value: self.data_type.fill_value_to_json(&self.fill_value),
                order: "C".to_string(),
                filters: None,
            })?,
            DataFormat::N5 => serde_json::to_vec_pretty(&N5DatasetMetadata {
                dimensions: self.shape.iter().rev().copied().collect(),
                block_size: self.chunk_shape.iter().rev().copied().collect(),
                data_type: self.data_type.name().to_string(),
                compression: Some(match &self.compressor {
                    Some((identifier, configuration)) => N5Compression {
                        compression_type: format.codec_metadata_name(identifier),
                        configuration: configuration.clone(),
                    },
                    None => N5Compression {
                        compression_type: "raw".to_string(),
                        configuration: CodecConfiguration::default(),
                    },
                }),
                compression_type: None,
                attributes: self.attributes.clone(),
            })?,
        };
        Ok(document)
    }

    /// Parse the on-disk JSON document of `format`.
    ///
    /// # Errors
    /// Returns a [`MetadataError`] if the document is malformed, describes an
    /// unsupported layout, or uses an unsupported data type.
    pub fn from_format_json(format: DataFormat, document: &[u8]) -> Result<Self, MetadataError> {
        match format {
            DataFormat::Zarr => {
                let metadata: ZarrArrayMetadata = serde_json::from_slice(document)?;
                if metadata.zarr_format != 2 {
                    return Err(MetadataError::Invalid(format!(
                        "zarr_format {} is not supported",
                        metadata.zarr_format
                    )));
                }
                if metadata.order != "C" {
                    return Err(MetadataError::Invalid(format!(
                        "order {:?} is not supported, only \"C\"",
                        metadata.order
                    )));
                }
                if !matches!(metadata.filters, None | Some(Value::Null)) {
                    return Err(MetadataError::Invalid(
                        "filters are not supported".to_string(),
                    ));
                }
                if metadata.shape.len() != metadata.chunks.len() {
                    return Err(MetadataError::Invalid(format!(
                        "shape {:?} and chunks {:?} differ in dimensionality",
                        metadata.shape, metadata.chunks
                    )));
                }
                let data_type = DataType::from_zarr_dtype(&metadata.dtype)?;
                let fill_value = match &metadata.fill_value {
                    Value::Null => data_type.default_fill_value(),
                    fill_value => data_type.fill_value_from_json(fill_value)?,
                };
                Ok(Self {
                    shape: metadata.shape,
                    chunk_shape: metadata.chunks,
                    data_type,
                    fill_value,
                    compressor: metadata.compressor.map(|compressor| {
                        (
                            format.codec_identifier(&compressor.id),
                            compressor.configuration,
                        )
                    }),
                    attributes: serde_json::Map::default(),
                })
            }
            DataFormat::N5 => {
                let metadata: N5DatasetMetadata = serde_json::from_slice(document)?;
                if metadata.dimensions.len() != metadata.block_size.len() {
                    return Err(MetadataError::Invalid(format!(
                        "dimensions {:?} and blockSize {:?} differ in dimensionality",
                        metadata.dimensions, metadata.block_size
                    )));
                }
                let data_type = DataType::from_name(&metadata.data_type)?;
                let compressor = match (&metadata.compression, &metadata.compression_type) {
                    (Some(compression), _) => match compression.compression_type.as_str() {
                        "raw" => None,
                        name => Some((
                            format.codec_identifier(name),
                            compression.configuration.clone(),
                        )),
                    },
                    (None, Some(name)) => match name.as_str() {
                        "raw" => None,
                        name => Some((format.codec_identifier(name), CodecConfiguration::default())),
                    },
                    (None, None) => None,
                };
                Ok(Self {
                    shape: metadata.dimensions.iter().rev().copied().collect(),
                    chunk_shape: metadata.block_size.iter().rev().copied().collect(),
                    data_type,
                    fill_value: data_type.default_fill_value(),
                    compressor,
                    attributes: metadata.attributes,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zarr_array_metadata_roundtrip() {
        let document = br#"{
            "zarr_format": 2,
            "shape": [100, 100],
            "chunks": [10, 10],
            "dtype": "<i4",
            "compressor": {"id": "zlib", "level": 1},
            "fill_value": 42,
            "order": "C",
            "filters": null
        }"#;
        let metadata = DatasetMetadata::from_format_json(DataFormat::Zarr, document).unwrap();
        assert_eq!(metadata.shape, vec![100, 100]);
        assert_eq!(metadata.data_type, DataType::Int32);
        assert_eq!(metadata.fill_value, FillValue::from(42i32));
        let (identifier, configuration) = metadata.compressor.clone().unwrap();
        assert_eq!(identifier, "zlib");
        assert_eq!(configuration.get("level"), Some(&1.into()));

        let reserialized = metadata.to_format_json(DataFormat::Zarr).unwrap();
        let reparsed: ZarrArrayMetadata = serde_json::from_slice(&reserialized).unwrap();
        assert_eq!(reparsed.dtype, "<i4");
        assert_eq!(reparsed.order, "C");
    }

    #[test]
    fn zarr_rejects_fortran_order() {
        let document = br#"{
            "zarr_format": 2,
            "shape": [10],
            "chunks": [10],
            "dtype": "<f4",
            "compressor": null,
            "fill_value": 0,
            "order": "F"
        }"#;
        assert!(DatasetMetadata::from_format_json(DataFormat::Zarr, document).is_err());
    }

    #[test]
    fn n5_metadata_axes_are_reversed() {
        let document = br#"{
            "dimensions": [30, 20, 10],
            "blockSize": [8, 9, 11],
            "dataType": "uint16",
            "compression": {"type": "gzip", "level": -1},
            "note": "kept"
        }"#;
        let metadata = DatasetMetadata::from_format_json(DataFormat::N5, document).unwrap();
        assert_eq!(metadata.shape, vec![10, 20, 30]);
        assert_eq!(metadata.chunk_shape, vec![11, 9, 8]);
        assert_eq!(metadata.data_type, DataType::UInt16);
        assert_eq!(metadata.attributes.get("note"), Some(&"kept".into()));

        let reserialized = metadata.to_format_json(DataFormat::N5).unwrap();
        let reparsed: N5DatasetMetadata = serde_json::from_slice(&reserialized).unwrap();
        assert_eq!(reparsed.dimensions, vec![30, 20, 10]);
        assert_eq!(reparsed.block_size, vec![8, 9, 11]);
    }

    #[test]
    fn n5_legacy_compression_type() {
        let document = br#"{
            "dimensions": [4],
            "blockSize": [2],
            "dataType": "float64",
            "compressionType": "raw"
        }"#;
        let metadata = DatasetMetadata::from_format_json(DataFormat::N5, document).unwrap();
        assert!(metadata.compressor.is_none());
        assert_eq!(metadata.data_type, DataType::Float64);
    }

    #[test]
    fn zarr_bz2_id_maps_to_bzip2() {
        let document = br#"{
            "zarr_format": 2,
            "shape": [10],
            "chunks": [5],
            "dtype": "|u1",
            "compressor": {"id": "bz2", "level": 5},
            "fill_value": null,
            "order": "C"
        }"#;
        let metadata = DatasetMetadata::from_format_json(DataFormat::Zarr, document).unwrap();
        assert_eq!(metadata.compressor.as_ref().unwrap().0, "bzip2");
        let reserialized = metadata.to_format_json(DataFormat::Zarr).unwrap();
        let reparsed: ZarrArrayMetadata = serde_json::from_slice(&reserialized).unwrap();
        assert_eq!(reparsed.compressor.unwrap().id, "bz2");
    }
}
