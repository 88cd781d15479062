//! On-disk data formats.
//!
//! [`DataFormat`] gathers everything that differs between the zarr v2 and n5
//! layouts: metadata file names, chunk key encoding, codec naming, byte order
//! and chunk blob framing. Everything above this module is format agnostic.
//!
//! For zarr, a chunk blob is the compressed little-endian element bytes and
//! the chunk key joins the chunk grid indices with `.`, e.g. `1.2.3`.
//!
//! For n5, the chunk key is a nested path with the indices reversed,
//! e.g. `3/2/1`, and the blob carries an uncompressed big-endian header
//! before the compressed big-endian payload:
//! ```text
//! u16 mode (0), u16 ndim, ndim x u32 chunk shape (reversed)
//! ```

use std::path::Path;

use derive_more::Display;
use itertools::Itertools;
use thiserror::Error;

use crate::codec::{CodecError, CodecTraits};
use crate::data_type::DataType;

/// An on-disk data format.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum DataFormat {
    /// The zarr v2 format.
    #[display("zarr")]
    Zarr,
    /// The n5 format.
    #[display("n5")]
    N5,
}

/// An invalid chunk blob error.
#[derive(Debug, Error)]
pub enum ChunkFormatError {
    /// A codec failure.
    #[error(transparent)]
    CodecError(#[from] CodecError),
    /// A malformed or mismatching n5 chunk header.
    #[error("invalid chunk header: {_0}")]
    InvalidHeader(String),
    /// The decoded payload has the wrong size.
    #[error("decoded chunk is {actual} bytes, expected {expected}")]
    UnexpectedLength {
        /// The size implied by the chunk shape and data type.
        expected: usize,
        /// The size actually decoded.
        actual: usize,
    },
}

impl DataFormat {
    /// Infer the format from the extension of `path` (`.zarr`, `.zr`, `.n5`).
    #[must_use]
    pub fn from_path_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("zarr" | "zr") => Some(Self::Zarr),
            Some("n5") => Some(Self::N5),
            _ => None,
        }
    }

    /// The metadata file name of an array node.
    #[must_use]
    pub const fn array_metadata_filename(self) -> &'static str {
        match self {
            Self::Zarr => ".zarray",
            Self::N5 => "attributes.json",
        }
    }

    /// The metadata file name of a group node.
    #[must_use]
    pub const fn group_metadata_filename(self) -> &'static str {
        match self {
            Self::Zarr => ".zgroup",
            Self::N5 => "attributes.json",
        }
    }

    /// The file name holding user attributes.
    #[must_use]
    pub const fn attributes_filename(self) -> &'static str {
        match self {
            Self::Zarr => ".zattrs",
            Self::N5 => "attributes.json",
        }
    }

    /// Encode `chunk_indices` as a chunk key relative to the array node.
    #[must_use]
    pub fn chunk_key(self, chunk_indices: &[u64]) -> String {
        match self {
            Self::Zarr => chunk_indices.iter().join("."),
            Self::N5 => chunk_indices.iter().rev().join("/"),
        }
    }

    /// Returns true if the format supports the codec `identifier`.
    #[must_use]
    pub fn supports_codec(self, identifier: &str) -> bool {
        match self {
            Self::Zarr => matches!(identifier, "raw" | "zlib" | "gzip" | "bzip2" | "zstd"),
            Self::N5 => matches!(identifier, "raw" | "gzip" | "bzip2" | "zstd"),
        }
    }

    /// Translate a compressor name from metadata to a canonical codec
    /// identifier.
    #[must_use]
    pub fn codec_identifier(self, metadata_name: &str) -> String {
        match (self, metadata_name) {
            (Self::Zarr, "bz2") => "bzip2".to_string(),
            _ => metadata_name.to_string(),
        }
    }

    /// Translate a canonical codec identifier to the compressor name stored
    /// in metadata.
    #[must_use]
    pub fn codec_metadata_name(self, identifier: &str) -> String {
        match (self, identifier) {
            (Self::Zarr, "bzip2") => "bz2".to_string(),
            _ => identifier.to_string(),
        }
    }

    /// Encode the native-endian element bytes of a chunk into a blob.
    ///
    /// `chunk_shape` is the stored shape of this particular chunk, clamped to
    /// the array bounds for edge chunks.
    ///
    /// # Errors
    /// Returns a [`ChunkFormatError`] if `bytes` does not match `chunk_shape`
    /// or the codec fails.
    pub fn encode_chunk(
        self,
        mut bytes: Vec<u8>,
        chunk_shape: &[u64],
        data_type: DataType,
        codec: &dyn CodecTraits,
    ) -> Result<Vec<u8>, ChunkFormatError> {
        let expected = chunk_num_bytes(chunk_shape, data_type);
        if bytes.len() != expected {
            return Err(ChunkFormatError::UnexpectedLength {
                expected,
                actual: bytes.len(),
            });
        }
        if self.swaps_endianness() {
            reverse_endianness(&mut bytes, data_type.size());
        }
        let payload = codec.encode(bytes)?;
        match self {
            Self::Zarr => Ok(payload),
            Self::N5 => {
                let mut blob = Vec::with_capacity(4 + 4 * chunk_shape.len() + payload.len());
                blob.extend_from_slice(&0u16.to_be_bytes());
                blob.extend_from_slice(&(chunk_shape.len() as u16).to_be_bytes());
                for &dim in chunk_shape.iter().rev() {
                    blob.extend_from_slice(&(dim as u32).to_be_bytes());
                }
                blob.extend_from_slice(&payload);
                Ok(blob)
            }
        }
    }

    /// Decode a chunk blob into native-endian element bytes.
    ///
    /// # Errors
    /// Returns a [`ChunkFormatError`] if the blob is malformed, disagrees
    /// with `chunk_shape`, or the codec fails.
    #[allow(clippy::missing_panics_doc)]
    pub fn decode_chunk(
        self,
        blob: Vec<u8>,
        chunk_shape: &[u64],
        data_type: DataType,
        codec: &dyn CodecTraits,
    ) -> Result<Vec<u8>, ChunkFormatError> {
        let expected = chunk_num_bytes(chunk_shape, data_type);
        let payload = match self {
            Self::Zarr => blob,
            Self::N5 => {
                let header_len = 4 + 4 * chunk_shape.len();
                if blob.len() < header_len {
                    return Err(ChunkFormatError::InvalidHeader(format!(
                        "blob is {} bytes, header needs {header_len}",
                        blob.len()
                    )));
                }
                let mode = u16::from_be_bytes([blob[0], blob[1]]);
                if mode != 0 {
                    return Err(ChunkFormatError::InvalidHeader(format!(
                        "mode {mode} is not supported"
                    )));
                }
                let ndim = u16::from_be_bytes([blob[2], blob[3]]) as usize;
                if ndim != chunk_shape.len() {
                    return Err(ChunkFormatError::InvalidHeader(format!(
                        "header is {ndim} dimensional, expected {}",
                        chunk_shape.len()
                    )));
                }
                for (axis, &dim) in chunk_shape.iter().rev().enumerate() {
                    let offset = 4 + 4 * axis;
                    let header_dim = u32::from_be_bytes(
                        blob[offset..offset + 4].try_into().expect("4 bytes"),
                    );
                    if u64::from(header_dim) != dim {
                        return Err(ChunkFormatError::InvalidHeader(format!(
                            "header dimension {header_dim} does not match chunk shape {chunk_shape:?}"
                        )));
                    }
                }
                blob[header_len..].to_vec()
            }
        };
        let mut bytes = codec.decode(payload, expected)?;
        if bytes.len() != expected {
            return Err(ChunkFormatError::UnexpectedLength {
                expected,
                actual: bytes.len(),
            });
        }
        if self.swaps_endianness() {
            reverse_endianness(&mut bytes, data_type.size());
        }
        Ok(bytes)
    }

    /// Whether stored bytes differ from native byte order. Zarr v2 datasets
    /// are written little-endian and n5 datasets big-endian.
    const fn swaps_endianness(self) -> bool {
        match self {
            Self::Zarr => cfg!(target_endian = "big"),
            Self::N5 => cfg!(target_endian = "little"),
        }
    }
}

fn chunk_num_bytes(chunk_shape: &[u64], data_type: DataType) -> usize {
    usize::try_from(chunk_shape.iter().product::<u64>()).unwrap() * data_type.size()
}

fn reverse_endianness(bytes: &mut [u8], element_size: usize) {
    if element_size > 1 {
        for element in bytes.chunks_exact_mut(element_size) {
            element.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RawCodec;

    #[test]
    fn path_extension() {
        assert_eq!(
            DataFormat::from_path_extension(Path::new("/data/out.zarr")),
            Some(DataFormat::Zarr)
        );
        assert_eq!(
            DataFormat::from_path_extension(Path::new("out.n5")),
            Some(DataFormat::N5)
        );
        assert_eq!(DataFormat::from_path_extension(Path::new("out.hdf5")), None);
    }

    #[test]
    fn chunk_keys() {
        assert_eq!(DataFormat::Zarr.chunk_key(&[1, 2, 3]), "1.2.3");
        assert_eq!(DataFormat::N5.chunk_key(&[1, 2, 3]), "3/2/1");
        assert_eq!(DataFormat::Zarr.chunk_key(&[4]), "4");
    }

    #[test]
    fn codec_naming() {
        assert_eq!(DataFormat::Zarr.codec_identifier("bz2"), "bzip2");
        assert_eq!(DataFormat::Zarr.codec_metadata_name("bzip2"), "bz2");
        assert_eq!(DataFormat::N5.codec_identifier("bzip2"), "bzip2");
        assert!(DataFormat::Zarr.supports_codec("zlib"));
        assert!(!DataFormat::N5.supports_codec("zlib"));
    }

    #[test]
    fn n5_blob_header() {
        let bytes: Vec<u8> = (0..12u16).flat_map(u16::to_ne_bytes).collect();
        let blob = DataFormat::N5
            .encode_chunk(bytes.clone(), &[3, 4], DataType::UInt16, &RawCodec)
            .unwrap();
        // mode 0, 2 dimensions, shape reversed to (4, 3).
        assert_eq!(&blob[..12], &[0, 0, 0, 2, 0, 0, 0, 4, 0, 0, 0, 3]);
        assert_eq!(blob.len(), 12 + 24);
        let decoded = DataFormat::N5
            .decode_chunk(blob.clone(), &[3, 4], DataType::UInt16, &RawCodec)
            .unwrap();
        assert_eq!(decoded, bytes);

        let mut bad = blob;
        bad[3] = 3;
        assert!(DataFormat::N5
            .decode_chunk(bad, &[3, 4], DataType::UInt16, &RawCodec)
            .is_err());
    }

    #[test]
    fn zarr_blob_is_little_endian() {
        let bytes = 0x0102_0304u32.to_ne_bytes().to_vec();
        let blob = DataFormat::Zarr
            .encode_chunk(bytes, &[1], DataType::UInt32, &RawCodec)
            .unwrap();
        assert_eq!(blob, vec![0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn n5_payload_is_big_endian() {
        let bytes = 0x0102_0304u32.to_ne_bytes().to_vec();
        let blob = DataFormat::N5
            .encode_chunk(bytes, &[1], DataType::UInt32, &RawCodec)
            .unwrap();
        assert_eq!(&blob[8..], &[0x01, 0x02, 0x03, 0x04]);
    }
}
