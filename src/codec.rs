//! Compression codecs for chunk payloads.
//!
//! A codec compresses and decompresses the raw bytes of a single chunk.
//! Codecs are registered at compile time with the [inventory] crate and
//! instantiated from a compressor identifier and a JSON configuration map,
//! so the metadata of an existing dataset selects its codec at runtime.
//!
//! The canonical identifiers are `raw`, `zlib`, `gzip`, `bzip2` and `zstd`.
//! On-disk metadata may spell these differently per format, see
//! [`crate::format::DataFormat`].

mod raw;

#[cfg(feature = "bzip2")]
mod bzip2;
#[cfg(feature = "gzip")]
mod gzip;
#[cfg(feature = "gzip")]
mod zlib;
#[cfg(feature = "zstd")]
mod zstd;

pub use raw::RawCodec;

#[cfg(feature = "bzip2")]
pub use bzip2::Bzip2Codec;
#[cfg(feature = "gzip")]
pub use gzip::GzipCodec;
#[cfg(feature = "gzip")]
pub use zlib::ZlibCodec;
#[cfg(feature = "zstd")]
pub use zstd::ZstdCodec;

use std::sync::Arc;

use thiserror::Error;

/// A JSON configuration map for a codec, e.g. `{"level": 5}`.
pub type CodecConfiguration = serde_json::Map<String, serde_json::Value>;

/// Traits for a chunk payload codec.
pub trait CodecTraits: Send + Sync {
    /// The canonical identifier of the codec.
    fn identifier(&self) -> &'static str;

    /// The configuration of the codec, as stored in dataset metadata.
    fn configuration(&self) -> CodecConfiguration;

    /// Encode `decoded` into its compressed representation.
    ///
    /// # Errors
    /// Returns a [`CodecError`] if encoding fails.
    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError>;

    /// Decode `encoded`, with `decoded_len` the expected decoded size in
    /// bytes (a capacity hint, verified by the caller).
    ///
    /// # Errors
    /// Returns a [`CodecError`] if decoding fails.
    fn decode(&self, encoded: Vec<u8>, decoded_len: usize) -> Result<Vec<u8>, CodecError>;
}

/// A codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An IO error from an underlying compression stream.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// Any other codec failure.
    #[error("{_0}")]
    Other(String),
}

impl From<String> for CodecError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// A codec creation error.
#[derive(Debug, Error)]
pub enum PluginCreateError {
    /// The compressor is not registered, or its feature is disabled.
    #[error("codec {name} is not supported")]
    Unsupported {
        /// The requested compressor identifier.
        name: String,
    },
    /// The configuration is invalid for the codec.
    #[error("invalid configuration for codec {identifier}: {reason}")]
    ConfigurationInvalid {
        /// The codec identifier.
        identifier: &'static str,
        /// Why the configuration was rejected.
        reason: String,
    },
}

/// A registered codec.
pub struct CodecPlugin {
    identifier: &'static str,
    match_name_fn: fn(name: &str) -> bool,
    create_fn: fn(configuration: &CodecConfiguration) -> Result<Box<dyn CodecTraits>, PluginCreateError>,
}

inventory::collect!(CodecPlugin);

impl CodecPlugin {
    /// Create a new codec plugin for registration.
    pub const fn new(
        identifier: &'static str,
        match_name_fn: fn(name: &str) -> bool,
        create_fn: fn(configuration: &CodecConfiguration) -> Result<Box<dyn CodecTraits>, PluginCreateError>,
    ) -> Self {
        Self {
            identifier,
            match_name_fn,
            create_fn,
        }
    }
}

/// Create a codec from its canonical `identifier` and `configuration`.
///
/// # Errors
/// Returns [`PluginCreateError::Unsupported`] if no codec matches
/// `identifier`, or a configuration error from the matched codec.
pub fn try_create_codec(
    identifier: &str,
    configuration: &CodecConfiguration,
) -> Result<Arc<dyn CodecTraits>, PluginCreateError> {
    for plugin in inventory::iter::<CodecPlugin> {
        if (plugin.match_name_fn)(identifier) {
            return (plugin.create_fn)(configuration).map(Arc::from);
        }
    }
    Err(PluginCreateError::Unsupported {
        name: identifier.to_string(),
    })
}

/// Return the canonical identifiers of all registered codecs.
#[must_use]
pub fn registered_codecs() -> Vec<&'static str> {
    inventory::iter::<CodecPlugin>
        .into_iter()
        .map(|plugin| plugin.identifier)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry() {
        let codecs = registered_codecs();
        assert!(codecs.contains(&"raw"));
        #[cfg(feature = "gzip")]
        {
            assert!(codecs.contains(&"gzip"));
            assert!(codecs.contains(&"zlib"));
        }
        #[cfg(feature = "bzip2")]
        assert!(codecs.contains(&"bzip2"));
        #[cfg(feature = "zstd")]
        assert!(codecs.contains(&"zstd"));
        assert!(try_create_codec("lz77", &CodecConfiguration::default()).is_err());
    }

    #[test]
    fn roundtrip_all_registered() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        for identifier in registered_codecs() {
            let codec = try_create_codec(identifier, &CodecConfiguration::default()).unwrap();
            let encoded = codec.encode(data.clone()).unwrap();
            let decoded = codec.decode(encoded, data.len()).unwrap();
            assert_eq!(decoded, data, "{identifier}");
        }
    }
}
