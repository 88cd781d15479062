//! The `gzip` codec.

use std::io::{Cursor, Read};

use flate2::bufread::{GzDecoder, GzEncoder};

use super::{
    CodecConfiguration, CodecError, CodecPlugin, CodecTraits, PluginCreateError,
};

const IDENTIFIER: &str = "gzip";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_gzip, create_codec_gzip)
}

fn is_name_gzip(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_gzip(
    configuration: &CodecConfiguration,
) -> Result<Box<dyn CodecTraits>, PluginCreateError> {
    let level = level_from_configuration(IDENTIFIER, configuration)?;
    Ok(Box::new(GzipCodec::new(level)))
}

/// Read the deflate compression level from `configuration`.
///
/// Accepts levels 0 to 9, or -1 for the library default. An absent level
/// also selects the library default.
pub(crate) fn level_from_configuration(
    identifier: &'static str,
    configuration: &CodecConfiguration,
) -> Result<flate2::Compression, PluginCreateError> {
    match configuration.get("level") {
        None => Ok(flate2::Compression::default()),
        Some(level) => match level.as_i64() {
            Some(-1) => Ok(flate2::Compression::default()),
            Some(level @ 0..=9) => Ok(flate2::Compression::new(level as u32)),
            _ => Err(PluginCreateError::ConfigurationInvalid {
                identifier,
                reason: format!("level {level} is not -1 or in 0..=9"),
            }),
        },
    }
}

/// A `gzip` codec implementation.
#[derive(Clone, Debug)]
pub struct GzipCodec {
    compression: flate2::Compression,
}

impl GzipCodec {
    /// Create a new `gzip` codec.
    #[must_use]
    pub const fn new(compression: flate2::Compression) -> Self {
        Self { compression }
    }
}

impl CodecTraits for GzipCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn configuration(&self) -> CodecConfiguration {
        let mut configuration = CodecConfiguration::default();
        configuration.insert("level".to_string(), self.compression.level().into());
        configuration
    }

    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(Cursor::new(decoded), self.compression);
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded: Vec<u8>, decoded_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut decoder = GzDecoder::new(Cursor::new(encoded));
        let mut out: Vec<u8> = Vec::with_capacity(decoded_len);
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_roundtrip() {
        let data: Vec<u8> = (0..512u32).flat_map(u32::to_le_bytes).collect();
        let codec = GzipCodec::new(flate2::Compression::new(5));
        let encoded = codec.encode(data.clone()).unwrap();
        assert_ne!(encoded, data);
        assert_eq!(codec.decode(encoded, data.len()).unwrap(), data);
    }

    #[test]
    fn gzip_level_validation() {
        let mut configuration = CodecConfiguration::default();
        configuration.insert("level".to_string(), (-1).into());
        assert!(super::create_codec_gzip(&configuration).is_ok());
        configuration.insert("level".to_string(), 10.into());
        assert!(super::create_codec_gzip(&configuration).is_err());
    }
}
