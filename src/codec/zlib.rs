//! The `zlib` codec.

use std::io::{Cursor, Read};

use flate2::bufread::{ZlibDecoder, ZlibEncoder};

use super::{
    gzip::level_from_configuration, CodecConfiguration, CodecError, CodecPlugin, CodecTraits,
    PluginCreateError,
};

const IDENTIFIER: &str = "zlib";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_zlib, create_codec_zlib)
}

fn is_name_zlib(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_zlib(
    configuration: &CodecConfiguration,
) -> Result<Box<dyn CodecTraits>, PluginCreateError> {
    let level = level_from_configuration(IDENTIFIER, configuration)?;
    Ok(Box::new(ZlibCodec::new(level)))
}

/// A `zlib` codec implementation.
#[derive(Clone, Debug)]
pub struct ZlibCodec {
    compression: flate2::Compression,
}

impl ZlibCodec {
    /// Create a new `zlib` codec.
    #[must_use]
    pub const fn new(compression: flate2::Compression) -> Self {
        Self { compression }
    }
}

impl CodecTraits for ZlibCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn configuration(&self) -> CodecConfiguration {
        let mut configuration = CodecConfiguration::default();
        configuration.insert("level".to_string(), self.compression.level().into());
        configuration
    }

    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = ZlibEncoder::new(Cursor::new(decoded), self.compression);
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded: Vec<u8>, decoded_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut decoder = ZlibDecoder::new(Cursor::new(encoded));
        let mut out: Vec<u8> = Vec::with_capacity(decoded_len);
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_roundtrip() {
        let data = vec![0u8; 1024];
        let codec = ZlibCodec::new(flate2::Compression::new(1));
        let encoded = codec.encode(data.clone()).unwrap();
        assert!(encoded.len() < data.len());
        assert_eq!(codec.decode(encoded, data.len()).unwrap(), data);
    }
}
