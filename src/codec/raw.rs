//! The `raw` codec, a passthrough for uncompressed chunks.

use super::{
    CodecConfiguration, CodecError, CodecPlugin, CodecTraits, PluginCreateError,
};

const IDENTIFIER: &str = "raw";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_raw, create_codec_raw)
}

fn is_name_raw(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

#[allow(clippy::unnecessary_wraps)]
fn create_codec_raw(
    _configuration: &CodecConfiguration,
) -> Result<Box<dyn CodecTraits>, PluginCreateError> {
    Ok(Box::new(RawCodec))
}

/// A `raw` codec implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawCodec;

impl CodecTraits for RawCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn configuration(&self) -> CodecConfiguration {
        CodecConfiguration::default()
    }

    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(decoded)
    }

    fn decode(&self, encoded: Vec<u8>, _decoded_len: usize) -> Result<Vec<u8>, CodecError> {
        Ok(encoded)
    }
}
