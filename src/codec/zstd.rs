//! The `zstd` codec.

use super::{
    CodecConfiguration, CodecError, CodecPlugin, CodecTraits, PluginCreateError,
};

const IDENTIFIER: &str = "zstd";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_zstd, create_codec_zstd)
}

fn is_name_zstd(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_zstd(
    configuration: &CodecConfiguration,
) -> Result<Box<dyn CodecTraits>, PluginCreateError> {
    let level = match configuration.get("level") {
        // Level 0 selects the zstd library default.
        None => 0,
        Some(level) => match level.as_i64() {
            Some(level)
                if level >= i64::from(zstd::zstd_safe::min_c_level())
                    && level <= i64::from(zstd::zstd_safe::max_c_level()) =>
            {
                level as i32
            }
            _ => {
                return Err(PluginCreateError::ConfigurationInvalid {
                    identifier: IDENTIFIER,
                    reason: format!("level {level} is out of range"),
                })
            }
        },
    };
    Ok(Box::new(ZstdCodec::new(level)))
}

/// A `zstd` codec implementation.
#[derive(Clone, Debug)]
pub struct ZstdCodec {
    compression_level: i32,
}

impl ZstdCodec {
    /// Create a new `zstd` codec.
    #[must_use]
    pub const fn new(compression_level: i32) -> Self {
        Self { compression_level }
    }
}

impl CodecTraits for ZstdCodec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn configuration(&self) -> CodecConfiguration {
        let mut configuration = CodecConfiguration::default();
        configuration.insert("level".to_string(), self.compression_level.into());
        configuration
    }

    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(zstd::encode_all(
            decoded.as_slice(),
            self.compression_level,
        )?)
    }

    fn decode(&self, encoded: Vec<u8>, decoded_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut out: Vec<u8> = Vec::with_capacity(decoded_len);
        zstd::stream::copy_decode(encoded.as_slice(), &mut out)?;
        Ok(out)
    }
}
