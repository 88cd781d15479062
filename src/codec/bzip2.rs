//! The `bzip2` codec.

use std::io::Read;

use bzip2::read::{BzDecoder, BzEncoder};

use super::{
    CodecConfiguration, CodecError, CodecPlugin, CodecTraits, PluginCreateError,
};

const IDENTIFIER: &str = "bzip2";

// Register the codec.
inventory::submit! {
    CodecPlugin::new(IDENTIFIER, is_name_bzip2, create_codec_bzip2)
}

fn is_name_bzip2(name: &str) -> bool {
    name.eq(IDENTIFIER)
}

fn create_codec_bzip2(
    configuration: &CodecConfiguration,
) -> Result<Box<dyn CodecTraits>, PluginCreateError> {
    // Stored as "level" by zarr tooling and "blockSize" by n5 tooling.
    let level = configuration
        .get("level")
        .or_else(|| configuration.get("blockSize"));
    let level = match level {
        None => 9,
        Some(level) => match level.as_u64() {
            Some(level @ 1..=9) => level as u32,
            _ => {
                return Err(PluginCreateError::ConfigurationInvalid {
                    identifier: IDENTIFIER,
                    reason: format!("block size {level} is not in 1..=9"),
                })
            }
        },
    };
    Ok(Box::new(Bzip2Codec::new(level)))
}

/// A `bzip2` codec implementation.
#[derive(Clone, Debug)]
pub struct Bzip2Codec {
    block_size: u32,
}

impl Bzip2Codec {
    /// Create a new `bzip2` codec with a block size in `1..=9`.
    #[must_use]
    pub const fn new(block_size: u32) -> Self {
        Self { block_size }
    }
}

impl CodecTraits for Bzip2Codec {
    fn identifier(&self) -> &'static str {
        IDENTIFIER
    }

    fn configuration(&self) -> CodecConfiguration {
        let mut configuration = CodecConfiguration::default();
        configuration.insert("level".to_string(), self.block_size.into());
        configuration
    }

    fn encode(&self, decoded: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        let mut encoder = BzEncoder::new(
            decoded.as_slice(),
            bzip2::Compression::new(self.block_size),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn decode(&self, encoded: Vec<u8>, decoded_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut decoder = BzDecoder::new(encoded.as_slice());
        let mut out: Vec<u8> = Vec::with_capacity(decoded_len);
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
