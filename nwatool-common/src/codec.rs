use std::io::{self, Read, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unrecognized header: {0}")]
    UnrecognizedHeader(String),

    #[error("corrupt stream: {0}")]
    Corrupt(String),

    #[error("I/O error during decode: {0}")]
    Io(#[from] io::Error),
}

/// A decoder for the compressed audio streams found in `.nwa` files and
/// inside `.nwk` archives.
///
/// `decode` reads `input` to the end and writes the decoded stream to
/// `output`, returning the number of bytes written. It must fail before
/// writing anything when the header is not recognized.
pub trait Codec: Send + Sync {
    fn id(&self) -> &'static str;

    fn decode(&self, input: &mut dyn Read, output: &mut dyn Write) -> Result<u64, CodecError>;
}

/// Copies the input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCodec;

impl Codec for PassthroughCodec {
    fn id(&self) -> &'static str {
        "passthrough"
    }

    fn decode(&self, input: &mut dyn Read, output: &mut dyn Write) -> Result<u64, CodecError> {
        Ok(io::copy(input, output)?)
    }
}
