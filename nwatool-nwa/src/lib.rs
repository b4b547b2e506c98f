// nwatool-nwa/src/lib.rs

pub mod decoder;
pub mod header;
pub mod wav;

use std::io::{Read, Write};

use nwatool_common::{Codec, CodecError};

pub use decoder::decode_nwa;
pub use header::{NwaHeader, HEADER_SIZE};
pub use wav::{wav_header, WAV_HEADER_SIZE};

/// Turns NWA streams into RIFF/WAVE files.
#[derive(Debug, Default, Clone, Copy)]
pub struct NwaCodec;

impl Codec for NwaCodec {
    fn id(&self) -> &'static str {
        "nwa"
    }

    fn decode(&self, input: &mut dyn Read, output: &mut dyn Write) -> Result<u64, CodecError> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        decode_nwa(&data, output)
    }
}
