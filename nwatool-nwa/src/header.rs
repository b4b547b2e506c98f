use nwatool_common::CodecError;

pub const HEADER_SIZE: usize = 0x2c;

/// The fixed 44-byte header at the start of every NWA stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NwaHeader {
    pub channels: u16,
    pub bits_per_sample: u16,
    pub frequency: u32,
    /// -1 for raw PCM, 0..=5 for DPCM-compressed data.
    pub comp_level: i32,
    pub run_length: bool,
    pub blocks: u32,
    /// Size of the decoded PCM data in bytes.
    pub data_size: u32,
    /// Size of the whole compressed file in bytes.
    pub comp_data_size: u32,
    pub sample_count: u32,
    /// Samples per block, except the last one.
    pub block_size: u32,
    /// Samples in the last block.
    pub rest_size: u32,
}

fn field_i32(buf: &[u8; HEADER_SIZE], offset: usize) -> i32 {
    i32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn field_i16(buf: &[u8; HEADER_SIZE], offset: usize) -> i16 {
    i16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn non_negative(value: i32, name: &str) -> Result<u32, CodecError> {
    u32::try_from(value).map_err(|_| CodecError::UnrecognizedHeader(format!("negative {name}: {value}")))
}

impl NwaHeader {
    pub fn parse(buf: &[u8; HEADER_SIZE]) -> Result<Self, CodecError> {
        let channels = field_i16(buf, 0x00);
        let bits_per_sample = field_i16(buf, 0x02);
        let comp_level = field_i32(buf, 0x08);

        if channels != 1 && channels != 2 {
            return Err(CodecError::UnrecognizedHeader(format!("unsupported channel count {channels}")));
        }
        if bits_per_sample != 8 && bits_per_sample != 16 {
            return Err(CodecError::UnrecognizedHeader(format!("unsupported bits per sample {bits_per_sample}")));
        }
        if !(-1..=5).contains(&comp_level) {
            return Err(CodecError::UnrecognizedHeader(format!("unsupported compression level {comp_level}")));
        }

        let header = NwaHeader {
            channels: channels as u16,
            bits_per_sample: bits_per_sample as u16,
            frequency: non_negative(field_i32(buf, 0x04), "frequency")?,
            comp_level,
            run_length: field_i32(buf, 0x0c) == 1,
            blocks: non_negative(field_i32(buf, 0x10), "block count")?,
            data_size: non_negative(field_i32(buf, 0x14), "data size")?,
            comp_data_size: non_negative(field_i32(buf, 0x18), "compressed size")?,
            sample_count: non_negative(field_i32(buf, 0x1c), "sample count")?,
            block_size: non_negative(field_i32(buf, 0x20), "block size")?,
            rest_size: non_negative(field_i32(buf, 0x24), "last block size")?,
        };

        let expected = u64::from(header.sample_count) * u64::from(header.bytes_per_sample());
        if u64::from(header.data_size) != expected {
            return Err(CodecError::UnrecognizedHeader(format!(
                "data size {} does not match {} samples of {} bits",
                header.data_size, header.sample_count, header.bits_per_sample
            )));
        }

        if header.is_compressed() {
            if header.blocks == 0 {
                return Err(CodecError::UnrecognizedHeader("compressed stream without blocks".into()));
            }
            let declared = u64::from(header.blocks - 1) * u64::from(header.block_size) + u64::from(header.rest_size);
            if declared != u64::from(header.sample_count) {
                return Err(CodecError::UnrecognizedHeader(format!(
                    "{} blocks of {} samples (last {}) do not add up to {} samples",
                    header.blocks, header.block_size, header.rest_size, header.sample_count
                )));
            }
        }
        Ok(header)
    }

    pub fn is_compressed(&self) -> bool {
        self.comp_level != -1
    }

    pub fn bytes_per_sample(&self) -> u32 {
        u32::from(self.bits_per_sample / 8)
    }

    /// Run-length coding is flagged in the header by newer encoders; older
    /// level 5 mono files use it without the flag.
    pub fn uses_run_length(&self) -> bool {
        self.run_length || (self.comp_level == 5 && self.channels != 2)
    }

    /// Decoded byte length of block `index`.
    pub fn block_output_size(&self, index: u32) -> usize {
        let samples = if index + 1 == self.blocks {
            self.rest_size
        } else {
            self.block_size
        };
        samples as usize * self.bytes_per_sample() as usize
    }
}
