use std::io::Write;

use log::debug;
use nwatool_common::CodecError;

use crate::header::{NwaHeader, HEADER_SIZE};
use crate::wav::{wav_header, WAV_HEADER_SIZE};

/// LSB-first bit reader over one compressed block.
///
/// Reads past the end of the block see zero bytes, the caller stops once
/// `exhausted` reports the cursor has left the block.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    shift: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, pos: 0, shift: 0 }
    }

    fn byte(&self, at: usize) -> u8 {
        self.data.get(at).copied().unwrap_or(0)
    }

    fn read_i8(&mut self) -> i32 {
        let v = self.byte(self.pos) as i8;
        self.pos += 1;
        i32::from(v)
    }

    fn read_i16(&mut self) -> i32 {
        let v = i16::from_le_bytes([self.byte(self.pos), self.byte(self.pos + 1)]);
        self.pos += 2;
        i32::from(v)
    }

    fn bits(&mut self, count: u32) -> i32 {
        if self.shift > 8 {
            self.pos += 1;
            self.shift -= 8;
        }
        let word = u32::from(u16::from_le_bytes([self.byte(self.pos), self.byte(self.pos + 1)]));
        let value = (word >> self.shift) & ((1 << count) - 1);
        self.shift += count;
        value as i32
    }

    fn exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }
}

/// Bit width and shift of a delta code.
#[derive(Clone, Copy)]
struct DeltaCode {
    bits: u32,
    shift: u32,
}

impl DeltaCode {
    /// Codes 1..=6 are small steps, code 7 is the wide step.
    fn for_code(level: i32, code: i32) -> Self {
        let level = level as u32;
        let code = code as u32;
        match (code, level >= 3) {
            (7, true) => DeltaCode { bits: 8, shift: 9 },
            (7, false) => DeltaCode { bits: 8 - level, shift: 9 + level },
            (_, true) => DeltaCode { bits: level + 3, shift: 1 + code },
            (_, false) => DeltaCode { bits: 5 - level, shift: 2 + code + level },
        }
    }

    fn apply(self, reader: &mut BitReader<'_>, sample: &mut i32) {
        let raw = reader.bits(self.bits);
        let sign = 1 << (self.bits - 1);
        let magnitude = (raw & (sign - 1)) << self.shift;
        // Only the low bits reach the output, so corrupt streams may wrap.
        if raw & sign != 0 {
            *sample = sample.wrapping_sub(magnitude);
        } else {
            *sample = sample.wrapping_add(magnitude);
        }
    }
}

/// Decodes one compressed block into `out_size` bytes of PCM.
///
/// A block that ends early leaves the rest of the output zeroed.
fn decode_block(block: &[u8], header: &NwaHeader, out_size: usize) -> Vec<u8> {
    let mut out = vec![0u8; out_size];
    let wide = header.bits_per_sample == 16;
    let stereo = header.channels == 2;
    let run_length = header.uses_run_length();

    let mut reader = BitReader::new(block);
    let mut sample = [0i32; 2];
    for slot in sample.iter_mut().take(usize::from(header.channels)) {
        *slot = if wide { reader.read_i16() } else { reader.read_i8() };
    }

    let width = header.bytes_per_sample() as usize;
    let mut flip = 0;
    let mut run = 0;
    for index in 0..out_size / width {
        if reader.exhausted() {
            break;
        }
        if run == 0 {
            match reader.bits(3) {
                7 => {
                    if reader.bits(1) == 1 {
                        sample[flip] = 0;
                    } else {
                        DeltaCode::for_code(header.comp_level, 7).apply(&mut reader, &mut sample[flip]);
                    }
                }
                0 => {
                    if run_length {
                        run = reader.bits(1);
                        if run == 1 {
                            run = reader.bits(2);
                            if run == 3 {
                                run = reader.bits(8);
                            }
                        }
                    }
                }
                code => DeltaCode::for_code(header.comp_level, code).apply(&mut reader, &mut sample[flip]),
            }
        } else {
            run -= 1;
        }

        let at = index * width;
        if wide {
            out[at..at + 2].copy_from_slice(&(sample[flip] as i16).to_le_bytes());
        } else {
            out[at] = sample[flip] as u8;
        }
        if stereo {
            flip ^= 1;
        }
    }
    out
}

/// Reads and checks the block offset table that follows the header.
///
/// Offsets must point past the table, stay inside the file and never go backwards.
fn block_offsets(data: &[u8], header: &NwaHeader) -> Result<Vec<usize>, CodecError> {
    let blocks = header.blocks as usize;
    let table_end = HEADER_SIZE + blocks * 4;
    let table = data
        .get(HEADER_SIZE..table_end)
        .ok_or_else(|| CodecError::Corrupt(format!("offset table for {blocks} blocks is truncated")))?;

    let end = header.comp_data_size as usize;
    let mut offsets = Vec::with_capacity(blocks);
    let mut previous = table_end;
    for (i, raw) in table.chunks_exact(4).enumerate() {
        let offset = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let offset = usize::try_from(offset)
            .ok()
            .filter(|&o| o >= previous && o <= end)
            .ok_or_else(|| CodecError::Corrupt(format!("block {i} offset {offset} is out of range")))?;
        offsets.push(offset);
        previous = offset;
    }
    Ok(offsets)
}

/// Upper bound on the samples a block of `len` bytes can decode to.
///
/// Every code takes at least 3 bits, and a 14-bit run code repeats a sample
/// at most 256 times. The reader may lag the block end by up to two bytes.
fn max_block_samples(len: usize, header: &NwaHeader) -> u64 {
    let initial = usize::from(header.channels) * header.bytes_per_sample() as usize;
    let bits = (len.saturating_sub(initial) as u64 + 2) * 8;
    if header.uses_run_length() {
        (bits / 14 + 2) * 256
    } else {
        bits / 3 + 1
    }
}

/// Decodes a whole NWA stream held in memory and writes it out as WAV.
///
/// Everything is checked before the first byte is written, a rejected
/// stream leaves `output` untouched.
pub fn decode_nwa(data: &[u8], output: &mut dyn Write) -> Result<u64, CodecError> {
    let head: &[u8; HEADER_SIZE] = data
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| CodecError::UnrecognizedHeader(format!("stream is only {} bytes", data.len())))?;
    let header = NwaHeader::parse(head)?;

    debug!(
        "[nwa] {} ch, {} bit, {} Hz, level {}, {} blocks, {} samples",
        header.channels,
        header.bits_per_sample,
        header.frequency,
        header.comp_level,
        header.blocks,
        header.sample_count
    );

    if !header.is_compressed() {
        let pcm = data
            .get(HEADER_SIZE..HEADER_SIZE + header.data_size as usize)
            .ok_or_else(|| CodecError::Corrupt(format!("raw data of {} bytes is truncated", header.data_size)))?;
        output.write_all(&wav_header(&header))?;
        output.write_all(pcm)?;
        return Ok((WAV_HEADER_SIZE + pcm.len()) as u64);
    }

    if header.comp_data_size as usize > data.len() {
        return Err(CodecError::Corrupt(format!(
            "stream declares {} bytes but only {} are present",
            header.comp_data_size,
            data.len()
        )));
    }
    let offsets = block_offsets(data, &header)?;
    let blocks: Vec<(&[u8], usize)> = offsets
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = offsets.get(i + 1).copied().unwrap_or(header.comp_data_size as usize);
            (&data[start..end], header.block_output_size(i as u32))
        })
        .collect();

    // Sizes come from the header; refuse to allocate more than the data can fill.
    let width = u64::from(header.bytes_per_sample());
    for (i, &(block, out_size)) in blocks.iter().enumerate() {
        let samples = out_size as u64 / width;
        if samples > max_block_samples(block.len(), &header) {
            return Err(CodecError::Corrupt(format!(
                "block {i} of {} bytes cannot hold {samples} samples",
                block.len()
            )));
        }
    }

    output.write_all(&wav_header(&header))?;
    let mut written = WAV_HEADER_SIZE as u64;
    for (block, out_size) in blocks {
        let pcm = decode_block(block, &header, out_size);
        output.write_all(&pcm)?;
        written += pcm.len() as u64;
    }
    Ok(written)
}
