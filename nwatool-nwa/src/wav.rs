use crate::header::NwaHeader;

pub const WAV_HEADER_SIZE: usize = 44;

/// Canonical 44-byte PCM RIFF header for the decoded data of `header`.
pub fn wav_header(header: &NwaHeader) -> [u8; WAV_HEADER_SIZE] {
    let channels = header.channels;
    let bytes_per_sample = header.bytes_per_sample();
    let block_align = bytes_per_sample * u32::from(channels);

    let mut buf = [0u8; WAV_HEADER_SIZE];
    buf[0..4].copy_from_slice(b"RIFF");
    buf[4..8].copy_from_slice(&header.data_size.wrapping_add(0x24).to_le_bytes());
    buf[8..12].copy_from_slice(b"WAVE");
    buf[12..16].copy_from_slice(b"fmt ");
    buf[16..20].copy_from_slice(&16u32.to_le_bytes());
    buf[20..22].copy_from_slice(&1u16.to_le_bytes());
    buf[22..24].copy_from_slice(&channels.to_le_bytes());
    buf[24..28].copy_from_slice(&header.frequency.to_le_bytes());
    buf[28..32].copy_from_slice(&header.frequency.wrapping_mul(block_align).to_le_bytes());
    buf[32..34].copy_from_slice(&(block_align as u16).to_le_bytes());
    buf[34..36].copy_from_slice(&header.bits_per_sample.to_le_bytes());
    buf[36..40].copy_from_slice(b"data");
    buf[40..44].copy_from_slice(&header.data_size.to_le_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_header_fields() {
        let header = NwaHeader {
            channels: 2,
            bits_per_sample: 16,
            frequency: 44100,
            comp_level: -1,
            run_length: false,
            blocks: 0,
            data_size: 400,
            comp_data_size: 0,
            sample_count: 200,
            block_size: 0,
            rest_size: 0,
        };
        let buf = wav_header(&header);
        assert_eq!(&buf[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 436);
        assert_eq!(&buf[8..16], b"WAVEfmt ");
        assert_eq!(u16::from_le_bytes([buf[22], buf[23]]), 2);
        assert_eq!(u32::from_le_bytes(buf[28..32].try_into().unwrap()), 176_400);
        assert_eq!(u16::from_le_bytes([buf[32], buf[33]]), 4);
        assert_eq!(u16::from_le_bytes([buf[34], buf[35]]), 16);
        assert_eq!(&buf[36..40], b"data");
        assert_eq!(u32::from_le_bytes(buf[40..44].try_into().unwrap()), 400);
    }
}
