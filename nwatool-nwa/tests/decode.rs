use std::fs;
use std::path::Path;

use nwatool_common::{run_batch, Codec, CodecError, ExtractConfig, ExtractError, StrategicConfig};
use nwatool_nwa::{NwaCodec, HEADER_SIZE, WAV_HEADER_SIZE};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Layout {
    channels: i16,
    bits: i16,
    level: i32,
    blocks: i32,
    samples: i32,
    block_size: i32,
    rest_size: i32,
}

/// Header followed by `body`, with the compressed size set to the file size.
fn nwa_bytes(layout: &Layout, body: &[u8]) -> Vec<u8> {
    let comp_size = if layout.level == -1 { 0 } else { (HEADER_SIZE + body.len()) as i32 };
    let fields = [
        44100,
        layout.level,
        0,
        layout.blocks,
        layout.samples * i32::from(layout.bits / 8),
        comp_size,
        layout.samples,
        layout.block_size,
        layout.rest_size,
    ];
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&layout.channels.to_le_bytes());
    buf.extend_from_slice(&layout.bits.to_le_bytes());
    for field in fields {
        buf.extend_from_slice(&field.to_le_bytes());
    }
    buf.resize(HEADER_SIZE, 0);
    buf.extend_from_slice(body);
    buf
}

/// Mono 16-bit level 2 stream of four samples at 132.
fn compressed_stream() -> Vec<u8> {
    let layout = Layout {
        channels: 1,
        bits: 16,
        level: 2,
        blocks: 1,
        samples: 4,
        block_size: 4,
        rest_size: 4,
    };
    let mut body = ((HEADER_SIZE + 4) as i32).to_le_bytes().to_vec();
    body.extend_from_slice(&[0x64, 0x00, 0x09, 0x00, 0x00, 0x00]);
    nwa_bytes(&layout, &body)
}

fn decode(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let written = NwaCodec.decode(&mut &data[..], &mut out)?;
    assert_eq!(written, out.len() as u64);
    Ok(out)
}

#[test]
fn compressed_stream_decodes_to_wav() {
    let wav = decode(&compressed_stream()).unwrap();
    assert_eq!(wav.len(), WAV_HEADER_SIZE + 8);
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    let samples: Vec<i16> = wav[WAV_HEADER_SIZE..]
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(samples, vec![132, 132, 132, 132]);
}

#[test]
fn raw_stream_is_copied_behind_wav_header() {
    let layout = Layout {
        channels: 2,
        bits: 8,
        level: -1,
        blocks: 0,
        samples: 4,
        block_size: 0,
        rest_size: 0,
    };
    let wav = decode(&nwa_bytes(&layout, &[1, 2, 3, 4, 0xee])).unwrap();
    assert_eq!(wav.len(), WAV_HEADER_SIZE + 4);
    assert_eq!(&wav[WAV_HEADER_SIZE..], &[1, 2, 3, 4]);
}

#[test]
fn garbage_is_rejected_before_writing() {
    let mut out = Vec::new();
    let err = NwaCodec.decode(&mut &b"OggS not an nwa stream at all, but long enough"[..], &mut out);
    assert!(matches!(err, Err(CodecError::UnrecognizedHeader(_))));
    assert!(out.is_empty());

    let err = NwaCodec.decode(&mut &b"short"[..], &mut out);
    assert!(matches!(err, Err(CodecError::UnrecognizedHeader(_))));
    assert!(out.is_empty());
}

#[test]
fn truncated_stream_is_corrupt() {
    let mut data = compressed_stream();
    data.truncate(data.len() - 2);
    let mut out = Vec::new();
    assert!(matches!(NwaCodec.decode(&mut &data[..], &mut out), Err(CodecError::Corrupt(_))));
    assert!(out.is_empty());
}

#[test]
fn block_offset_outside_file_is_corrupt() {
    let mut data = compressed_stream();
    data[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&1000i32.to_le_bytes());
    assert!(matches!(decode(&data), Err(CodecError::Corrupt(_))));
}

#[test]
fn oversized_sample_count_is_rejected_before_allocating() {
    let layout = Layout {
        channels: 1,
        bits: 16,
        level: 2,
        blocks: 1,
        samples: 1_000_000_000,
        block_size: 1_000_000_000,
        rest_size: 1_000_000_000,
    };
    let mut body = ((HEADER_SIZE + 4) as i32).to_le_bytes().to_vec();
    body.extend_from_slice(&[0x64, 0x00, 0x09, 0x00, 0x00, 0x00]);
    let mut out = Vec::new();
    let err = NwaCodec.decode(&mut &nwa_bytes(&layout, &body)[..], &mut out);
    assert!(matches!(err, Err(CodecError::Corrupt(_))));
    assert!(out.is_empty());
}

/// `.nwk` table: count, then `[size, offset, sequence]` per entry.
fn write_nwk(path: &Path, streams: &[(i32, Vec<u8>)]) {
    let table_len = 4 + streams.len() * 12;
    let mut table = (streams.len() as i32).to_le_bytes().to_vec();
    let mut data = Vec::new();
    for (sequence, stream) in streams {
        table.extend_from_slice(&(stream.len() as i32).to_le_bytes());
        table.extend_from_slice(&((table_len + data.len()) as i32).to_le_bytes());
        table.extend_from_slice(&sequence.to_le_bytes());
        data.extend_from_slice(stream);
    }
    table.extend_from_slice(&data);
    fs::write(path, table).unwrap();
}

#[test]
fn nwk_archive_extracts_to_wav_files() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("voice.nwk");
    write_nwk(&archive, &[(3, compressed_stream()), (17, compressed_stream())]);

    let config = ExtractConfig::new(&StrategicConfig::with_workers(2)).with_input_file(&archive);
    let batch = run_batch(&config, &NwaCodec).unwrap();
    assert!(batch.is_success());
    assert_eq!(batch.entries_extracted, 2);

    for name in ["voice-3.wav", "voice-17.wav"] {
        let wav = fs::read(dir.path().join(name)).unwrap();
        assert_eq!(wav, decode(&compressed_stream()).unwrap());
    }
}

#[test]
fn nwa_file_becomes_single_wav() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bgm01.nwa");
    fs::write(&input, compressed_stream()).unwrap();
    let out_dir = dir.path().join("out");

    let config = ExtractConfig::new(&StrategicConfig::with_workers(1))
        .with_input_file(&input)
        .with_output_dir(&out_dir);
    let batch = run_batch(&config, &NwaCodec).unwrap();
    assert_eq!(batch.outputs, vec![out_dir.join("bgm01.wav")]);
    assert_eq!(fs::read(out_dir.join("bgm01.wav")).unwrap().len(), WAV_HEADER_SIZE + 8);
}

#[test]
fn undecodable_nwa_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.nwa");
    fs::write(&input, b"definitely not a header").unwrap();

    let config = ExtractConfig::new(&StrategicConfig::with_workers(1)).with_input_file(&input);
    let err = run_batch(&config, &NwaCodec).unwrap_err();
    assert!(matches!(err, ExtractError::Codec { codec: "nwa", .. }));
    assert!(!dir.path().join("broken.wav").exists());
}
