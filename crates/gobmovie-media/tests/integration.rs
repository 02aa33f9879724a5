//! Integration tests for gobmovie-media

use bytes::{BufMut, Bytes, BytesMut};
use gobmovie_media::{
    gcf, gmv, AudioFormat, AudioTrack, DescriptorLayout, Fps, GcfSource, GmvFile, MemorySource,
    Muxer, RateAccumulator,
};

/// Build an in-memory WAV file image.
fn wav_image(format: &AudioFormat, pcm: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    format.write_descriptor(&mut buf, DescriptorLayout::Standard, pcm.len() as u32);
    buf.put_slice(pcm);
    buf.freeze()
}

fn fake_jpeg(index: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.extend(std::iter::repeat(index as u8).take(16 + index * 3));
    data.extend([0xFF, 0xD9]);
    data
}

/// A GCF of frames fed through the GCF frame source produces the same GMV
/// as the frames taken straight from memory.
#[test]
fn test_gcf_source_and_memory_source_mux_identically() {
    let frames: Vec<Vec<u8>> = (0..12).map(fake_jpeg).collect();
    let format = AudioFormat::pcm(2, 44100, 16);
    let audio = AudioTrack::parse(wav_image(&format, &vec![0x55; 60_000])).unwrap();
    let fps: Fps = "29.97".parse().unwrap();

    let container = gcf::decode(Bytes::from(gcf::encode(&frames).unwrap())).unwrap();
    let from_gcf = gmv::mux(GcfSource::from(container), &audio, fps).unwrap();
    let from_memory = gmv::mux(MemorySource::new(frames.clone()), &audio, fps).unwrap();

    assert_eq!(from_gcf, from_memory);
}

#[test]
fn test_gmv_round_trip_preserves_frames() {
    let frames: Vec<Vec<u8>> = (0..30).map(fake_jpeg).collect();
    let format = AudioFormat::pcm(1, 22050, 16);
    let pcm: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let audio = AudioTrack::parse(wav_image(&format, &pcm)).unwrap();
    let fps = Fps::integer(15).unwrap();

    for layout in [DescriptorLayout::Standard, DescriptorLayout::Legacy] {
        let mut out = Vec::new();
        let summary = Muxer::new(MemorySource::new(frames.clone()), &audio, fps)
            .unwrap()
            .layout(layout)
            .write_to(&mut out)
            .unwrap();

        let file = GmvFile::parse(Bytes::from(out)).unwrap();
        assert_eq!(file.layout, layout);
        assert_eq!(file.header.frame_count, 30);
        assert_eq!(file.header.fps, 15.0);
        assert_eq!(file.audio_format, format);
        assert_eq!(file.len(), frames.len());
        for (record, frame) in file.records.iter().zip(&frames) {
            assert_eq!(record.frame.as_ref(), frame.as_slice());
        }

        // 22050 / 15 = 1470 samples of 2 bytes per frame
        assert!(file.records.iter().all(|r| r.audio.len() == 2940));
        assert_eq!(file.total_audio_bytes(), summary.audio_bytes);
        assert_eq!(summary.audio_bytes, 30 * 2940);
    }
}

#[test]
fn test_terminators() {
    let frames = vec![b"a".to_vec(), b"bb".to_vec()];
    let gcf_data = gcf::encode(&frames).unwrap();
    assert_eq!(&gcf_data[gcf_data.len() - 4..], &[0xFF; 4]);

    let format = AudioFormat::pcm(1, 8000, 8);
    let audio = AudioTrack::new(format, vec![0u8; 100]).unwrap();
    let gmv_data = gmv::mux(MemorySource::new(frames), &audio, Fps::integer(8).unwrap()).unwrap();
    assert_eq!(&gmv_data[gmv_data.len() - 8..], &[0xFF; 8]);
}

/// Audio never runs ahead of or behind the video by a block over a long run.
#[test]
fn test_long_run_sync() {
    let format = AudioFormat::pcm(2, 48000, 16);
    let fps: Fps = "30000/1001".parse().unwrap();
    let frames = 10_000usize;

    let mut acc = RateAccumulator::new(fps, &format, usize::MAX).unwrap();
    let mut total = 0u64;
    for n in 1..=frames as u64 {
        total += acc.next_slice() as u64;
        let ideal = n * 48000 * 1001 / 30000 * 4;
        assert!(total.abs_diff(ideal) < 4, "frame {}: {} vs {}", n, total, ideal);
    }
}

#[test]
fn test_empty_mux_produces_nothing() {
    let format = AudioFormat::pcm(1, 8000, 8);
    let audio = AudioTrack::new(format, vec![0u8; 100]).unwrap();

    let mut out = Vec::new();
    let result = Muxer::new(MemorySource::default(), &audio, Fps::integer(10).unwrap())
        .and_then(|m| m.write_to(&mut out));

    assert!(result.unwrap_err().is_validation());
    assert!(out.is_empty());
}

#[test]
fn test_gcf_round_trip_large_blobs() {
    let blobs: Vec<Vec<u8>> = (0..5)
        .map(|i| (0..(i * 10_000 + 1)).map(|b| (b * 7 + i) as u8).collect())
        .collect();

    let first = gcf::encode(&blobs).unwrap();
    let second = gcf::encode(&blobs).unwrap();
    assert_eq!(first, second);

    let container = gcf::decode(Bytes::from(first)).unwrap();
    assert_eq!(container.header.blob_count, 5);
    for (decoded, original) in container.blobs.iter().zip(&blobs) {
        assert_eq!(decoded.as_ref(), original.as_slice());
    }
}
