//! GMV (Gob MoVie) interleaved container.
//!
//! ```text
//! u32 signature            "GMV0" (0x30564D47)
//! u32 frame_count
//! u32 audio_header_offset  16 + descriptor size (60, or 52 for legacy files)
//! f32 fps
//! audio descriptor         WAV fmt descriptor [+ data chunk header]
//! { u32 frame_size; u32 audio_size; frame bytes; audio bytes } ...
//! u32 0xFFFFFFFF, u32 0xFFFFFFFF
//! ```
//!
//! All fields are little-endian. Each record pairs one image with the audio
//! that plays while it is on screen; slice sizes come from
//! [`RateAccumulator`](crate::rate::RateAccumulator).

use crate::error::ensure_remaining;
use crate::rate::{Fps, RateAccumulator};
use crate::source::FrameSource;
use crate::wav::{AudioFormat, AudioTrack, DescriptorLayout};
use crate::{checked_len, Error, Result, SENTINEL};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Write;
use tracing::{debug, trace};

/// "GMV0" read as a little-endian u32.
pub const SIGNATURE: u32 = 0x3056_4D47;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Fixed GMV header.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GmvHeader {
    pub signature: u32,
    /// Number of frames the writer announced.
    pub frame_count: u32,
    /// Offset of the first record from the start of the file.
    pub audio_header_offset: u32,
    pub fps: f32,
}

impl GmvHeader {
    pub fn new(frame_count: u32, layout: DescriptorLayout, fps: Fps) -> Self {
        Self {
            signature: SIGNATURE,
            frame_count,
            audio_header_offset: (HEADER_SIZE + layout.size()) as u32,
            fps: fps.as_f32(),
        }
    }

    /// Append the encoded header to `buf`.
    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.signature);
        buf.put_u32_le(self.frame_count);
        buf.put_u32_le(self.audio_header_offset);
        buf.put_f32_le(self.fps);
    }

    /// Read and validate a header from the front of `buf`.
    pub fn parse(buf: &mut impl Buf) -> Result<Self> {
        ensure_remaining(&*buf, HEADER_SIZE)?;

        let signature = buf.get_u32_le();
        if signature != SIGNATURE {
            return Err(Error::format(format!(
                "bad GMV signature 0x{:08x} (expected 0x{:08x})",
                signature, SIGNATURE
            )));
        }

        Ok(Self {
            signature,
            frame_count: buf.get_u32_le(),
            audio_header_offset: buf.get_u32_le(),
            fps: buf.get_f32_le(),
        })
    }

    /// Descriptor layout implied by the record offset.
    pub fn descriptor_layout(&self) -> Option<DescriptorLayout> {
        (self.audio_header_offset as usize)
            .checked_sub(HEADER_SIZE)
            .and_then(DescriptorLayout::from_size)
    }
}

/// What a completed mux wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MuxSummary {
    pub frames: u32,
    pub frame_bytes: u64,
    pub audio_bytes: u64,
    /// Track bytes left over once every frame had its slice.
    pub audio_unused: u64,
    pub bytes_written: u64,
}

/// Single-pass GMV writer.
///
/// Everything that can be rejected up front (no frames, unusable audio
/// format, oversized track) is checked in [`Muxer::new`], before any output
/// exists. Slice sizes for every frame are planned there too.
pub struct Muxer<'a, S> {
    source: S,
    audio: &'a AudioTrack,
    fps: Fps,
    layout: DescriptorLayout,
    frame_count: u32,
    data_len: u32,
    slices: Vec<u32>,
}

impl<'a, S: FrameSource> Muxer<'a, S> {
    /// Validate inputs and plan the audio slices.
    pub fn new(source: S, audio: &'a AudioTrack, fps: Fps) -> Result<Self> {
        let count = source.count();
        if count == 0 {
            return Err(Error::validation("no frames to mux"));
        }
        let frame_count = u32::try_from(count)
            .ok()
            .filter(|&n| n != SENTINEL)
            .ok_or_else(|| Error::validation(format!("too many frames for GMV: {}", count)))?;
        let data_len = checked_len(audio.len(), "audio track")?;

        let mut accumulator = RateAccumulator::new(fps, &audio.format, audio.len())?;
        debug!(
            "mux plan: {} frames at {} fps, base slice {} bytes, remainder {:?}",
            frame_count,
            fps,
            accumulator.base_slice(),
            accumulator.remainder()
        );
        let slices = accumulator.plan(count);

        Ok(Self {
            source,
            audio,
            fps,
            layout: DescriptorLayout::default(),
            frame_count,
            data_len,
            slices,
        })
    }

    /// Set the audio descriptor layout.
    pub fn layout(mut self, layout: DescriptorLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Planned audio slice size for each frame.
    pub fn slices(&self) -> &[u32] {
        &self.slices
    }

    /// Write the complete container to `writer` and flush it.
    ///
    /// On error the output is left partially written.
    pub fn write_to<W: Write>(mut self, mut writer: W) -> Result<MuxSummary> {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.layout.size());
        GmvHeader::new(self.frame_count, self.layout, self.fps).write(&mut buf);
        self.audio
            .format
            .write_descriptor(&mut buf, self.layout, self.data_len);
        writer.write_all(&buf)?;

        let mut summary = MuxSummary {
            bytes_written: buf.len() as u64,
            ..MuxSummary::default()
        };

        let audio = self.audio.data();
        let mut cursor = 0usize;

        for (index, &slice) in self.slices.iter().enumerate() {
            let frame = self.source.next_frame()?.ok_or_else(|| {
                Error::format(format!(
                    "frame source ended after {} of {} frames",
                    index, self.frame_count
                ))
            })?;
            let frame_size = checked_len(frame.len(), "frame")?;
            let slice_len = slice as usize;

            buf.clear();
            buf.put_u32_le(frame_size);
            buf.put_u32_le(slice);
            writer.write_all(&buf)?;
            writer.write_all(&frame)?;
            writer.write_all(&audio[cursor..cursor + slice_len])?;
            cursor += slice_len;

            trace!("frame {} size:{} audio:{}", index, frame_size, slice);
            summary.frames += 1;
            summary.frame_bytes += frame_size as u64;
            summary.bytes_written += 8 + frame_size as u64 + slice as u64;
        }

        if self.source.next_frame()?.is_some() {
            return Err(Error::format(format!(
                "frame source yielded more than {} frames",
                self.frame_count
            )));
        }

        buf.clear();
        buf.put_u32_le(SENTINEL);
        buf.put_u32_le(SENTINEL);
        writer.write_all(&buf)?;
        writer.flush()?;

        summary.audio_bytes = cursor as u64;
        summary.audio_unused = (audio.len() - cursor) as u64;
        summary.bytes_written += buf.len() as u64;

        debug!(
            "muxed {} frames, {} audio bytes ({} unused)",
            summary.frames, summary.audio_bytes, summary.audio_unused
        );
        Ok(summary)
    }
}

/// Mux `source` and `audio` into an in-memory GMV with the standard layout.
pub fn mux<S: FrameSource>(source: S, audio: &AudioTrack, fps: Fps) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    Muxer::new(source, audio, fps)?.write_to(&mut out)?;
    Ok(out)
}

/// One frame and the audio that accompanies it.
#[derive(Debug, Clone)]
pub struct GmvRecord {
    pub frame: Bytes,
    pub audio: Bytes,
}

/// A decoded GMV.
///
/// Records are views into the buffer passed to [`GmvFile::parse`].
#[derive(Debug, Clone)]
pub struct GmvFile {
    pub header: GmvHeader,
    pub layout: DescriptorLayout,
    pub audio_format: AudioFormat,
    pub records: Vec<GmvRecord>,
}

impl GmvFile {
    /// Parse a complete GMV image. Reading stops at the trailer sentinel;
    /// the header's frame count is not relied on.
    pub fn parse(data: Bytes) -> Result<Self> {
        let mut cursor = data.clone();
        let header = GmvHeader::parse(&mut cursor)?;

        let layout = header.descriptor_layout().ok_or_else(|| {
            Error::format(format!(
                "unsupported GMV audio header offset {}",
                header.audio_header_offset
            ))
        })?;
        let offset = header.audio_header_offset as usize;
        if data.len() < offset {
            return Err(Error::format("GMV audio descriptor truncated"));
        }

        let mut descriptor = data.slice(HEADER_SIZE..offset);
        let audio_format = AudioFormat::parse_descriptor(&mut descriptor)?;

        let mut body = data.slice(offset..);
        let mut records = Vec::with_capacity(header.frame_count.min(4096) as usize);

        loop {
            if body.remaining() < 8 {
                return Err(Error::format(format!(
                    "GMV record header truncated after {} frames",
                    records.len()
                )));
            }

            let frame_size = body.get_u32_le();
            let audio_size = body.get_u32_le();
            if frame_size == SENTINEL {
                if audio_size != SENTINEL {
                    debug!("GMV trailer audio sentinel is 0x{:08x}", audio_size);
                }
                break;
            }

            let (frame_size, audio_size) = (frame_size as usize, audio_size as usize);
            if frame_size + audio_size > body.remaining() {
                return Err(Error::format(format!(
                    "GMV record {} declares {} bytes but only {} remain",
                    records.len(),
                    frame_size + audio_size,
                    body.remaining()
                )));
            }

            let frame = body.split_to(frame_size);
            let audio = body.split_to(audio_size);
            records.push(GmvRecord { frame, audio });
        }

        if records.len() != header.frame_count as usize {
            debug!(
                "GMV header announces {} frames, decoded {}",
                header.frame_count,
                records.len()
            );
        }

        Ok(Self {
            header,
            layout,
            audio_format,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_frame_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.frame.len() as u64).sum()
    }

    pub fn total_audio_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.audio.len() as u64).sum()
    }

    /// Video running time from the frame count and header fps.
    pub fn duration_secs(&self) -> f64 {
        if self.header.fps > 0.0 {
            self.records.len() as f64 / self.header.fps as f64
        } else {
            0.0
        }
    }

    /// Running time of the audio carried in the records.
    pub fn audio_duration_secs(&self) -> f64 {
        self.audio_format.duration_secs(self.total_audio_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn track(sample_rate: u32, len: usize) -> AudioTrack {
        // Mono 32-bit: block align 4
        let format = AudioFormat::pcm(1, sample_rate, 32);
        let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
        AudioTrack::new(format, data).unwrap()
    }

    fn frames(n: usize) -> MemorySource {
        MemorySource::new((0..n).map(|i| vec![i as u8; i + 1]))
    }

    #[test]
    fn test_header_and_descriptor_layout() {
        let audio = track(1000, 1000);
        let data = mux(frames(2), &audio, Fps::integer(10).unwrap()).unwrap();

        assert_eq!(&data[0..4], b"GMV0");
        assert_eq!(u32::from_le_bytes(data[4..8].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(data[8..12].try_into().unwrap()), 60);
        assert_eq!(f32::from_le_bytes(data[12..16].try_into().unwrap()), 10.0);
        assert_eq!(&data[16..20], b"RIFF");
        assert_eq!(&data[24..32], b"WAVEfmt ");
        assert_eq!(&data[52..56], b"data");
        assert_eq!(u32::from_le_bytes(data[56..60].try_into().unwrap()), 1000);

        // First record: 1-byte frame, 400 bytes of audio
        assert_eq!(u32::from_le_bytes(data[60..64].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(data[64..68].try_into().unwrap()), 400);
        assert_eq!(data[68], 0);
        assert_eq!(data[69], 0); // audio[0]
        assert_eq!(data[70], 1); // audio[1]

        assert_eq!(&data[data.len() - 8..], &[0xFF; 8]);
    }

    #[test]
    fn test_legacy_layout() {
        let audio = track(1000, 1000);
        let mut out = Vec::new();
        Muxer::new(frames(1), &audio, Fps::integer(10).unwrap())
            .unwrap()
            .layout(DescriptorLayout::Legacy)
            .write_to(&mut out)
            .unwrap();

        assert_eq!(u32::from_le_bytes(out[8..12].try_into().unwrap()), 52);
        let file = GmvFile::parse(Bytes::from(out)).unwrap();
        assert_eq!(file.layout, DescriptorLayout::Legacy);
        assert_eq!(file.records[0].audio.len(), 400);
    }

    #[test]
    fn test_empty_source_rejected() {
        let audio = track(1000, 1000);
        let err = Muxer::new(frames(0), &audio, Fps::integer(10).unwrap())
            .err()
            .unwrap();
        assert!(err.is_validation());
    }

    #[test]
    fn test_audio_exhaustion_gives_empty_slices() {
        let audio = track(1000, 1000);
        let muxer = Muxer::new(frames(5), &audio, Fps::integer(10).unwrap()).unwrap();
        assert_eq!(muxer.slices(), &[400, 400, 200, 0, 0]);

        let mut out = Vec::new();
        let summary = muxer.write_to(&mut out).unwrap();
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.audio_bytes, 1000);
        assert_eq!(summary.audio_unused, 0);
        assert_eq!(summary.frame_bytes, 1 + 2 + 3 + 4 + 5);
        assert_eq!(summary.bytes_written, out.len() as u64);

        let file = GmvFile::parse(Bytes::from(out)).unwrap();
        let sizes: Vec<usize> = file.records.iter().map(|r| r.audio.len()).collect();
        assert_eq!(sizes, vec![400, 400, 200, 0, 0]);
    }

    #[test]
    fn test_audio_sliced_in_order() {
        let audio = track(1000, 1000);
        let data = mux(frames(3), &audio, Fps::integer(10).unwrap()).unwrap();
        let file = GmvFile::parse(Bytes::from(data)).unwrap();

        let joined: Vec<u8> = file
            .records
            .iter()
            .flat_map(|r| r.audio.iter().copied())
            .collect();
        assert_eq!(joined.as_slice(), audio.data().as_ref());
        assert_eq!(file.total_audio_bytes(), 1000);
        assert!((file.audio_duration_secs() - 0.25).abs() < 1e-9);
        assert!((file.duration_secs() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_unused_audio_reported() {
        let audio = track(1000, 10_000);
        let mut out = Vec::new();
        let summary = Muxer::new(frames(2), &audio, Fps::integer(10).unwrap())
            .unwrap()
            .write_to(&mut out)
            .unwrap();
        assert_eq!(summary.audio_bytes, 800);
        assert_eq!(summary.audio_unused, 9_200);
    }

    struct ShortSource;

    impl FrameSource for ShortSource {
        fn count(&self) -> usize {
            3
        }

        fn next_frame(&mut self) -> Result<Option<Bytes>> {
            Ok(None)
        }
    }

    #[test]
    fn test_short_source_fails() {
        let audio = track(1000, 1000);
        let err = mux(ShortSource, &audio, Fps::integer(10).unwrap()).unwrap_err();
        assert!(err.is_format());
    }

    /// Advertises two frames but hands out three.
    struct LongSource(MemorySource);

    impl FrameSource for LongSource {
        fn count(&self) -> usize {
            2
        }

        fn next_frame(&mut self) -> Result<Option<Bytes>> {
            self.0.next_frame()
        }
    }

    #[test]
    fn test_long_source_fails() {
        let audio = track(1000, 1000);
        let err = mux(LongSource(frames(3)), &audio, Fps::integer(10).unwrap()).unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("more than 2 frames"));

        // The GCF writer rejects the same source.
        let err = crate::gcf::write_source(LongSource(frames(3)), Vec::new()).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_parse_rejects_bad_signature() {
        let audio = track(1000, 100);
        let mut data = mux(frames(1), &audio, Fps::integer(10).unwrap()).unwrap();
        data[3] = 0;
        assert!(GmvFile::parse(Bytes::from(data)).unwrap_err().is_format());
    }

    #[test]
    fn test_parse_rejects_truncation() {
        let audio = track(1000, 1000);
        let data = mux(frames(2), &audio, Fps::integer(10).unwrap()).unwrap();

        // Missing trailer
        let cut = Bytes::copy_from_slice(&data[..data.len() - 8]);
        assert!(GmvFile::parse(cut).unwrap_err().is_format());

        // Record payload cut short
        let cut = Bytes::copy_from_slice(&data[..100]);
        assert!(GmvFile::parse(cut).unwrap_err().is_format());

        // Descriptor cut short
        let cut = Bytes::copy_from_slice(&data[..40]);
        assert!(GmvFile::parse(cut).unwrap_err().is_format());
    }

    #[test]
    fn test_parse_rejects_unknown_offset() {
        let audio = track(1000, 100);
        let mut data = mux(frames(1), &audio, Fps::integer(10).unwrap()).unwrap();
        data[8..12].copy_from_slice(&48u32.to_le_bytes());
        assert!(GmvFile::parse(Bytes::from(data)).unwrap_err().is_format());
    }
}
