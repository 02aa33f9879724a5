//! WAV descriptor parsing and data chunk extraction.
//!
//! Only what the rate matcher and the GMV audio descriptor need is read:
//! the fixed `RIFF`/`WAVE`/`fmt ` descriptor and the payload of the first
//! `data` chunk. Other chunks are skipped unread.

use crate::error::ensure_remaining;
use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::path::Path;
use tracing::{debug, warn};

pub const RIFF_TAG: [u8; 4] = *b"RIFF";
pub const WAVE_FMT_TAG: [u8; 8] = *b"WAVEfmt ";
pub const DATA_TAG: [u8; 4] = *b"data";

/// Size of the fixed `RIFF`..`bits_per_sample` descriptor.
pub const FMT_DESCRIPTOR_SIZE: usize = 36;

/// Size of the descriptor followed by the `data` chunk header.
pub const STANDARD_DESCRIPTOR_SIZE: usize = FMT_DESCRIPTOR_SIZE + 8;

/// How the audio descriptor is laid out inside a GMV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum DescriptorLayout {
    /// fmt descriptor plus the `data` chunk header (44 bytes).
    #[default]
    Standard,
    /// Bare fmt descriptor (36 bytes), as read by older device players.
    Legacy,
}

impl DescriptorLayout {
    /// Encoded size in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Standard => STANDARD_DESCRIPTOR_SIZE,
            Self::Legacy => FMT_DESCRIPTOR_SIZE,
        }
    }

    /// Layout whose encoded size is `size`, if any.
    pub fn from_size(size: usize) -> Option<Self> {
        match size {
            STANDARD_DESCRIPTOR_SIZE => Some(Self::Standard),
            FMT_DESCRIPTOR_SIZE => Some(Self::Legacy),
            _ => None,
        }
    }
}

/// WAV format descriptor as stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioFormat {
    /// RIFF chunk size from the source file.
    pub riff_size: u32,
    /// fmt chunk size (16 for plain PCM).
    pub fmt_size: u32,
    /// Format code (1 is linear PCM).
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    /// Bytes per sample frame across all channels.
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Linear PCM format with derived byte rate and block alignment.
    ///
    /// Derived fields saturate at their field width instead of overflowing.
    pub fn pcm(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        let block_align = channels.saturating_mul(bits_per_sample.div_ceil(8));
        Self {
            riff_size: 0,
            fmt_size: 16,
            audio_format: 1,
            channels,
            sample_rate,
            byte_rate: sample_rate.saturating_mul(block_align as u32),
            block_align,
            bits_per_sample,
        }
    }

    /// Read the fixed 36-byte descriptor from the front of `buf`.
    pub fn parse_descriptor(buf: &mut impl Buf) -> Result<Self> {
        ensure_remaining(&*buf, FMT_DESCRIPTOR_SIZE)
            .map_err(|_| Error::format("WAV descriptor truncated"))?;

        let mut riff = [0u8; 4];
        buf.copy_to_slice(&mut riff);
        let riff_size = buf.get_u32_le();
        let mut wave_fmt = [0u8; 8];
        buf.copy_to_slice(&mut wave_fmt);

        if riff != RIFF_TAG || wave_fmt != WAVE_FMT_TAG {
            return Err(Error::format(format!(
                "malformed WAV descriptor: tags {:?} {:?}",
                String::from_utf8_lossy(&riff),
                String::from_utf8_lossy(&wave_fmt)
            )));
        }

        Ok(Self {
            riff_size,
            fmt_size: buf.get_u32_le(),
            audio_format: buf.get_u16_le(),
            channels: buf.get_u16_le(),
            sample_rate: buf.get_u32_le(),
            byte_rate: buf.get_u32_le(),
            block_align: buf.get_u16_le(),
            bits_per_sample: buf.get_u16_le(),
        })
    }

    /// Append the descriptor in `layout`; `data_len` fills the `data` chunk
    /// header of the standard layout.
    pub fn write_descriptor(&self, buf: &mut BytesMut, layout: DescriptorLayout, data_len: u32) {
        buf.put_slice(&RIFF_TAG);
        buf.put_u32_le(self.riff_size);
        buf.put_slice(&WAVE_FMT_TAG);
        buf.put_u32_le(self.fmt_size);
        buf.put_u16_le(self.audio_format);
        buf.put_u16_le(self.channels);
        buf.put_u32_le(self.sample_rate);
        buf.put_u32_le(self.byte_rate);
        buf.put_u16_le(self.block_align);
        buf.put_u16_le(self.bits_per_sample);

        if layout == DescriptorLayout::Standard {
            buf.put_slice(&DATA_TAG);
            buf.put_u32_le(data_len);
        }
    }

    /// Playback time of `bytes` of audio in this format.
    pub fn duration_secs(&self, bytes: u64) -> f64 {
        if self.byte_rate == 0 {
            0.0
        } else {
            bytes as f64 / self.byte_rate as f64
        }
    }
}

/// A PCM payload with its format. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub format: AudioFormat,
    data: Bytes,
}

impl AudioTrack {
    /// Pair a format with its payload.
    pub fn new(format: AudioFormat, data: impl Into<Bytes>) -> Result<Self> {
        if format.byte_rate == 0 {
            return Err(Error::format("malformed WAV descriptor: byte rate is 0"));
        }
        if format.block_align == 0 {
            return Err(Error::format("malformed WAV descriptor: block align is 0"));
        }

        Ok(Self {
            format,
            data: data.into(),
        })
    }

    /// Load a WAV file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        debug!("loading WAV {} ({} bytes)", path.display(), data.len());
        Self::parse(Bytes::from(data))
    }

    /// Parse a complete WAV file image.
    pub fn parse(mut data: Bytes) -> Result<Self> {
        let format = AudioFormat::parse_descriptor(&mut data)?;

        // fmt chunks larger than 16 bytes carry extension fields we skip.
        let extension = format.fmt_size.saturating_sub(16) as usize;
        if extension > data.remaining() {
            return Err(Error::format("WAV fmt chunk truncated"));
        }
        data.advance(extension);

        loop {
            if data.remaining() < 8 {
                return Err(Error::format("WAV chunk header truncated before data chunk"));
            }

            let mut id = [0u8; 4];
            data.copy_to_slice(&mut id);
            let size = data.get_u32_le() as usize;

            if id == DATA_TAG {
                let available = size.min(data.remaining());
                if available < size {
                    warn!(
                        "WAV data chunk declares {} bytes, only {} present",
                        size, available
                    );
                }
                return Self::new(format, data.split_to(available));
            }

            // RIFF chunks are word aligned.
            let skip = (size + (size & 1)).min(data.remaining());
            debug!(
                "skipping WAV chunk {:?} ({} bytes)",
                String::from_utf8_lossy(&id),
                size
            );
            data.advance(skip);
        }
    }

    /// Raw PCM bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn byte_rate(&self) -> u32 {
        self.format.byte_rate
    }

    pub fn block_align(&self) -> u16 {
        self.format.block_align
    }

    pub fn channels(&self) -> u16 {
        self.format.channels
    }

    /// Playback time of the whole track.
    pub fn duration_secs(&self) -> f64 {
        self.format.duration_secs(self.data.len() as u64)
    }
}
