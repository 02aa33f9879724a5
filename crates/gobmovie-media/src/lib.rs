//! gobmovie-media: GCF/GMV container codecs and audio rate matching
//!
//! This crate holds the binary formats used to package still-image frames
//! and a PCM audio track for simple movie playback on small devices.
//!
//! # Modules
//!
//! - `gcf` - GCF flat container (length-prefixed blobs)
//! - `wav` - WAV descriptor and data chunk extraction
//! - `rate` - Exact frame rates and per-frame audio slice planning
//! - `gmv` - GMV interleaved frame/audio container (mux and demux)
//! - `source` - The ordered frame source consumed by the writers
//!
//! # Architecture
//!
//! A GMV is written in one pass:
//!
//! 1. The audio track is loaded whole and its descriptor is copied through
//! 2. The rate accumulator plans every frame's audio slice up front
//! 3. Frames are pulled from a [`FrameSource`] and written with their slice
//!
//! Both containers end with `0xFFFFFFFF` sentinels instead of relying on the
//! header counts, so readers stop on the sentinel.

pub mod error;
pub mod gcf;
pub mod gmv;
pub mod rate;
pub mod source;
pub mod wav;

pub use error::{Error, Result};
pub use gcf::{GcfContainer, GcfHeader, GcfWriter};
pub use gmv::{GmvFile, GmvHeader, GmvRecord, MuxSummary, Muxer};
pub use rate::{Fps, RateAccumulator};
pub use source::{FrameSource, GcfSource, MemorySource};
pub use wav::{AudioFormat, AudioTrack, DescriptorLayout};

/// Length value that terminates a GCF blob stream and each GMV stream.
pub const SENTINEL: u32 = 0xFFFF_FFFF;

/// Convert a payload length to its u32 size field.
///
/// Lengths that collide with [`SENTINEL`] or exceed u32 are rejected.
pub(crate) fn checked_len(len: usize, what: &str) -> Result<u32> {
    match u32::try_from(len) {
        Ok(size) if size != SENTINEL => Ok(size),
        _ => Err(Error::validation(format!(
            "{} of {} bytes does not fit a 32-bit size field",
            what, len
        ))),
    }
}
