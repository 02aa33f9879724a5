//! Frame rates and audio-per-frame slice planning.
//!
//! Each GMV frame carries the audio that plays while it is shown. The byte
//! rate rarely divides evenly by the frame rate, so every frame gets a base
//! slice and the leftover fraction of a sample per frame is accumulated as
//! an exact fraction. Whenever the accumulator crosses one, that frame gets
//! one extra block. For PCM, where `byte_rate == sample_rate * block_align`,
//! the sum over N frames is then `block_align * floor(N * sample_rate / fps)`
//! before clamping, with no drift.

use crate::wav::AudioFormat;
use crate::{Error, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Frame rate as an exact, reduced fraction of frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fps {
    num: u32,
    den: u32,
}

impl Fps {
    /// Create `num / den` frames per second.
    pub fn new(num: u32, den: u32) -> Result<Self> {
        if num == 0 || den == 0 {
            return Err(Error::validation(format!(
                "frame rate must be positive, got {}/{}",
                num, den
            )));
        }
        let g = gcd(num as u64, den as u64) as u32;
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// Whole frames per second.
    pub fn integer(fps: u32) -> Result<Self> {
        Self::new(fps, 1)
    }

    pub fn numerator(&self) -> u32 {
        self.num
    }

    pub fn denominator(&self) -> u32 {
        self.den
    }

    /// Value stored in the GMV header.
    pub fn as_f32(&self) -> f32 {
        (self.num as f64 / self.den as f64) as f32
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Frame rate embedded in a container name such as `clip.29.97.gcf`.
    ///
    /// The rate is the longest dot-separated tail of the file stem that
    /// parses, so `clip.29.97.gcf` gives 29.97 and `my.clip.30.gcf` gives 30.
    /// A name with a tail that never parses logs a warning.
    pub fn from_container_name(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let (_, rate) = stem.split_once('.')?;

        let found = std::iter::once(rate)
            .chain(rate.match_indices('.').map(|(i, _)| &rate[i + 1..]))
            .find_map(|tail| tail.parse::<Fps>().ok());
        if found.is_none() {
            warn!(
                "ignoring unparsable frame rate {:?} in {}",
                rate,
                path.display()
            );
        }
        found
    }
}

impl FromStr for Fps {
    type Err = Error;

    /// Accepts `30`, `29.97` and `30000/1001`. Decimals are converted
    /// exactly, never through floating point.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::validation(format!("invalid frame rate: {:?}", s));

        if let Some((num, den)) = s.split_once('/') {
            let num = num.trim().parse::<u32>().map_err(|_| invalid())?;
            let den = den.trim().parse::<u32>().map_err(|_| invalid())?;
            return Self::new(num, den);
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        let digits_ok = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty())
            || !digits_ok(whole)
            || !digits_ok(frac)
            || frac.len() > 9
        {
            return Err(invalid());
        }

        let scale = 10u64.pow(frac.len() as u32);
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac: u64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid())?
        };

        let num = whole
            .checked_mul(scale)
            .and_then(|n| n.checked_add(frac))
            .ok_or_else(invalid)?;
        let g = gcd(num, scale).max(1);
        let (num, den) = (num / g, scale / g);

        let num = u32::try_from(num).map_err(|_| invalid())?;
        let den = u32::try_from(den).map_err(|_| invalid())?;
        Self::new(num, den)
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}", self.as_f64())
        }
    }
}

/// Greatest common divisor (Euclidean algorithm).
fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Per-frame audio slice distributor.
///
/// Yields one slice size per frame, in order. Slices never exceed what is
/// left of the track; after the track is exhausted every slice is 0. As an
/// [`Iterator`] it never ends, so take as many frames as needed.
#[derive(Debug, Clone)]
pub struct RateAccumulator {
    base_slice: u32,
    block_align: u32,
    frac_num: u64,
    frac_den: u64,
    /// Accumulated remainder as a numerator over `frac_den`; always < `frac_den`.
    acc: u64,
    remaining: u64,
    bumps: u64,
}

impl RateAccumulator {
    /// Plan slices for a track of `track_len` bytes in `format` at `fps`.
    pub fn new(fps: Fps, format: &AudioFormat, track_len: usize) -> Result<Self> {
        if format.byte_rate == 0 {
            return Err(Error::validation("audio byte rate is 0"));
        }
        if format.block_align == 0 {
            return Err(Error::validation("audio block align is 0"));
        }

        let num = fps.num as u64;
        let den = fps.den as u64;
        let align = format.block_align as u64;

        let raw = format.byte_rate as u64 * den / num;
        let base = if align.is_power_of_two() {
            raw & !(align - 1)
        } else {
            raw / align * align
        };

        // A bumped slice must still fit a size field below the sentinel.
        if base + align >= u32::MAX as u64 {
            return Err(Error::validation(format!(
                "audio slice of {} bytes per frame at {} fps is too large",
                base, fps
            )));
        }

        let rem = format.sample_rate as u64 * den % num;
        let (frac_num, frac_den) = if rem == 0 {
            (0, 1)
        } else {
            let g = gcd(rem, num);
            (rem / g, num / g)
        };

        Ok(Self {
            base_slice: base as u32,
            block_align: align as u32,
            frac_num,
            frac_den,
            acc: 0,
            remaining: track_len as u64,
            bumps: 0,
        })
    }

    /// Slice size before remainder correction.
    pub fn base_slice(&self) -> u32 {
        self.base_slice
    }

    /// Fractional samples per frame as a reduced `(numerator, denominator)`.
    pub fn remainder(&self) -> (u64, u64) {
        (self.frac_num, self.frac_den)
    }

    /// Track bytes not yet handed out.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// How many slices so far received an extra block.
    pub fn bumps(&self) -> u64 {
        self.bumps
    }

    /// Size of the next frame's audio slice.
    pub fn next_slice(&mut self) -> u32 {
        let mut slice = self.base_slice as u64;

        self.acc += self.frac_num;
        if self.acc >= self.frac_den {
            self.acc -= self.frac_den;
            slice += self.block_align as u64;
            self.bumps += 1;
        }

        let slice = slice.min(self.remaining);
        self.remaining -= slice;
        slice as u32
    }

    /// Slice sizes for the next `frames` frames.
    pub fn plan(&mut self, frames: usize) -> Vec<u32> {
        self.by_ref().take(frames).collect()
    }
}

impl Iterator for RateAccumulator {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        Some(self.next_slice())
    }
}
