//! Ordered frame sources.
//!
//! The GMV muxer and the GCF writer only see a [`FrameSource`]: a known
//! number of frames handed out one at a time in playback order. Where the
//! frames come from (a directory of images, an existing GCF, memory) is up
//! to the implementation.

use crate::gcf::GcfContainer;
use crate::Result;
use bytes::Bytes;
use std::collections::VecDeque;

/// An ordered sequence of frame blobs with a known length.
pub trait FrameSource {
    /// Total number of frames this source yields.
    fn count(&self) -> usize;

    /// Next frame in order, or `None` once the source is drained.
    fn next_frame(&mut self) -> Result<Option<Bytes>>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn count(&self) -> usize {
        (**self).count()
    }

    fn next_frame(&mut self) -> Result<Option<Bytes>> {
        (**self).next_frame()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn count(&self) -> usize {
        (**self).count()
    }

    fn next_frame(&mut self) -> Result<Option<Bytes>> {
        (**self).next_frame()
    }
}

/// Frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: VecDeque<Bytes>,
    count: usize,
}

impl MemorySource {
    /// Create a source from any sequence of byte buffers.
    pub fn new<I, B>(frames: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let frames: VecDeque<Bytes> = frames.into_iter().map(Into::into).collect();
        let count = frames.len();
        Self { frames, count }
    }
}

impl FrameSource for MemorySource {
    fn count(&self) -> usize {
        self.count
    }

    fn next_frame(&mut self) -> Result<Option<Bytes>> {
        Ok(self.frames.pop_front())
    }
}

/// Frames taken from a decoded GCF container.
///
/// The count is the number of blobs actually decoded; the header's blob
/// count is advisory and never consulted.
#[derive(Debug)]
pub struct GcfSource {
    blobs: std::vec::IntoIter<Bytes>,
    count: usize,
}

impl GcfSource {
    pub fn new(container: GcfContainer) -> Self {
        let count = container.blobs.len();
        Self {
            blobs: container.blobs.into_iter(),
            count,
        }
    }
}

impl From<GcfContainer> for GcfSource {
    fn from(container: GcfContainer) -> Self {
        Self::new(container)
    }
}

impl FrameSource for GcfSource {
    fn count(&self) -> usize {
        self.count
    }

    fn next_frame(&mut self) -> Result<Option<Bytes>> {
        Ok(self.blobs.next())
    }
}
