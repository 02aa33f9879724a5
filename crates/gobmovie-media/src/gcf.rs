//! GCF (Gob Combined File) container.
//!
//! A flat, length-prefixed sequence of opaque blobs:
//!
//! ```text
//! u32 signature      "GCF0" (0x30464347)
//! u32 blob_count     advisory
//! u32 reserved[2]    zero
//! { u32 size; u8 data[size] } ...
//! u32 0xFFFFFFFF     terminator
//! ```
//!
//! All fields are little-endian.

use crate::error::ensure_remaining;
use crate::source::FrameSource;
use crate::{checked_len, Error, Result, SENTINEL};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Write;
use tracing::{debug, trace};

/// "GCF0" read as a little-endian u32.
pub const SIGNATURE: u32 = 0x3046_4347;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Fixed GCF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GcfHeader {
    pub signature: u32,
    /// Number of blobs the writer announced. Not used to drive decoding.
    pub blob_count: u32,
    pub reserved: [u32; 2],
}

impl GcfHeader {
    /// Create a header announcing `blob_count` blobs.
    pub fn new(blob_count: u32) -> Self {
        Self {
            signature: SIGNATURE,
            blob_count,
            reserved: [0, 0],
        }
    }

    /// Append the encoded header to `buf`.
    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.signature);
        buf.put_u32_le(self.blob_count);
        buf.put_u32_le(self.reserved[0]);
        buf.put_u32_le(self.reserved[1]);
    }

    /// Read and validate a header from the front of `buf`.
    pub fn parse(buf: &mut impl Buf) -> Result<Self> {
        ensure_remaining(&*buf, HEADER_SIZE)?;

        let signature = buf.get_u32_le();
        if signature != SIGNATURE {
            return Err(Error::format(format!(
                "bad GCF signature 0x{:08x} (expected 0x{:08x})",
                signature, SIGNATURE
            )));
        }

        Ok(Self {
            signature,
            blob_count: buf.get_u32_le(),
            reserved: [buf.get_u32_le(), buf.get_u32_le()],
        })
    }
}

/// A decoded GCF: header plus blobs in file order.
///
/// Blobs are views into the buffer passed to [`decode`]; no payload is copied.
#[derive(Debug, Clone)]
pub struct GcfContainer {
    pub header: GcfHeader,
    pub blobs: Vec<Bytes>,
}

impl GcfContainer {
    /// Number of blobs actually present.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Sum of all blob payload sizes.
    pub fn payload_bytes(&self) -> u64 {
        self.blobs.iter().map(|b| b.len() as u64).sum()
    }
}

/// Streaming GCF encoder.
///
/// The header is written on construction, so the blob count must be known
/// up front. Call [`GcfWriter::finish`] to emit the terminator; dropping the
/// writer without finishing leaves an unterminated stream.
pub struct GcfWriter<W: Write> {
    writer: W,
    announced: u32,
    written: u32,
}

impl<W: Write> GcfWriter<W> {
    /// Write the header announcing `blob_count` blobs.
    pub fn new(mut writer: W, blob_count: usize) -> Result<Self> {
        let announced = u32::try_from(blob_count)
            .map_err(|_| Error::validation(format!("too many blobs for GCF: {}", blob_count)))?;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        GcfHeader::new(announced).write(&mut buf);
        writer.write_all(&buf)?;

        Ok(Self {
            writer,
            announced,
            written: 0,
        })
    }

    /// Write one length-prefixed blob.
    pub fn write_blob(&mut self, blob: &[u8]) -> Result<()> {
        let size = checked_len(blob.len(), "GCF blob")?;

        self.writer.write_all(&size.to_le_bytes())?;
        if size > 0 {
            self.writer.write_all(blob)?;
        }

        trace!("GCF blob {} size:{}", self.written, size);
        self.written += 1;
        Ok(())
    }

    /// Number of blobs written so far.
    pub fn written(&self) -> u32 {
        self.written
    }

    /// Write the terminator, flush, and hand back the inner writer with the
    /// number of blobs written.
    pub fn finish(mut self) -> Result<(W, u32)> {
        if self.written != self.announced {
            debug!(
                "GCF header announced {} blobs but {} were written",
                self.announced, self.written
            );
        }

        self.writer.write_all(&SENTINEL.to_le_bytes())?;
        self.writer.flush()?;
        Ok((self.writer, self.written))
    }
}

/// Encode `blobs` into a complete GCF byte stream.
pub fn encode<I, B>(blobs: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let blobs: Vec<B> = blobs.into_iter().collect();
    let payload: usize = blobs.iter().map(|b| b.as_ref().len() + 4).sum();

    let out = Vec::with_capacity(HEADER_SIZE + payload + 4);
    let mut writer = GcfWriter::new(out, blobs.len())?;
    for blob in &blobs {
        writer.write_blob(blob.as_ref())?;
    }
    let (out, _) = writer.finish()?;
    Ok(out)
}

/// Drain `source` into a GCF written to `writer`.
pub fn write_source<S, W>(mut source: S, writer: W) -> Result<(W, u32)>
where
    S: FrameSource,
    W: Write,
{
    let expected = source.count();
    let mut gcf = GcfWriter::new(writer, expected)?;

    while let Some(blob) = source.next_frame()? {
        gcf.write_blob(&blob)?;
    }

    if gcf.written() as usize != expected {
        return Err(Error::format(format!(
            "frame source ended after {} of {} frames",
            gcf.written(),
            expected
        )));
    }

    gcf.finish()
}

/// Decode a complete GCF byte stream.
///
/// Decoding stops at the terminator regardless of the header's blob count.
pub fn decode(mut data: Bytes) -> Result<GcfContainer> {
    let header = GcfHeader::parse(&mut data)?;

    // Cap the preallocation; the count comes from untrusted input.
    let mut blobs = Vec::with_capacity(header.blob_count.min(4096) as usize);

    loop {
        if data.remaining() < 4 {
            return Err(Error::format(format!(
                "GCF stream ended inside the length field after {} blobs",
                blobs.len()
            )));
        }

        let size = data.get_u32_le();
        if size == SENTINEL {
            break;
        }

        let size = size as usize;
        if size > data.remaining() {
            return Err(Error::format(format!(
                "GCF blob {} declares {} bytes but only {} remain",
                blobs.len(),
                size,
                data.remaining()
            )));
        }

        blobs.push(data.split_to(size));
    }

    if blobs.len() != header.blob_count as usize {
        debug!(
            "GCF header announces {} blobs, decoded {}",
            header.blob_count,
            blobs.len()
        );
    }
    if data.has_remaining() {
        debug!("ignoring {} bytes after GCF terminator", data.remaining());
    }

    Ok(GcfContainer { header, blobs })
}
