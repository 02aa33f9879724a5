//! Container inspection for the `inspect` command.

use anyhow::{Context, Result};
use bytes::Bytes;
use gobmovie_media::{gcf, gmv, AudioFormat, DescriptorLayout, GcfHeader, GmvFile, GmvHeader};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Summary of a GCF or GMV file.
#[derive(Debug, Serialize)]
#[serde(tag = "container", rename_all = "lowercase")]
pub enum Report {
    Gcf {
        header: GcfHeader,
        blobs: usize,
        payload_bytes: u64,
        largest_blob: u64,
    },
    Gmv {
        header: GmvHeader,
        layout: DescriptorLayout,
        audio: AudioFormat,
        frames: usize,
        frame_bytes: u64,
        audio_bytes: u64,
        duration_secs: f64,
        audio_duration_secs: f64,
    },
}

/// Read and summarise a container file.
pub fn inspect_file(path: &Path) -> Result<Report> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    inspect_bytes(Bytes::from(data)).with_context(|| format!("Failed to inspect {:?}", path))
}

/// Summarise a container image, choosing the format by its signature.
pub fn inspect_bytes(data: Bytes) -> Result<Report> {
    let signature = data
        .get(..4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));

    match signature {
        Some(gcf::SIGNATURE) => {
            let container = gcf::decode(data)?;
            Ok(Report::Gcf {
                header: container.header,
                blobs: container.len(),
                payload_bytes: container.payload_bytes(),
                largest_blob: container
                    .blobs
                    .iter()
                    .map(|b| b.len() as u64)
                    .max()
                    .unwrap_or(0),
            })
        }
        Some(gmv::SIGNATURE) => {
            let file = GmvFile::parse(data)?;
            Ok(Report::Gmv {
                header: file.header,
                layout: file.layout,
                audio: file.audio_format,
                frames: file.len(),
                frame_bytes: file.total_frame_bytes(),
                audio_bytes: file.total_audio_bytes(),
                duration_secs: file.duration_secs(),
                audio_duration_secs: file.audio_duration_secs(),
            })
        }
        _ => anyhow::bail!("Not a GCF or GMV file"),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Gcf {
                header,
                blobs,
                payload_bytes,
                largest_blob,
            } => {
                writeln!(f, "Container: GCF")?;
                writeln!(f, "Blobs: {} (header: {})", blobs, header.blob_count)?;
                writeln!(f, "Payload: {} bytes", payload_bytes)?;
                write!(f, "Largest blob: {} bytes", largest_blob)
            }
            Report::Gmv {
                header,
                layout,
                audio,
                frames,
                frame_bytes,
                audio_bytes,
                duration_secs,
                audio_duration_secs,
            } => {
                writeln!(f, "Container: GMV")?;
                writeln!(f, "Frames: {} (header: {})", frames, header.frame_count)?;
                writeln!(f, "FPS: {}", header.fps)?;
                writeln!(
                    f,
                    "Audio: {} Hz, {} ch, {} bits, block {} ({:?} descriptor)",
                    audio.sample_rate, audio.channels, audio.bits_per_sample, audio.block_align, layout
                )?;
                writeln!(f, "Frame data: {} bytes", frame_bytes)?;
                writeln!(f, "Audio data: {} bytes", audio_bytes)?;
                write!(
                    f,
                    "Duration: {:.3}s video, {:.3}s audio",
                    duration_secs, audio_duration_secs
                )
            }
        }
    }
}
