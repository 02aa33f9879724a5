mod cli;

use gobmovie::{config, inspect, scanner};
use gobmovie_media::{gcf, AudioTrack, DescriptorLayout, FrameSource, GcfSource, Muxer};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use cli::{Cli, Commands};
use gobmovie_media::Fps;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            // Verbose mode: per-frame detail
            "gobmovie=trace,gobmovie_media=trace".to_string()
        } else {
            "gobmovie=info,gobmovie_media=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Combine { dir, output, ext } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let ext = ext.unwrap_or(config.input.extension);
            combine(&dir, &output, &ext)
        }
        Commands::Movie {
            dir,
            wav,
            fps,
            output,
            ext,
            legacy_header,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let ext = ext.unwrap_or(config.input.extension);
            let layout = descriptor_layout(legacy_header || config.movie.legacy_header);
            movie(&dir, &wav, fps, &output, &ext, layout)
        }
        Commands::Convert {
            gcf,
            wav,
            output,
            fps,
            legacy_header,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let fps = match fps.or_else(|| Fps::from_container_name(&gcf)) {
                Some(fps) => fps,
                None => match config.movie.fps()? {
                    Some(fps) => fps,
                    None => anyhow::bail!(
                        "No frame rate given: pass --fps or name the file <name>.<fps>.gcf"
                    ),
                },
            };
            let layout = descriptor_layout(legacy_header || config.movie.legacy_header);
            convert(&gcf, &wav, &output, fps, layout)
        }
        Commands::Inspect { file, json } => inspect_file(&file, json),
    }
}

fn descriptor_layout(legacy: bool) -> DescriptorLayout {
    if legacy {
        DescriptorLayout::Legacy
    } else {
        DescriptorLayout::Standard
    }
}

fn scan_nonempty(dir: &Path, ext: &str) -> Result<Vec<std::path::PathBuf>> {
    let paths = scanner::scan_frames(dir, ext)?;
    if paths.is_empty() {
        anyhow::bail!(
            "No *.{} files found in {:?}",
            ext.trim_start_matches('.'),
            dir
        );
    }
    Ok(paths)
}

fn combine(dir: &Path, output: &Path, ext: &str) -> Result<()> {
    let paths = scan_nonempty(dir, ext)?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {:?}", output))?;
    let (_, written) = gcf::write_source(scanner::DirectorySource::new(paths), BufWriter::new(file))
        .with_context(|| format!("Failed to write GCF: {:?}", output))?;

    tracing::info!("Combined {} files into {:?}", written, output);
    Ok(())
}

fn movie(
    dir: &Path,
    wav: &Path,
    fps: Fps,
    output: &Path,
    ext: &str,
    layout: DescriptorLayout,
) -> Result<()> {
    let paths = scan_nonempty(dir, ext)?;
    let audio = load_audio(wav)?;

    write_movie(scanner::DirectorySource::new(paths), &audio, fps, output, layout)
}

fn convert(
    gcf_path: &Path,
    wav: &Path,
    output: &Path,
    fps: Fps,
    layout: DescriptorLayout,
) -> Result<()> {
    tracing::info!("FPS: {}", fps);

    let data = std::fs::read(gcf_path)
        .with_context(|| format!("Failed to read GCF file: {:?}", gcf_path))?;
    let container = gcf::decode(Bytes::from(data))
        .with_context(|| format!("Failed to decode GCF file: {:?}", gcf_path))?;
    tracing::debug!("GCF {:?}: {} blobs", gcf_path, container.len());

    let audio = load_audio(wav)?;
    write_movie(GcfSource::from(container), &audio, fps, output, layout)
}

fn load_audio(wav: &Path) -> Result<AudioTrack> {
    let audio =
        AudioTrack::load(wav).with_context(|| format!("Failed to load WAV file: {:?}", wav))?;

    tracing::debug!(
        "WAV {:?}: {} Hz, {} ch, {} B/s, block {}, {} bytes",
        wav,
        audio.sample_rate(),
        audio.channels(),
        audio.byte_rate(),
        audio.block_align(),
        audio.len()
    );
    Ok(audio)
}

/// Mux into `output`. The muxer validates its inputs before the file is
/// created, so a rejected mux leaves no file behind.
fn write_movie<S: FrameSource>(
    source: S,
    audio: &AudioTrack,
    fps: Fps,
    output: &Path,
    layout: DescriptorLayout,
) -> Result<()> {
    let muxer = Muxer::new(source, audio, fps)?.layout(layout);

    let file = File::create(output)
        .with_context(|| format!("Failed to create output file: {:?}", output))?;
    let summary = muxer
        .write_to(BufWriter::new(file))
        .with_context(|| format!("Failed to write GMV: {:?}", output))?;

    tracing::info!(
        "Wrote {:?}: {} frames, {} audio bytes ({} unused), {} bytes total",
        output,
        summary.frames,
        summary.audio_bytes,
        summary.audio_unused,
        summary.bytes_written
    );
    Ok(())
}

fn inspect_file(file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let report = inspect::inspect_file(file)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}
