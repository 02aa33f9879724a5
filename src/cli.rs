use clap::{Parser, Subcommand};
use gobmovie_media::Fps;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gobmovie")]
#[command(author, version, about = "Packages image frames and WAV audio into GCF/GMV containers")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Combine the files of a directory into a GCF container
    Combine {
        /// Directory holding the files
        dir: PathBuf,

        /// Output GCF path
        output: PathBuf,

        /// File extension to pick up (default from config, else jpg)
        #[arg(short, long)]
        ext: Option<String>,
    },

    /// Build a GMV movie from a directory of frames and a WAV file
    Movie {
        /// Directory holding the frames
        dir: PathBuf,

        /// PCM WAV file
        wav: PathBuf,

        /// Frames per second ("30", "29.97", "30000/1001")
        fps: Fps,

        /// Output GMV path
        output: PathBuf,

        /// Frame file extension (default from config, else jpg)
        #[arg(short, long)]
        ext: Option<String>,

        /// Write the 36-byte audio descriptor used by older players
        #[arg(long)]
        legacy_header: bool,
    },

    /// Convert a GCF of frames plus a WAV file into a GMV movie
    Convert {
        /// GCF container holding the frames, e.g. clip.29.97.gcf
        gcf: PathBuf,

        /// PCM WAV file
        wav: PathBuf,

        /// Output GMV path
        output: PathBuf,

        /// Frames per second (default: taken from the GCF file name)
        #[arg(long)]
        fps: Option<Fps>,

        /// Write the 36-byte audio descriptor used by older players
        #[arg(long)]
        legacy_header: bool,
    },

    /// Show the structure of a GCF or GMV file
    Inspect {
        /// File to inspect
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
