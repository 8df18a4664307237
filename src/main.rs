// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use eyecam::backends::camera::types::BackendType;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "eyecam")]
#[command(about = "Camera with eye landmark overlay, QR scanning and capture")]
#[command(version = eyecam::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Camera backend (virtual or v4l2); defaults to the configured one
    #[arg(short, long, global = true)]
    backend: Option<BackendType>,

    /// Add a virtual camera showing this image (virtual backend only)
    #[arg(long = "image", global = true)]
    images: Vec<PathBuf>,

    /// Helper program for pose estimation, e.g. "python3 pose_helper.py"
    #[arg(long, global = true)]
    pose_helper: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal viewer (default)
    Run {
        /// Camera index to use (from 'eyecam list')
        #[arg(short, long)]
        camera: Option<usize>,
    },

    /// List available cameras
    List,

    /// Take a photo of the annotated feed
    Photo {
        /// Camera index to use (from 'eyecam list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Output directory (default: configured output dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a video of the annotated feed
    Video {
        /// Camera index to use (from 'eyecam list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Output directory (default: configured output dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Scan for QR codes and print their contents
    Scan {
        /// Camera index to use (from 'eyecam list')
        #[arg(short, long)]
        camera: Option<usize>,

        /// Give up after this many seconds (0 waits forever)
        #[arg(short, long, default_value = "0")]
        timeout: u64,

        /// Print URLs instead of opening them
        #[arg(long)]
        no_navigate: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=eyecam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = cli::Options {
        backend: cli.backend,
        images: cli.images,
        pose_helper: cli.pose_helper,
    };

    match cli.command.unwrap_or(Commands::Run { camera: None }) {
        Commands::Run { camera } => cli::run_viewer(&options, camera),
        Commands::List => cli::list_cameras(&options),
        Commands::Photo { camera, output } => cli::take_photo(&options, camera, output),
        Commands::Video {
            camera,
            duration,
            output,
        } => cli::record_video(&options, camera, duration, output),
        Commands::Scan {
            camera,
            timeout,
            no_navigate,
        } => cli::scan(&options, camera, timeout, !no_navigate),
    }
}
