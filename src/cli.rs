// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Running the interactive terminal viewer
//! - Taking photos and recording videos of the annotated feed
//! - Scanning QR codes

use eyecam::backends::camera::types::BackendType;
use eyecam::backends::camera::{MediaPlatform, get_platform, list_video_inputs};
use eyecam::backends::virtual_camera::VirtualPlatform;
use eyecam::pipelines::video::RecordToggle;
use eyecam::{AppServices, CameraApp, Config};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How long to wait for the first frame after opening a camera
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra time for exposure and the first landmarks to settle
const WARMUP: Duration = Duration::from_millis(500);

/// Options shared by every command
pub struct Options {
    pub backend: Option<BackendType>,
    pub images: Vec<PathBuf>,
    pub pose_helper: Option<String>,
}

impl Options {
    fn config(&self) -> Config {
        let mut config = Config::load();
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(helper) = &self.pose_helper {
            config.pose_helper = helper.split_whitespace().map(str::to_string).collect();
        }
        config
    }

    fn platform(
        &self,
        config: &Config,
    ) -> Result<Arc<dyn MediaPlatform>, Box<dyn std::error::Error>> {
        if !self.images.is_empty() {
            if config.backend != BackendType::Virtual {
                return Err("--image requires the virtual backend".into());
            }
            return Ok(Arc::new(VirtualPlatform::with_images(&self.images)));
        }
        Ok(get_platform(config.backend)?)
    }
}

/// Build an app, pinned to the camera at `camera_index` when given
fn build_app(
    options: &Options,
    camera_index: Option<usize>,
    configure: impl FnOnce(&mut Config),
) -> Result<CameraApp, Box<dyn std::error::Error>> {
    let mut config = options.config();
    configure(&mut config);
    let platform = options.platform(&config)?;

    if let Some(index) = camera_index {
        let cameras = list_video_inputs(platform.as_ref());
        if cameras.is_empty() {
            return Err("No cameras found".into());
        }
        let camera = cameras.get(index).ok_or_else(|| {
            format!(
                "Camera index {} out of range (0-{})",
                index,
                cameras.len() - 1
            )
        })?;
        println!("Using camera: {}", camera.label);
        config.last_camera_id = Some(camera.id.clone());
    }

    let services = AppServices::with_platform(platform, &config);
    Ok(CameraApp::new(config, services))
}

/// Wait for the first frame, then let the feed settle
async fn wait_for_video(app: &CameraApp) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    while !app.session().video().has_video() {
        if start.elapsed() > FIRST_FRAME_TIMEOUT {
            return Err("Failed to capture frame from camera".into());
        }
        tokio::time::sleep(Duration::from_millis(16)).await;
    }
    tokio::time::sleep(WARMUP).await;
    Ok(())
}

fn stop_flag() -> Result<Arc<AtomicBool>, Box<dyn std::error::Error>> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;
    Ok(stop)
}

/// List all available cameras
pub fn list_cameras(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.config();
    let platform = options.platform(&config)?;
    let cameras = list_video_inputs(platform.as_ref());

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let default = eyecam::backends::camera::default_device_index(&cameras);
    println!("Available cameras ({}):", platform.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let marker = if index == default { "*" } else { " " };
        println!("{} [{}] {}", marker, index, camera.label);
        println!("      Id: {}", camera.id);
    }

    Ok(())
}

/// Run the interactive terminal viewer
pub fn run_viewer(
    options: &Options,
    camera_index: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = build_app(options, camera_index, |_| {})?;

    let rt = tokio::runtime::Runtime::new()?;
    let navigated = rt.block_on(async {
        // Open failures show in the viewer's error line
        let _ = app.start().await;
        let result = eyecam::terminal::run(&mut app).await;
        app.shutdown().await;
        result
    })?;

    if let Err(e) = app.config().save() {
        tracing::warn!(error = %e, "Failed to save config");
    }
    if let Some(url) = navigated {
        println!("Opened {}", url);
    }
    Ok(())
}

/// Take a photo of the annotated feed
pub fn take_photo(
    options: &Options,
    camera_index: Option<usize>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = build_app(options, camera_index, |config| {
        if output.is_some() {
            config.output_dir = output;
        }
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    let path = rt.block_on(async {
        app.start().await?;
        println!("Capturing...");
        wait_for_video(&app).await?;

        let photo = app.capture_photo()?;
        let path = app.save_artifact(&photo).await?;
        app.shutdown().await;
        Ok::<_, Box<dyn std::error::Error>>(path)
    })?;

    println!("Photo saved: {}", path.display());
    Ok(())
}

/// Record a video of the annotated feed
pub fn record_video(
    options: &Options,
    camera_index: Option<usize>,
    duration: u64,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = build_app(options, camera_index, |config| {
        if output.is_some() {
            config.output_dir = output;
        }
    })?;
    let stop = stop_flag()?;

    let rt = tokio::runtime::Runtime::new()?;
    let path = rt.block_on(async {
        app.start().await?;
        wait_for_video(&app).await?;

        println!("Duration: {} seconds", duration);
        println!();
        println!("Recording... (press Ctrl+C to stop early)");
        app.toggle_record().await?;

        let start = Instant::now();
        let target = Duration::from_secs(duration);
        while start.elapsed() < target {
            if stop.load(Ordering::SeqCst) {
                println!();
                println!("Stopping early...");
                break;
            }

            let elapsed = start.elapsed().as_secs();
            print!("\rRecording: {:02}:{:02}", elapsed / 60, elapsed % 60);
            std::io::Write::flush(&mut std::io::stdout())?;

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        println!();

        let RecordToggle::Stopped(video) = app.toggle_record().await? else {
            return Err("Recording was not running".into());
        };
        let path = app.save_artifact(&video).await?;
        app.shutdown().await;
        Ok::<_, Box<dyn std::error::Error>>(path)
    })?;

    println!("Video saved: {}", path.display());
    Ok(())
}

/// Print QR payloads until a URL is opened, the timeout passes or Ctrl+C
pub fn scan(
    options: &Options,
    camera_index: Option<usize>,
    timeout: u64,
    navigate: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = build_app(options, camera_index, |config| {
        config.navigate_on_url = navigate;
    })?;
    let stop = stop_flag()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        app.start().await?;
        println!("Scanning... (press Ctrl+C to stop)");

        let mut payloads = app.readouts().qr.subscribe();
        let start = Instant::now();
        loop {
            if stop.load(Ordering::SeqCst)
                || (timeout > 0 && start.elapsed() > Duration::from_secs(timeout))
            {
                break;
            }
            if let Some(url) = app.poll_navigation().await {
                println!("Opened {}", url);
                break;
            }
            if payloads.has_changed().unwrap_or(false) {
                let text = payloads.borrow_and_update().clone();
                if !text.is_empty() {
                    println!("{}", text);
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        app.shutdown().await;
        Ok::<_, Box<dyn std::error::Error>>(())
    })
}
