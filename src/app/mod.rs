// SPDX-License-Identifier: GPL-3.0-only

//! Camera application controller
//!
//! [`CameraApp`] wires the capture session to its three consumers (the
//! annotation loop, the scan loop and the record controller) and exposes
//! the six user controls. Front-ends call the controls and watch the
//! [`Readouts`]; errors never abort the app, they land in the error
//! readout.

pub mod frame_processor;
pub mod handlers;
pub mod readout;
pub mod state;

pub use readout::Readout;
pub use state::{AppServices, ControlState, Readouts};

use crate::app::frame_processor::{Navigator, QrDecoder, ScanLoop, Scanner};
use crate::backends::camera::{CaptureSession, DeviceList, MediaPlatform, list_video_inputs};
use crate::config::Config;
use crate::pipelines::annotation::{AnnotationLoop, NullEstimator, OverlayRenderer, PoseEstimator};
use crate::pipelines::artifact::CaptureArtifact;
use crate::pipelines::video::RecordController;
use std::sync::Arc;
use tracing::{info, warn};

pub struct CameraApp {
    config: Config,
    platform: Arc<dyn MediaPlatform>,
    devices: DeviceList,
    session: CaptureSession,
    renderer: OverlayRenderer,
    /// Parked here while no annotation loop is running
    estimator: Option<Box<dyn PoseEstimator>>,
    annotation: Option<AnnotationLoop>,
    decoder: Arc<dyn QrDecoder>,
    navigator: Arc<dyn Navigator>,
    scan: Option<ScanLoop>,
    navigated: Option<String>,
    recorder: RecordController,
    readouts: Readouts,
    last_photo: Option<CaptureArtifact>,
    last_video: Option<CaptureArtifact>,
}

impl CameraApp {
    pub fn new(config: Config, services: AppServices) -> Self {
        let session = CaptureSession::new(Arc::clone(&services.platform));
        let readouts = Readouts::default();
        let renderer = OverlayRenderer::new(
            Arc::clone(session.overlay()),
            readouts.detected.clone(),
            config.marker_style(),
        );
        let recorder = RecordController::new(services.recorder, config.record_fps)
            .on_recording_finalized(|artifact| {
                info!(size = artifact.len(), created_at = %artifact.created_at, "Video ready");
            });

        Self {
            config,
            platform: services.platform,
            devices: DeviceList::default(),
            session,
            renderer,
            estimator: Some(services.estimator),
            annotation: None,
            decoder: services.decoder,
            navigator: services.navigator,
            scan: None,
            navigated: None,
            recorder,
            readouts,
            last_photo: None,
            last_video: None,
        }
    }

    /// Enumerate cameras, open the default one and start both loops
    ///
    /// The loops start even when the camera fails to open; the error is
    /// returned and also shown in the error readout.
    pub async fn start(&mut self) -> crate::errors::AppResult<()> {
        self.devices = DeviceList::new(list_video_inputs(self.platform.as_ref()));
        if let Some(id) = self.config.last_camera_id.clone()
            && self.devices.select(&id)
        {
            info!(device = %id, "Restoring last camera");
        }
        info!(
            count = self.devices.len(),
            backend = %self.platform.backend_type(),
            "Cameras enumerated"
        );

        let device = self.devices.current().map(|device| device.id.clone());
        let opened = self.open_camera(device.as_deref());

        self.restart_annotation().await;
        self.restart_scan().await;
        opened
    }

    /// Stop every loop and release the camera
    ///
    /// A recording in progress is finalized and returned.
    pub async fn shutdown(&mut self) -> Option<CaptureArtifact> {
        if let Some(scan) = self.scan.take()
            && let Some(url) = scan.stop().await
        {
            self.navigated = Some(url);
        }
        self.halt_annotation().await;

        let video = match self.recorder.stop().await {
            Ok(video) => video,
            Err(e) => {
                warn!(error = %e, "Recording lost during shutdown");
                None
            }
        };
        if let Some(video) = &video {
            self.last_video = Some(video.clone());
        }

        self.session.close();
        info!("Camera app shut down");
        video
    }

    /// Stop annotating and park the estimator for the next start
    async fn halt_annotation(&mut self) {
        if let Some(annotation) = self.annotation.take() {
            self.estimator = annotation.stop().await;
        }
    }

    async fn restart_annotation(&mut self) {
        let renderer = self.renderer.clone();
        let next = match self.annotation.take() {
            Some(running) => running.restart(self.session.video(), renderer).await,
            None => {
                let estimator = self
                    .estimator
                    .take()
                    .unwrap_or_else(|| Box::new(NullEstimator));
                AnnotationLoop::start(self.session.video(), renderer, estimator)
            }
        };
        self.annotation = Some(next);
    }

    async fn restart_scan(&mut self) {
        if let Some(previous) = self.scan.take()
            && let Some(url) = previous.stop().await
        {
            self.navigated = Some(url);
        }

        let scanner = Scanner::new(
            self.session.video().clone(),
            Arc::clone(self.session.scan_buffer()),
            Arc::clone(&self.decoder),
            Arc::clone(&self.navigator),
            self.readouts.qr.clone(),
        )
        .with_navigation(self.config.navigate_on_url);
        self.scan = Some(ScanLoop::start(scanner, self.config.scan_interval()));
    }

    /// URL the scan loop navigated to, once it has
    ///
    /// Navigation replaces the page, so front-ends end the session when
    /// this returns `Some`.
    pub async fn poll_navigation(&mut self) -> Option<String> {
        if self.navigated.is_none()
            && self.scan.as_ref().is_some_and(ScanLoop::is_finished)
            && let Some(scan) = self.scan.take()
        {
            self.navigated = scan.stop().await;
        }
        self.navigated.clone()
    }

    pub fn controls(&self) -> ControlState {
        let track = self.session.controls();
        ControlState {
            switch_enabled: self.devices.can_switch(),
            flash_enabled: track.flash_enabled,
            zoom_enabled: track.zoom_enabled,
            torch_on: self.session.torch_on(),
            zoom_level: self.session.zoom_level(),
            recording: self.recorder.is_recording(),
        }
    }

    pub fn readouts(&self) -> &Readouts {
        &self.readouts
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn recorder(&self) -> &RecordController {
        &self.recorder
    }

    pub fn last_photo(&self) -> Option<&CaptureArtifact> {
        self.last_photo.as_ref()
    }

    pub fn last_video(&self) -> Option<&CaptureArtifact> {
        self.last_video.as_ref()
    }

    /// Whether the annotation loop is alive
    pub fn is_annotating(&self) -> bool {
        self.annotation.as_ref().is_some_and(AnnotationLoop::is_running)
    }

    /// Whether the scan loop is alive
    pub fn is_scanning(&self) -> bool {
        self.scan.as_ref().is_some_and(|scan| !scan.is_finished())
    }

    /// Show an error in the error readout
    fn report(&self, err: &impl std::fmt::Display) {
        warn!(error = %err, "Control failed");
        self.readouts.error.set(err.to_string());
    }
}
