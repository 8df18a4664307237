// SPDX-License-Identifier: GPL-3.0-only

//! Capture handlers: photo, recording and saving

use crate::app::CameraApp;
use crate::errors::{AppError, AppResult, PhotoError, RecordingError};
use crate::pipelines::artifact::CaptureArtifact;
use crate::pipelines::photo;
use crate::pipelines::video::RecordToggle;
use std::path::PathBuf;
use tracing::info;

impl CameraApp {
    /// Composite the current frame and overlay into `photo.png`
    pub fn capture_photo(&mut self) -> Result<CaptureArtifact, PhotoError> {
        let artifact = photo::capture_photo(self.session.video(), self.session.overlay())
            .inspect_err(|e| self.report(e))?;
        self.last_photo = Some(artifact.clone());
        Ok(artifact)
    }

    /// Start recording when idle, stop and finalize when recording
    pub async fn toggle_record(&mut self) -> Result<RecordToggle, RecordingError> {
        let result = self
            .recorder
            .toggle(self.session.video(), self.session.overlay())
            .await;

        match &result {
            Ok(RecordToggle::Started) => info!("Recording"),
            Ok(RecordToggle::Stopped(artifact)) => self.last_video = Some(artifact.clone()),
            Err(e) => self.report(e),
        }
        result
    }

    /// Write an artifact to the configured output directory
    pub async fn save_artifact(&self, artifact: &CaptureArtifact) -> AppResult<PathBuf> {
        let dir = self.config.output_dir();
        crate::storage::save_artifact(&dir, artifact)
            .await
            .map_err(|e| {
                let err = AppError::Storage(format!("{}: {}", dir.display(), e));
                self.report(&err);
                err
            })
    }
}
