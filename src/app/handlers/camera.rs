// SPDX-License-Identifier: GPL-3.0-only

//! Camera handlers: switching, torch and zoom

use crate::app::CameraApp;
use crate::backends::camera::ZoomDirection;
use crate::errors::{AppResult, SessionError};
use tracing::{debug, info};

impl CameraApp {
    /// Open `device_id` (or the platform's rear camera) and remember it
    pub(crate) fn open_camera(&mut self, device_id: Option<&str>) -> AppResult<()> {
        match self.session.open(device_id) {
            Ok(()) => {
                self.readouts.error.clear();
                self.config.last_camera_id = self.session.device_id().map(str::to_string);
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e.into())
            }
        }
    }

    /// Cycle to the next camera and restart annotation on it
    ///
    /// Does nothing with fewer than two cameras. Annotation is halted before
    /// the old stream closes and restarted even when the new camera fails
    /// to open.
    pub async fn switch_camera(&mut self) -> AppResult<()> {
        if !self.devices.can_switch() {
            debug!("Switch requested with a single camera; ignoring");
            return Ok(());
        }

        let Some(next) = self.devices.advance().map(|device| device.id.clone()) else {
            return Ok(());
        };
        info!(
            new_index = self.devices.current_index(),
            device = %next,
            "Switching camera"
        );

        self.halt_annotation().await;
        let opened = self.open_camera(Some(&next));
        self.restart_annotation().await;
        opened
    }

    /// Flip the torch; returns the new state
    pub fn toggle_flash(&mut self) -> Result<bool, SessionError> {
        self.session.toggle_torch().inspect_err(|e| self.report(e))
    }

    /// One zoom step in; returns the level applied
    pub fn zoom_in(&mut self) -> Result<f64, SessionError> {
        self.zoom(ZoomDirection::In)
    }

    /// One zoom step out; returns the level applied
    pub fn zoom_out(&mut self) -> Result<f64, SessionError> {
        self.zoom(ZoomDirection::Out)
    }

    fn zoom(&mut self, direction: ZoomDirection) -> Result<f64, SessionError> {
        self.session
            .adjust_zoom(direction)
            .inspect_err(|e| self.report(e))
    }
}
