// SPDX-License-Identifier: GPL-3.0-only

//! Pose estimator collaborators
//!
//! Estimation itself happens outside this crate. [`ProcessEstimator`] talks
//! to a helper program over a line-oriented protocol:
//!
//! ```text
//! → {"type":"options","model_complexity":1,"min_detection_confidence":0.6,...}\n
//! → {"type":"frame","width":W,"height":H}\n   followed by W*H*4 RGBA bytes
//! ← {"landmarks":[{"x":..,"y":..,"visibility":..}, ...]}\n   or {"landmarks":null}
//! ```

use super::landmarks::{Landmark, LandmarkResult};
use crate::backends::camera::types::CameraFrame;
use crate::constants::pose;
use crate::errors::SessionError;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

/// Estimator tuning passed through to the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseOptions {
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for PoseOptions {
    fn default() -> Self {
        Self {
            model_complexity: pose::MODEL_COMPLEXITY,
            min_detection_confidence: pose::MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: pose::MIN_TRACKING_CONFIDENCE,
        }
    }
}

/// Produces landmarks for a frame
///
/// Calls block; the annotation loop runs them off the async runtime.
pub trait PoseEstimator: Send {
    /// Landmarks for this frame; an empty result means no pose was found
    ///
    /// `Err(SessionError::DecodeMiss)` marks a failed cycle.
    fn estimate(&mut self, frame: &CameraFrame) -> Result<LandmarkResult, SessionError>;
}

/// Estimator that never finds a pose
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEstimator;

impl PoseEstimator for NullEstimator {
    fn estimate(&mut self, _frame: &CameraFrame) -> Result<LandmarkResult, SessionError> {
        Ok(LandmarkResult::default())
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Request {
    Options(PoseOptions),
    Frame { width: u32, height: u32 },
}

#[derive(Deserialize)]
struct Response {
    landmarks: Option<Vec<Landmark>>,
    #[serde(default)]
    error: Option<String>,
}

struct Helper {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Helper {
    fn send(&mut self, request: &Request, payload: &[u8]) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        self.stdin.write_all(&line)?;
        self.stdin.write_all(payload)?;
        self.stdin.flush()
    }

    fn receive(&mut self) -> std::io::Result<Response> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "helper closed its output",
            ));
        }
        serde_json::from_str(&line).map_err(std::io::Error::other)
    }
}

impl Drop for Helper {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Estimator backed by an external helper process
///
/// The helper is started lazily and restarted on the next frame if it dies.
pub struct ProcessEstimator {
    command: Vec<String>,
    options: PoseOptions,
    helper: Option<Helper>,
}

impl ProcessEstimator {
    /// `command` is the program followed by its arguments
    pub fn new(command: Vec<String>, options: PoseOptions) -> Self {
        Self {
            command,
            options,
            helper: None,
        }
    }

    fn spawn(&self) -> std::io::Result<Helper> {
        let (program, args) = self.command.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty helper command")
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(std::io::Error::other("helper pipes unavailable"));
        };

        let mut helper = Helper {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };
        helper.send(&Request::Options(self.options), &[])?;
        info!(program = %program, "Started pose helper");
        Ok(helper)
    }

    fn exchange(&mut self, frame: &CameraFrame) -> std::io::Result<Response> {
        let image = frame
            .to_rgba_image()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "empty frame"))?;

        if self.helper.is_none() {
            self.helper = Some(self.spawn_checked()?);
        }
        let Some(helper) = self.helper.as_mut() else {
            return Err(std::io::Error::other("pose helper not running"));
        };
        helper.send(
            &Request::Frame {
                width: image.width(),
                height: image.height(),
            },
            image.as_raw(),
        )?;
        helper.receive()
    }

    fn spawn_checked(&self) -> std::io::Result<Helper> {
        self.spawn().inspect_err(|e| warn!(error = %e, "Failed to start pose helper"))
    }
}

impl PoseEstimator for ProcessEstimator {
    fn estimate(&mut self, frame: &CameraFrame) -> Result<LandmarkResult, SessionError> {
        match self.exchange(frame) {
            Ok(Response {
                error: Some(message),
                ..
            }) => {
                debug!(error = %message, "Pose helper reported an error");
                Err(SessionError::DecodeMiss)
            }
            Ok(response) => Ok(LandmarkResult::new(response.landmarks.unwrap_or_default())),
            Err(e) => {
                warn!(error = %e, "Pose helper exchange failed, restarting on next frame");
                self.helper = None;
                Err(SessionError::DecodeMiss)
            }
        }
    }
}
