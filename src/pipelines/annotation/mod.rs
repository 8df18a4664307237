// SPDX-License-Identifier: GPL-3.0-only

//! Eye landmark annotation
//!
//! The annotation loop is pumped by the video element: every new frame
//! triggers one estimation, and the result redraws the overlay. Frames
//! that arrive while an estimation is running are coalesced into the next
//! cycle, so at most one estimation is ever in flight.

pub mod estimator;
pub mod landmarks;
pub mod overlay;

pub use estimator::{NullEstimator, PoseEstimator, PoseOptions, ProcessEstimator};
pub use landmarks::{Keypoint, Landmark, LandmarkResult};
pub use overlay::{MarkerStyle, OverlayRenderer};

use crate::backends::camera::VideoElement;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a running annotation task
pub struct AnnotationLoop {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Option<Box<dyn PoseEstimator>>>,
}

impl AnnotationLoop {
    /// Start annotating frames published to `video`
    pub fn start(
        video: &VideoElement,
        renderer: OverlayRenderer,
        estimator: Box<dyn PoseEstimator>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let frames = video.subscribe();
        let task = tokio::spawn(run(frames, stop_rx, renderer, estimator));
        info!("Annotation loop started");
        Self { stop_tx, task }
    }

    /// Halt the loop and get the estimator back
    ///
    /// Waits for an in-flight estimation to finish. Returns `None` if the
    /// estimator panicked.
    pub async fn stop(self) -> Option<Box<dyn PoseEstimator>> {
        self.stop_tx.send_replace(true);
        match self.task.await {
            Ok(estimator) => {
                info!("Annotation loop stopped");
                estimator
            }
            Err(e) => {
                warn!(error = %e, "Annotation task failed");
                None
            }
        }
    }

    /// Halt this loop and start a fresh one with the same estimator
    pub async fn restart(self, video: &VideoElement, renderer: OverlayRenderer) -> Self {
        let estimator = self
            .stop()
            .await
            .unwrap_or_else(|| Box::new(NullEstimator));
        Self::start(video, renderer, estimator)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

async fn run(
    mut frames: crate::backends::camera::video::FrameReceiver,
    mut stop_rx: watch::Receiver<bool>,
    renderer: OverlayRenderer,
    mut estimator: Box<dyn PoseEstimator>,
) -> Option<Box<dyn PoseEstimator>> {
    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            changed = frames.changed() => {
                if changed.is_err() {
                    debug!("Video element dropped, ending annotation");
                    break;
                }
            }
        }

        let Some(frame) = frames.borrow_and_update().clone() else {
            continue;
        };
        if frame.is_empty() {
            continue;
        }

        let cycle = tokio::task::spawn_blocking(move || {
            let result = estimator.estimate(&frame);
            (estimator, result)
        })
        .await;

        let result = match cycle {
            Ok((returned, result)) => {
                estimator = returned;
                result
            }
            Err(e) => {
                warn!(error = %e, "Pose estimator panicked, annotation disabled");
                return None;
            }
        };

        if *stop_rx.borrow() {
            debug!("Discarding estimate from halted annotation loop");
            break;
        }

        match result {
            Ok(landmarks) => {
                renderer.on_landmarks(&landmarks);
            }
            Err(e) => debug!(error = %e, "Annotation cycle skipped"),
        }
    }
    Some(estimator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::readout::Readout;
    use crate::backends::camera::types::CameraFrame;
    use crate::errors::SessionError;
    use crate::media::canvas;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Scripted {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl PoseEstimator for Scripted {
        fn estimate(&mut self, _frame: &CameraFrame) -> Result<LandmarkResult, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SessionError::DecodeMiss);
            }
            Ok(LandmarkResult::with_keypoints(&[(
                Keypoint::RightEye,
                Landmark {
                    x: 0.5,
                    y: 0.5,
                    visibility: 0.99,
                },
            )]))
        }
    }

    fn frame() -> CameraFrame {
        CameraFrame::from_rgba(4, 4, vec![0; 64])
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_new_frame_triggers_render() {
        let video = VideoElement::new();
        let readout = Readout::new("");
        let renderer = OverlayRenderer::new(
            canvas::shared(4, 4),
            readout.clone(),
            MarkerStyle::default(),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let estimator = Box::new(Scripted {
            calls: Arc::clone(&calls),
            fail: false,
        });

        let annotation = AnnotationLoop::start(&video, renderer, estimator);
        video.attach().publish(frame());

        wait_for(|| readout.get() == "Right Eye").await;
        assert!(annotation.stop().await.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_leave_readout_untouched() {
        let video = VideoElement::new();
        let readout = Readout::new("previous");
        let renderer = OverlayRenderer::new(
            canvas::shared(4, 4),
            readout.clone(),
            MarkerStyle::default(),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let estimator = Box::new(Scripted {
            calls: Arc::clone(&calls),
            fail: true,
        });

        let annotation = AnnotationLoop::start(&video, renderer, estimator);
        let sink = video.attach();
        sink.publish(frame());
        wait_for(|| calls.load(Ordering::SeqCst) >= 1).await;
        sink.publish(frame());
        wait_for(|| calls.load(Ordering::SeqCst) >= 2).await;

        assert!(annotation.is_running());
        assert_eq!(readout.get(), "previous");
        annotation.stop().await;
    }

    #[tokio::test]
    async fn test_restart_replaces_instance() {
        let video = VideoElement::new();
        let readout = Readout::new("");
        let renderer = OverlayRenderer::new(
            canvas::shared(4, 4),
            readout.clone(),
            MarkerStyle::default(),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let estimator = Box::new(Scripted {
            calls: Arc::clone(&calls),
            fail: false,
        });

        let first = AnnotationLoop::start(&video, renderer.clone(), estimator);
        let second = first.restart(&video, renderer).await;
        assert!(second.is_running());

        video.attach().publish(frame());
        wait_for(|| calls.load(Ordering::SeqCst) == 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Only the restarted instance consumed the frame
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        second.stop().await;
    }

    #[tokio::test]
    async fn test_estimate_finishing_after_stop_is_discarded() {
        struct Slow(Arc<AtomicUsize>);
        impl PoseEstimator for Slow {
            fn estimate(&mut self, _: &CameraFrame) -> Result<LandmarkResult, SessionError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(150));
                Ok(LandmarkResult::with_keypoints(&[(
                    Keypoint::LeftEye,
                    Landmark {
                        x: 0.5,
                        y: 0.5,
                        visibility: 0.9,
                    },
                )]))
            }
        }

        let video = VideoElement::new();
        let readout = Readout::new("None");
        let overlay = canvas::shared(4, 4);
        let renderer = OverlayRenderer::new(
            Arc::clone(&overlay),
            readout.clone(),
            MarkerStyle::default(),
        );
        let calls = Arc::new(AtomicUsize::new(0));

        let estimator = Box::new(Slow(Arc::clone(&calls)));
        let annotation = AnnotationLoop::start(&video, renderer, estimator);
        video.attach().publish(frame());
        wait_for(|| calls.load(Ordering::SeqCst) == 1).await;

        // Stop lands while the estimate is still running
        assert!(annotation.stop().await.is_some());
        assert_eq!(readout.get(), "None");
        assert!(canvas::read(&overlay).pixels().chunks_exact(4).all(|p| p[3] == 0));
    }
}
