// SPDX-License-Identifier: MPL-2.0

//! Recording the composited feed
//!
//! While recording, a compositing task redraws video + overlay onto a
//! canvas at overlay resolution on a fixed frame clock and hands every
//! composite to a [`MediaRecorder`]. Encoded chunks are collected until
//! stop, then assembled into a single `video.webm` artifact.

use crate::backends::camera::VideoElement;
use crate::errors::RecordingError;
use crate::media::canvas::{self, Canvas, SharedCanvas};
use crate::pipelines::artifact::CaptureArtifact;
use crate::pipelines::photo::composite_into;
use image::RgbaImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Encoder for a stream of composites
pub trait MediaRecorder: Send {
    /// Encode one frame; returns any chunks the encoder produced
    fn write_frame(
        &mut self,
        frame: &RgbaImage,
        timestamp: Duration,
    ) -> Result<Vec<Vec<u8>>, RecordingError>;

    /// Flush the encoder; returns the remaining chunks
    fn finish(&mut self) -> Result<Vec<Vec<u8>>, RecordingError>;
}

/// Builds a recorder for the composite geometry
pub trait RecorderFactory: Send + Sync {
    fn create(
        &self,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn MediaRecorder>, RecordingError>;
}

/// Factory used when no encoder is compiled in
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRecorderFactory;

impl RecorderFactory for UnavailableRecorderFactory {
    fn create(&self, _: u32, _: u32, _: u32) -> Result<Box<dyn MediaRecorder>, RecordingError> {
        Err(RecordingError::EncoderNotAvailable(
            "built without the gstreamer feature".to_string(),
        ))
    }
}

/// Accumulates encoder output until the recording stops
#[derive(Debug, Default)]
pub struct ChunkCollector {
    chunks: Vec<Vec<u8>>,
}

impl ChunkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty chunks carry nothing and are dropped
    pub fn on_chunk(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.chunks.push(chunk);
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Concatenate every chunk into one video artifact
    pub fn finalize(self) -> CaptureArtifact {
        CaptureArtifact::video(self.chunks.concat())
    }
}

/// Whether a recording is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

/// What a toggle did
#[derive(Debug)]
pub enum RecordToggle {
    Started,
    Stopped(CaptureArtifact),
}

type FinalizedCallback = Box<dyn Fn(&CaptureArtifact) + Send + Sync>;
type RecordTask = JoinHandle<Result<(Box<dyn MediaRecorder>, ChunkCollector), RecordingError>>;

struct ActiveRecording {
    stop_tx: watch::Sender<bool>,
    task: RecordTask,
    started_at: Instant,
}

/// Start/stop recording state machine
pub struct RecordController {
    factory: Arc<dyn RecorderFactory>,
    fps: u32,
    active: Option<ActiveRecording>,
    on_finalized: Option<FinalizedCallback>,
}

impl RecordController {
    pub fn new(factory: Arc<dyn RecorderFactory>, fps: u32) -> Self {
        Self {
            factory,
            fps: fps.max(1),
            active: None,
            on_finalized: None,
        }
    }

    /// Called with every finished recording
    pub fn on_recording_finalized(
        mut self,
        callback: impl Fn(&CaptureArtifact) + Send + Sync + 'static,
    ) -> Self {
        self.on_finalized = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> RecordingState {
        if self.active.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    /// Time since the current recording started
    pub fn elapsed(&self) -> Option<Duration> {
        self.active.as_ref().map(|a| a.started_at.elapsed())
    }

    /// Begin recording at overlay resolution
    ///
    /// Returns `Ok(false)` without side effects when already recording.
    pub fn start(
        &mut self,
        video: &VideoElement,
        overlay: &SharedCanvas,
    ) -> Result<bool, RecordingError> {
        if self.active.is_some() {
            debug!("Start requested while recording; ignoring");
            return Ok(false);
        }

        let (width, height) = canvas::read(overlay).dimensions();
        if width == 0 || height == 0 {
            return Err(RecordingError::StartFailed("no video to record".to_string()));
        }

        let recorder = self.factory.create(width, height, self.fps)?;
        let compositor = Compositor {
            canvas: Canvas::new(width, height),
            recorder,
            video: video.clone(),
            overlay: Arc::clone(overlay),
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(record_loop(compositor, self.fps, stop_rx));
        info!(width, height, fps = self.fps, "Recording started");

        self.active = Some(ActiveRecording {
            stop_tx,
            task,
            started_at: Instant::now(),
        });
        Ok(true)
    }

    /// Stop, flush and assemble the recording
    ///
    /// Returns `Ok(None)` when idle.
    pub async fn stop(&mut self) -> Result<Option<CaptureArtifact>, RecordingError> {
        let Some(active) = self.active.take() else {
            debug!("Stop requested while idle; ignoring");
            return Ok(None);
        };
        self.finish(active).await.map(Some)
    }

    /// Start when idle, stop when recording
    pub async fn toggle(
        &mut self,
        video: &VideoElement,
        overlay: &SharedCanvas,
    ) -> Result<RecordToggle, RecordingError> {
        match self.active.take() {
            Some(active) => self.finish(active).await.map(RecordToggle::Stopped),
            None => self.start(video, overlay).map(|_| RecordToggle::Started),
        }
    }

    async fn finish(&self, active: ActiveRecording) -> Result<CaptureArtifact, RecordingError> {
        active.stop_tx.send_replace(true);
        let (mut recorder, mut collector) = active
            .task
            .await
            .map_err(|e| RecordingError::StopFailed(e.to_string()))??;

        let tail = tokio::task::spawn_blocking(move || recorder.finish())
            .await
            .map_err(|e| RecordingError::StopFailed(e.to_string()))??;
        for chunk in tail {
            collector.on_chunk(chunk);
        }

        let chunks = collector.chunk_count();
        let artifact = collector.finalize();
        info!(
            chunks,
            size = artifact.len(),
            duration_ms = active.started_at.elapsed().as_millis() as u64,
            "Recording finalized"
        );

        if let Some(callback) = &self.on_finalized {
            callback(&artifact);
        }
        Ok(artifact)
    }
}

impl Drop for RecordController {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            warn!("Recording discarded without stop");
            active.stop_tx.send_replace(true);
        }
    }
}

struct Compositor {
    canvas: Canvas,
    recorder: Box<dyn MediaRecorder>,
    video: VideoElement,
    overlay: SharedCanvas,
}

impl Compositor {
    fn frame(&mut self, timestamp: Duration) -> Result<Vec<Vec<u8>>, RecordingError> {
        if !composite_into(&mut self.canvas, &self.video, &self.overlay) {
            return Ok(Vec::new());
        }
        self.recorder.write_frame(self.canvas.image(), timestamp)
    }
}

async fn record_loop(
    mut compositor: Compositor,
    fps: u32,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<(Box<dyn MediaRecorder>, ChunkCollector), RecordingError> {
    let mut ticker = tokio::time::interval(Duration::from_secs(1) / fps);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let started = Instant::now();
    let mut collector = ChunkCollector::new();
    let mut frames = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        let timestamp = started.elapsed();
        let (back, result) = tokio::task::spawn_blocking(move || {
            let result = compositor.frame(timestamp);
            (compositor, result)
        })
        .await
        .map_err(|e| RecordingError::PipelineError(e.to_string()))?;
        compositor = back;

        for chunk in result? {
            collector.on_chunk(chunk);
        }
        frames += 1;
    }

    debug!(frames, chunks = collector.chunk_count(), "Compositing loop stopped");
    Ok((compositor.recorder, collector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::CameraFrame;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        created: AtomicUsize,
        frames: AtomicUsize,
        finished: AtomicUsize,
    }

    struct FakeRecorder(Arc<Counters>);

    impl MediaRecorder for FakeRecorder {
        fn write_frame(
            &mut self,
            frame: &RgbaImage,
            _timestamp: Duration,
        ) -> Result<Vec<Vec<u8>>, RecordingError> {
            assert_eq!(frame.dimensions(), (4, 4));
            self.0.frames.fetch_add(1, Ordering::SeqCst);
            Ok(vec![vec![1], Vec::new()])
        }

        fn finish(&mut self) -> Result<Vec<Vec<u8>>, RecordingError> {
            self.0.finished.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Vec::new(), vec![0xFF, 0xFE]])
        }
    }

    struct FakeFactory(Arc<Counters>);

    impl RecorderFactory for FakeFactory {
        fn create(
            &self,
            _width: u32,
            _height: u32,
            fps: u32,
        ) -> Result<Box<dyn MediaRecorder>, RecordingError> {
            assert!(fps > 0);
            self.0.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeRecorder(Arc::clone(&self.0))))
        }
    }

    fn setup() -> (RecordController, Arc<Counters>, VideoElement, SharedCanvas) {
        let counters = Arc::new(Counters::default());
        let controller = RecordController::new(Arc::new(FakeFactory(Arc::clone(&counters))), 100);
        let video = VideoElement::new();
        video
            .attach()
            .publish(CameraFrame::from_rgba(4, 4, vec![50; 64]));
        (controller, counters, video, canvas::shared(4, 4))
    }

    #[test]
    fn test_collector_ignores_empty_chunks() {
        let mut collector = ChunkCollector::new();
        collector.on_chunk(vec![1, 2]);
        collector.on_chunk(Vec::new());
        collector.on_chunk(vec![3]);
        assert_eq!(collector.chunk_count(), 2);
        assert_eq!(collector.byte_len(), 3);

        let artifact = collector.finalize();
        assert_eq!(artifact.file_name(), "video.webm");
        assert_eq!(artifact.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_toggle_twice_starts_then_stops() {
        let (mut controller, counters, video, overlay) = setup();

        let first = controller.toggle(&video, &overlay).await.unwrap();
        assert!(matches!(first, RecordToggle::Started));
        assert_eq!(controller.state(), RecordingState::Recording);

        tokio::time::sleep(Duration::from_millis(60)).await;

        let second = controller.toggle(&video, &overlay).await.unwrap();
        let RecordToggle::Stopped(artifact) = second else {
            panic!("expected stop");
        };
        assert_eq!(controller.state(), RecordingState::Idle);
        assert_eq!(counters.finished.load(Ordering::SeqCst), 1);

        let frames = counters.frames.load(Ordering::SeqCst);
        assert!(frames >= 1);
        // One byte per frame plus the flushed tail
        assert_eq!(artifact.len(), frames + 2);
        assert_eq!(&artifact.bytes[artifact.len() - 2..], &[0xFF, 0xFE]);
    }

    #[tokio::test]
    async fn test_double_start_records_once() {
        let (mut controller, counters, video, overlay) = setup();
        assert!(controller.start(&video, &overlay).unwrap());
        assert!(!controller.start(&video, &overlay).unwrap());
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);

        assert!(controller.stop().await.unwrap().is_some());
        assert_eq!(counters.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let (mut controller, counters, _, _) = setup();
        assert!(controller.stop().await.unwrap().is_none());
        assert_eq!(counters.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_without_video_geometry_fails() {
        let (mut controller, counters, video, _) = setup();
        let result = controller.start(&video, &canvas::shared(0, 0));
        assert!(matches!(result, Err(RecordingError::StartFailed(_))));
        assert_eq!(controller.state(), RecordingState::Idle);
        assert_eq!(counters.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_encoder_stays_idle() {
        let mut controller = RecordController::new(Arc::new(UnavailableRecorderFactory), 25);
        let video = VideoElement::new();
        let result = controller.start(&video, &canvas::shared(4, 4));
        assert!(matches!(result, Err(RecordingError::EncoderNotAvailable(_))));
        assert!(!controller.is_recording());
    }

    #[tokio::test]
    async fn test_finalized_callback_receives_artifact() {
        let (controller, _, video, overlay) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut controller = controller.on_recording_finalized(move |artifact| {
            sink.lock().unwrap().push(artifact.file_name());
        });

        controller.start(&video, &overlay).unwrap();
        let artifact = controller.stop().await.unwrap().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["video.webm"]);
        assert!(artifact.bytes.ends_with(&[0xFF, 0xFE]));
    }
}
