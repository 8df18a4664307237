// SPDX-License-Identifier: GPL-3.0-only

//! Timed QR scan loop
//!
//! Every tick samples the video element into the scan buffer and decodes
//! it. A URL payload hands off to the [`Navigator`] and ends the loop, so a
//! code held in front of the camera navigates exactly once.

use super::tasks::QrDecoder;
use super::types::{QrPayload, ScanOutcome};
use crate::app::readout::Readout;
use crate::backends::camera::VideoElement;
use crate::media::canvas::{self, SharedCanvas};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Leaves the current view for a URL
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str) -> std::io::Result<()>;
}

/// Opens URLs with the desktop's default handler
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &str) -> std::io::Result<()> {
        info!(url, "Opening URL");
        open::that(url)
    }
}

/// Everything one scan tick needs
#[derive(Clone)]
pub struct Scanner {
    video: VideoElement,
    buffer: SharedCanvas,
    decoder: Arc<dyn QrDecoder>,
    navigator: Arc<dyn Navigator>,
    readout: Readout,
    navigate_on_url: bool,
}

impl Scanner {
    pub fn new(
        video: VideoElement,
        buffer: SharedCanvas,
        decoder: Arc<dyn QrDecoder>,
        navigator: Arc<dyn Navigator>,
        readout: Readout,
    ) -> Self {
        Self {
            video,
            buffer,
            decoder,
            navigator,
            readout,
            navigate_on_url: true,
        }
    }

    /// Show URL payloads without navigating
    pub fn with_navigation(mut self, enabled: bool) -> Self {
        self.navigate_on_url = enabled;
        self
    }

    /// Sample, decode and react once
    pub async fn tick(&self) -> ScanOutcome {
        let Some(frame) = self.video.current_frame() else {
            return ScanOutcome::Skipped;
        };
        if frame.is_empty() {
            return ScanOutcome::Skipped;
        }

        let buffer = Arc::clone(&self.buffer);
        let decoder = Arc::clone(&self.decoder);
        let decoded = tokio::task::spawn_blocking(move || {
            let mut canvas = canvas::write(&buffer);
            if !canvas.draw_frame(&frame) {
                return None;
            }
            decoder.decode(canvas.pixels(), canvas.width(), canvas.height())
        })
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "QR decode task panicked");
            None
        });

        let Some(text) = decoded else {
            return ScanOutcome::Miss;
        };

        self.readout.set(text.as_str());
        match QrPayload::parse(&text) {
            QrPayload::Url(url) if self.navigate_on_url => {
                self.navigate(&url).await;
                ScanOutcome::Navigated(url)
            }
            _ => ScanOutcome::Decoded(text),
        }
    }

    /// Navigation may spawn a process, so it stays off the runtime
    async fn navigate(&self, url: &str) {
        let navigator = Arc::clone(&self.navigator);
        let target = url.to_string();
        match tokio::task::spawn_blocking(move || navigator.navigate(&target)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(url, error = %e, "Navigation failed"),
            Err(e) => warn!(url, error = %e, "Navigation task panicked"),
        }
    }
}

/// Handle to a running scan task
pub struct ScanLoop {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Option<String>>,
}

impl ScanLoop {
    /// Tick every `interval`; a slow tick delays the next one instead of bunching up
    pub fn start(scanner: Scanner, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => return None,
                    _ = ticker.tick() => {}
                }
                match scanner.tick().await {
                    ScanOutcome::Navigated(url) => {
                        info!(url = %url, "Scan loop ended by navigation");
                        return Some(url);
                    }
                    outcome => debug!(?outcome, "Scan tick"),
                }
            }
        });
        info!(interval_ms = interval.as_millis() as u64, "Scan loop started");
        Self { stop_tx, task }
    }

    /// Whether the loop ended, by navigation or otherwise
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop; returns the URL if it had already navigated
    pub async fn stop(self) -> Option<String> {
        self.stop_tx.send_replace(true);
        self.task.await.unwrap_or_else(|e| {
            warn!(error = %e, "Scan task failed");
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::tasks::RqrrDecoder;
    use crate::app::frame_processor::tasks::qr_detector::render_qr;
    use crate::backends::camera::types::CameraFrame;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedDecoder(Option<&'static str>);

    impl QrDecoder for FixedDecoder {
        fn decode(&self, rgba: &[u8], width: u32, height: u32) -> Option<String> {
            assert_eq!(rgba.len(), (width * height * 4) as usize);
            self.0.map(str::to_string)
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        urls: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, url: &str) -> std::io::Result<()> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn scanner(
        payload: Option<&'static str>,
    ) -> (Scanner, VideoElement, Readout, Arc<RecordingNavigator>) {
        let video = VideoElement::new();
        let readout = Readout::new("");
        let navigator = Arc::new(RecordingNavigator::default());
        let scanner = Scanner::new(
            video.clone(),
            canvas::shared(8, 8),
            Arc::new(FixedDecoder(payload)),
            navigator.clone(),
            readout.clone(),
        );
        (scanner, video, readout, navigator)
    }

    fn publish(video: &VideoElement) {
        video
            .attach()
            .publish(CameraFrame::from_rgba(8, 8, vec![128; 256]));
    }

    #[tokio::test]
    async fn test_no_video_skips() {
        let (scanner, _video, readout, _) = scanner(Some("hello"));
        assert_eq!(scanner.tick().await, ScanOutcome::Skipped);
        assert_eq!(readout.get(), "");
    }

    #[tokio::test]
    async fn test_miss_leaves_readout() {
        let (scanner, video, readout, _) = scanner(None);
        readout.set("earlier");
        publish(&video);
        assert_eq!(scanner.tick().await, ScanOutcome::Miss);
        assert_eq!(readout.get(), "earlier");
    }

    #[tokio::test]
    async fn test_text_payload_does_not_navigate() {
        let (scanner, video, readout, navigator) = scanner(Some("hello"));
        publish(&video);
        assert_eq!(scanner.tick().await, ScanOutcome::Decoded("hello".into()));
        assert_eq!(readout.get(), "hello");
        assert!(navigator.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_url_navigates_when_enabled() {
        let (scanner, video, _, navigator) = scanner(Some("HTTPS://example.com"));
        publish(&video);
        assert_eq!(
            scanner.tick().await,
            ScanOutcome::Navigated("HTTPS://example.com".into())
        );
        assert_eq!(*navigator.urls.lock().unwrap(), vec!["HTTPS://example.com"]);

        let quiet = scanner.with_navigation(false);
        assert_eq!(
            quiet.tick().await,
            ScanOutcome::Decoded("HTTPS://example.com".into())
        );
        assert_eq!(navigator.urls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rendered_code_navigates() {
        let code = render_qr("https://example.com/x", 6);
        let (width, height) = code.dimensions();
        let video = VideoElement::new();
        video
            .attach()
            .publish(CameraFrame::from_rgba(width, height, code.into_raw()));
        let readout = Readout::new("");
        let navigator = Arc::new(RecordingNavigator::default());
        let scanner = Scanner::new(
            video.clone(),
            canvas::shared(width, height),
            Arc::new(RqrrDecoder::new()),
            navigator.clone(),
            readout.clone(),
        );

        assert_eq!(
            scanner.tick().await,
            ScanOutcome::Navigated("https://example.com/x".into())
        );
        assert_eq!(readout.get(), "https://example.com/x");
        assert_eq!(*navigator.urls.lock().unwrap(), vec!["https://example.com/x"]);
    }

    #[tokio::test]
    async fn test_slow_navigation_keeps_runtime_responsive() {
        struct SlowNavigator;
        impl Navigator for SlowNavigator {
            fn navigate(&self, _: &str) -> std::io::Result<()> {
                std::thread::sleep(Duration::from_millis(150));
                Ok(())
            }
        }

        let video = VideoElement::new();
        publish(&video);
        let scanner = Scanner::new(
            video.clone(),
            canvas::shared(8, 8),
            Arc::new(FixedDecoder(Some("https://example.com"))),
            Arc::new(SlowNavigator),
            Readout::new(""),
        );

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let ticker = tokio::spawn(async move {
            loop {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        assert!(matches!(scanner.tick().await, ScanOutcome::Navigated(_)));
        ticker.abort();
        assert!(ticks.load(Ordering::SeqCst) >= 5);
    }

    #[tokio::test]
    async fn test_loop_navigates_exactly_once() {
        let (scanner, video, readout, navigator) = scanner(Some("http://example.com"));
        publish(&video);

        let scan = ScanLoop::start(scanner, Duration::from_millis(5));
        for _ in 0..200 {
            if scan.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(scan.stop().await, Some("http://example.com".to_string()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(navigator.urls.lock().unwrap().len(), 1);
        assert_eq!(readout.get(), "http://example.com");
    }

    #[tokio::test]
    async fn test_stop_without_navigation() {
        let calls = Arc::new(AtomicUsize::new(0));
        struct Counting(Arc<AtomicUsize>);
        impl QrDecoder for Counting {
            fn decode(&self, _: &[u8], _: u32, _: u32) -> Option<String> {
                self.0.fetch_add(1, Ordering::SeqCst);
                None
            }
        }

        let video = VideoElement::new();
        publish(&video);
        let scanner = Scanner::new(
            video.clone(),
            canvas::shared(8, 8),
            Arc::new(Counting(Arc::clone(&calls))),
            Arc::new(RecordingNavigator::default()),
            Readout::new(""),
        );

        let scan = ScanLoop::start(scanner, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(scan.stop().await, None);
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
