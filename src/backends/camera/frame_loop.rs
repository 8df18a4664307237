// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle for frame producers
//!
//! Platforms that produce frames on their own thread (V4L2 capture, the
//! virtual camera's live pattern) run it under a [`CaptureLoopController`]:
//! the loop body is called repeatedly until it asks to stop or the
//! controller is stopped, and stopping joins the thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Returned by a loop body to continue or end the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Run `loop_fn` back to back on a new thread
    pub fn start<F>(name: &str, loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let mut loop_fn = loop_fn;
        Self::start_with_init(name, || Ok(()), move |_: &mut ()| loop_fn())
    }

    /// Run `loop_fn` at most once per `period`
    ///
    /// The wait between iterations is sliced so a stop request is noticed
    /// promptly even with long periods.
    pub fn start_paced<F>(name: &str, period: Duration, mut loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let controller = Self::spawn(name, move |stop: Arc<AtomicBool>| {
            loop {
                let started = Instant::now();
                if loop_fn() == LoopAction::Stop {
                    return true;
                }
                while started.elapsed() < period {
                    if stop.load(Ordering::SeqCst) {
                        return false;
                    }
                    let remaining = period.saturating_sub(started.elapsed());
                    thread::sleep(remaining.min(Duration::from_millis(5)));
                }
                if stop.load(Ordering::SeqCst) {
                    return false;
                }
            }
        });
        info!(name, period_ms = period.as_millis() as u64, "Started paced loop");
        controller
    }

    /// Set up per-thread state, then run `loop_fn` against it
    ///
    /// If `init_fn` fails the thread exits without running the loop.
    pub fn start_with_init<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> Self
    where
        S: 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let thread_name = name.to_string();
        let controller = Self::spawn(name, move |stop: Arc<AtomicBool>| {
            let mut state = match init_fn() {
                Ok(state) => state,
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Loop initialization failed");
                    return true;
                }
            };
            while !stop.load(Ordering::SeqCst) {
                if loop_fn(&mut state) == LoopAction::Stop {
                    return true;
                }
            }
            false
        });
        info!(name, "Started capture loop");
        controller
    }

    /// `body` returns true when the loop ended on its own
    fn spawn<B>(name: &str, body: B) -> Self
    where
        B: FnOnce(Arc<AtomicBool>) -> bool + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        let thread_handle = thread::spawn(move || {
            let self_stopped = body(thread_stop);
            debug!(name = %thread_name, self_stopped, "Capture loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Signal the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for a loop that ends on its own
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!(name = %self.name, "Capture loop thread panicked");
            } else {
                debug!(name = %self.name, "Capture loop thread joined");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            if counter_clone.fetch_add(1, Ordering::SeqCst) >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });
        controller.join();

        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_signal_ends_paced_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller =
            CaptureLoopController::start_paced("test-paced", Duration::from_secs(60), move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            });

        thread::sleep(Duration::from_millis(30));
        let started = Instant::now();
        controller.stop();

        // One iteration ran and the long wait was cut short
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_init_failure_skips_loop() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let mut controller = CaptureLoopController::start_with_init(
            "test-fail-init",
            || Err::<(), _>("no device".to_string()),
            move |_: &mut ()| {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
        );
        controller.join();

        assert!(!ran.load(Ordering::SeqCst));
    }
}
