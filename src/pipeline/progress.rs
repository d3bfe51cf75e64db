//! Progress tracking for pipeline runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A progress update event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// The run has started.
    Started {
        total_steps: usize,
    },
    /// A step has started processing.
    StepStarted {
        index: usize,
        operation: String,
    },
    /// A step has completed processing.
    StepCompleted {
        index: usize,
        operation: String,
        duration_ms: u64,
    },
    /// A step failed; the run stops here.
    Failed {
        index: usize,
        operation: String,
        message: String,
    },
    /// The run has completed successfully.
    Completed {
        total_duration_ms: u64,
        steps: usize,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Tracks the steps of one run and forwards updates to a callback.
pub struct ProgressTracker {
    /// Total number of steps in the chain.
    total_steps: usize,
    /// Number of steps completed.
    completed_steps: AtomicUsize,
    /// Start time.
    start_time: Option<Instant>,
    /// Progress callback.
    callback: Option<Arc<ProgressCallback>>,
    /// Per-step durations in chain order.
    step_times: parking_lot::Mutex<Vec<Duration>>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps,
            completed_steps: AtomicUsize::new(0),
            start_time: None,
            callback: None,
            step_times: parking_lot::Mutex::new(Vec::with_capacity(total_steps)),
        }
    }

    /// Set a shared callback for progress updates.
    pub fn with_callback(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Start tracking.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.send_update(ProgressUpdate::Started {
            total_steps: self.total_steps,
        });
    }

    /// Report that a step has started.
    pub fn step_started(&self, index: usize, operation: &str) {
        self.send_update(ProgressUpdate::StepStarted {
            index,
            operation: operation.to_string(),
        });
    }

    /// Report that a step has completed.
    pub fn step_completed(&self, index: usize, operation: &str, duration: Duration) {
        self.completed_steps.fetch_add(1, Ordering::Relaxed);
        self.step_times.lock().push(duration);

        self.send_update(ProgressUpdate::StepCompleted {
            index,
            operation: operation.to_string(),
            duration_ms: duration.as_millis() as u64,
        });
    }

    /// Report a failed step.
    pub fn step_failed(&self, index: usize, operation: &str, message: String) {
        self.send_update(ProgressUpdate::Failed {
            index,
            operation: operation.to_string(),
            message,
        });
    }

    /// Complete tracking.
    pub fn complete(&self) {
        self.send_update(ProgressUpdate::Completed {
            total_duration_ms: self.elapsed().as_millis() as u64,
            steps: self.completed_steps(),
        });
    }

    /// Number of steps completed so far.
    pub fn completed_steps(&self) -> usize {
        self.completed_steps.load(Ordering::Relaxed)
    }

    /// Time since [`start`](Self::start).
    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Get current progress percentage.
    pub fn progress_percent(&self) -> f32 {
        if self.total_steps == 0 {
            return 100.0;
        }
        (self.completed_steps() as f32 / self.total_steps as f32) * 100.0
    }

    /// Durations of the completed steps.
    pub fn step_durations(&self) -> Vec<Duration> {
        self.step_times.lock().clone()
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_calculation() {
        let tracker = ProgressTracker::new(4);
        assert_eq!(tracker.progress_percent(), 0.0);

        tracker.step_completed(0, "flip", Duration::from_millis(3));
        tracker.step_completed(1, "flop", Duration::from_millis(5));
        assert_eq!(tracker.progress_percent(), 50.0);
        assert_eq!(
            tracker.step_durations(),
            vec![Duration::from_millis(3), Duration::from_millis(5)]
        );
        assert_eq!(ProgressTracker::default().progress_percent(), 100.0);
    }

    #[test]
    fn test_callback_receives_updates_in_order() {
        let updates = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = updates.clone();
        let callback: ProgressCallback = Box::new(move |u| sink.lock().push(u));

        let mut tracker = ProgressTracker::new(1).with_callback(Arc::new(callback));
        tracker.start();
        tracker.step_started(0, "blur");
        tracker.step_completed(0, "blur", Duration::from_millis(7));
        tracker.complete();

        let updates = updates.lock();
        assert_eq!(updates.len(), 4);
        assert_eq!(updates[0], ProgressUpdate::Started { total_steps: 1 });
        assert_eq!(
            updates[2],
            ProgressUpdate::StepCompleted {
                index: 0,
                operation: "blur".to_string(),
                duration_ms: 7
            }
        );
        assert!(matches!(updates[3], ProgressUpdate::Completed { steps: 1, .. }));
    }
}
