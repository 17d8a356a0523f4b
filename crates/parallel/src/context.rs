//! Cancellation and progress capabilities passed into operators
//!
//! Numeric code only polls [`CancelToken::is_cancelled`] and posts
//! percentages to a [`ProgressSink`]; it never knows who is listening.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::strategy::ProcessingMode;

/// Shared cooperative cancellation flag.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every operation holding this token
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag so the token can be reused for the next operation
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Receiver of progress percentages in `0..=100`.
///
/// Called from worker threads, so implementations must be thread safe.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, percent: u32);

    /// Optional description of the running operation
    fn message(&self, _message: &str) {}
}

/// Capability object handed to every cancellable operator.
#[derive(Clone, Default)]
pub struct TaskContext {
    mode: ProcessingMode,
    cancel: CancelToken,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Same mode and cancellation flag, no progress sink.
    ///
    /// For intermediate passes whose percentages would restart the
    /// caller's progress display.
    pub fn without_progress(&self) -> Self {
        Self {
            mode: self.mode,
            cancel: self.cancel.clone(),
            progress: None,
        }
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn report(&self, percent: u32) {
        if let Some(sink) = &self.progress {
            sink.progress(percent.min(100));
        }
    }

    pub fn message(&self, message: &str) {
        if let Some(sink) = &self.progress {
            sink.message(message);
        }
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("mode", &self.mode)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<u32>>);

    impl ProgressSink for Recorder {
        fn progress(&self, percent: u32) {
            self.0.lock().unwrap().push(percent);
        }
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        other.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_report_clamps_percent() {
        let sink = Arc::new(Recorder(Mutex::new(Vec::new())));
        let ctx = TaskContext::new().with_progress(sink.clone());
        ctx.report(40);
        ctx.report(250);
        assert_eq!(*sink.0.lock().unwrap(), vec![40, 100]);
    }

    #[test]
    fn test_without_progress_keeps_mode_and_cancel() {
        let sink = Arc::new(Recorder(Mutex::new(Vec::new())));
        let token = CancelToken::new();
        let ctx = TaskContext::new()
            .with_mode(ProcessingMode::Sequential)
            .with_cancel(token.clone())
            .with_progress(sink.clone());
        let quiet = ctx.without_progress();
        quiet.report(50);
        assert!(sink.0.lock().unwrap().is_empty());
        assert_eq!(quiet.mode(), ProcessingMode::Sequential);
        token.cancel();
        assert!(quiet.is_cancelled());
    }
}
