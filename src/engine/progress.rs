// src/engine/progress.rs

//! Per-completion progress reporting.
//!
//! A [`ProgressReporter`] wraps an operation so that every completed call
//! emits one status line of the form
//!
//! ```text
//! [3/12] web build finished in 1.204s
//! ```
//!
//! The counter is shared by the whole batch. Incrementing it and emitting
//! the line happen under one lock, so indices run 1..=N without gaps or
//! duplicates and lines appear in completion order.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};
use tracing::info;

/// Produces the human-readable label of an item.
pub type LabelFn<I> = Arc<dyn Fn(&I) -> String + Send + Sync>;

/// Destination for status lines.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Logs status lines through `tracing` at info level (default).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, line: &str) {
        info!(target: "monorun::progress", "{line}");
    }
}

/// Keeps status lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ProgressSink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.to_string());
    }
}

/// Format one status line.
pub fn format_status(index: usize, total: usize, label: &str, elapsed: Duration) -> String {
    format!(
        "[{index}/{total}] {label} finished in {:.3}s",
        elapsed.as_secs_f64()
    )
}

pub struct ProgressReporter<I> {
    total: usize,
    completed: Mutex<usize>,
    label: LabelFn<I>,
    sink: Arc<dyn ProgressSink>,
}

impl<I> std::fmt::Debug for ProgressReporter<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("total", &self.total)
            .field(
                "completed",
                &*self.completed.lock().unwrap_or_else(|e| e.into_inner()),
            )
            .finish_non_exhaustive()
    }
}

impl<I: Send + 'static> ProgressReporter<I> {
    pub fn new(total: usize, label: LabelFn<I>, sink: Arc<dyn ProgressSink>) -> Arc<Self> {
        Arc::new(Self {
            total,
            completed: Mutex::new(0),
            label,
            sink,
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of completions recorded so far.
    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count one completion and emit its line. Returns the 1-based index.
    fn record_completion(&self, label: &str, elapsed: Duration) -> usize {
        let mut done = self.completed.lock().unwrap_or_else(|e| e.into_inner());
        *done += 1;
        self.sink
            .emit(&format_status(*done, self.total, label, elapsed));
        *done
    }

    /// Decorate `operation` with timing and a status line per completion.
    ///
    /// The wrapped operation returns exactly what the inner one returns;
    /// failures and panics are counted as completions too, then passed on.
    pub fn wrap<R, F, Fut>(
        self: &Arc<Self>,
        operation: F,
    ) -> impl Fn(I) -> BoxFuture<'static, anyhow::Result<R>> + Send + Sync + use<I, R, F, Fut>
    where
        R: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let reporter = Arc::clone(self);
        move |item: I| -> BoxFuture<'static, anyhow::Result<R>> {
            let reporter = Arc::clone(&reporter);
            let label = (reporter.label)(&item);
            let fut = operation(item);

            Box::pin(async move {
                let started = Instant::now();
                let result = AssertUnwindSafe(fut).catch_unwind().await;
                reporter.record_completion(&label, started.elapsed());
                match result {
                    Ok(value) => value,
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            })
        }
    }
}
