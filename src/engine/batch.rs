// src/engine/batch.rs

//! Running one operation over a whole collection of units.
//!
//! The batch runner never short-circuits: every unit is attempted and every
//! result feeds the final verdict, so one broken unit cannot hide failures
//! in the others. The fail-fast [`TaskQueue::run_all`] is deliberately not
//! used here.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{join_all, FutureExt};
use tracing::{debug, error, info};

use crate::engine::progress::{LabelFn, ProgressReporter, ProgressSink, TracingSink};
use crate::engine::queue::TaskQueue;
use crate::engine::{ExecutionResult, TaskOutcome};
use crate::errors::TaskError;
use crate::exec::{ScriptExecutor, ScriptRequest};
use crate::registry::Unit;

/// Summary of running one script (or command) across units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReport {
    pub script: String,
    /// Units the command ran for, in input order.
    pub attempted: Vec<String>,
    /// Units skipped because they don't declare the script.
    pub skipped: Vec<String>,
    /// Attempted units whose run failed.
    pub failed: Vec<String>,
    pub success: bool,
}

/// How a batch schedules its units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Up to K units at once through the task queue.
    #[default]
    Parallel,
    /// One unit at a time, in collection order.
    Sequential,
}

pub struct BatchRunner {
    queue: TaskQueue,
    sink: Arc<dyn ProgressSink>,
}

impl fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRunner")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl BatchRunner {
    /// Runner with K = `concurrency` lanes that logs status lines through
    /// `tracing`. Must be created inside a Tokio runtime.
    pub fn new(concurrency: NonZeroUsize) -> Self {
        Self::with_sink(concurrency, Arc::new(TracingSink))
    }

    pub fn with_sink(concurrency: NonZeroUsize, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            queue: TaskQueue::new(concurrency),
            sink,
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Run `operation` for every item with at most K in flight.
    ///
    /// With a `label`, each completion emits a progress line. Every item is
    /// attempted regardless of the others; the returned vector has one entry
    /// per item, in input order.
    pub async fn run_parallel<I, R, F, Fut>(
        &self,
        items: Vec<I>,
        operation: F,
        label: Option<LabelFn<I>>,
    ) -> Vec<Result<R, TaskError>>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let total = items.len();
        debug!(total, lanes = self.queue.capacity(), "running batch in parallel");

        let handles = match label {
            Some(label) => {
                let reporter = ProgressReporter::new(total, label, Arc::clone(&self.sink));
                self.queue.submit_all(items, reporter.wrap(operation))
            }
            None => self.queue.submit_all(items, operation),
        };

        join_all(handles).await
    }

    /// Run `operation` for each item strictly one after another, in order.
    ///
    /// Errors are expected to be part of `R`; a failing item never stops the
    /// following ones.
    pub async fn run_sequential<I, R, F, Fut>(
        &self,
        items: impl IntoIterator<Item = I>,
        mut operation: F,
    ) -> Vec<R>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = R>,
    {
        let mut results = Vec::new();
        for item in items {
            results.push(operation(item).await);
        }
        debug!(total = results.len(), "sequential batch finished");
        results
    }

    /// Run the script named `script` for every unit that declares it.
    ///
    /// Units without the script are skipped; they are not failures and do
    /// not count towards the verdict.
    pub async fn run_script(
        &self,
        units: &[&Unit],
        script: &str,
        executor: Arc<dyn ScriptExecutor>,
        env: &BTreeMap<String, String>,
        mode: RunMode,
    ) -> ScriptReport {
        let mut requests = Vec::new();
        let mut skipped = Vec::new();

        for unit in units {
            match unit.script(script) {
                Some(command) => requests.push(ScriptRequest::for_unit(unit, command, env)),
                None => {
                    debug!(unit = %unit.name, script, "script not declared; skipping");
                    skipped.push(unit.name.clone());
                }
            }
        }

        let mut report = self.run_requests(script, requests, executor, mode).await;
        report.skipped = skipped;
        report
    }

    /// Run the same command in every unit.
    pub async fn run_command(
        &self,
        units: &[&Unit],
        command: &str,
        executor: Arc<dyn ScriptExecutor>,
        env: &BTreeMap<String, String>,
        mode: RunMode,
    ) -> ScriptReport {
        let requests = units
            .iter()
            .map(|unit| ScriptRequest::for_unit(unit, command, env))
            .collect();
        self.run_requests(command, requests, executor, mode).await
    }

    async fn run_requests(
        &self,
        script: &str,
        requests: Vec<ScriptRequest>,
        executor: Arc<dyn ScriptExecutor>,
        mode: RunMode,
    ) -> ScriptReport {
        let attempted: Vec<String> = requests.iter().map(|r| r.unit.clone()).collect();

        let results: Vec<Result<ExecutionResult, TaskError>> = match mode {
            RunMode::Parallel => {
                let label_suffix = script.to_string();
                // Plain unit name: status lines end up in logs, not only on a tty.
                let label: LabelFn<ScriptRequest> = Arc::new(move |req: &ScriptRequest| {
                    format!("{} {}", req.unit, label_suffix)
                });

                self.run_parallel(
                    requests,
                    move |request: ScriptRequest| {
                        let executor = Arc::clone(&executor);
                        async move { Ok::<_, anyhow::Error>(executor.execute(request).await) }
                    },
                    Some(label),
                )
                .await
            }
            RunMode::Sequential => {
                self.run_sequential(requests, |request| {
                    let executor = Arc::clone(&executor);
                    async move {
                        AssertUnwindSafe(executor.execute(request))
                            .catch_unwind()
                            .await
                            .map_err(TaskError::from_panic)
                    }
                })
                .await
            }
        };

        let failed: Vec<String> = attempted
            .iter()
            .zip(results.iter())
            .filter(|(_, result)| !matches!(result, Ok(r) if r.is_success()))
            .map(|(name, _)| name.clone())
            .collect();

        for (name, result) in attempted.iter().zip(results.iter()) {
            if let Err(err) = result {
                error!(unit = %name, script, error = %err, "task fault");
            }
        }

        let success = reduce_outcomes(&results);
        info!(
            script,
            ?mode,
            attempted = attempted.len(),
            failed = failed.len(),
            success,
            "batch finished"
        );

        ScriptReport {
            script: script.to_string(),
            attempted,
            skipped: Vec::new(),
            failed,
            success,
        }
    }
}

/// `true` only if every result succeeded; `true` for no results.
///
/// Looks at every result (no short-circuit) and logs each failure.
pub fn reduce_to_success(results: &[ExecutionResult]) -> bool {
    results
        .iter()
        .map(|result| {
            if let TaskOutcome::Failed(code) = result.outcome {
                error!(
                    unit = %result.unit,
                    exit_code = code,
                    diagnostic = result.diagnostic.as_deref().unwrap_or(""),
                    "unit failed"
                );
                false
            } else {
                true
            }
        })
        .fold(true, |all_ok, ok| all_ok & ok)
}

/// Like [`reduce_to_success`], with a rejected task counting as failure.
pub fn reduce_outcomes(results: &[Result<ExecutionResult, TaskError>]) -> bool {
    let (settled, faults): (Vec<_>, Vec<_>) = results.iter().partition(|r| r.is_ok());
    let settled: Vec<ExecutionResult> = settled
        .into_iter()
        .filter_map(|r| r.as_ref().ok().cloned())
        .collect();

    reduce_to_success(&settled) & faults.is_empty()
}
