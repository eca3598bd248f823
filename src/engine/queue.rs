// src/engine/queue.rs

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{try_join_all, BoxFuture};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn, Instrument};

use crate::errors::TaskError;

/// A type-erased unit of work: runs the operation and settles its handle.
type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

type Backlog = Arc<Mutex<mpsc::UnboundedReceiver<Job>>>;

/// Bounded queue of asynchronous jobs.
///
/// Semantics:
/// - `capacity` (K) lanes are spawned up front. Each lane repeatedly pulls
///   the oldest unstarted job from one shared backlog and runs it to
///   completion, so at most K jobs are in flight and a finished job frees
///   its lane for the next one immediately.
/// - Jobs start in submission order as lanes become free.
/// - Every job runs inside a `lane` tracing span carrying its lane index.
/// - A job that returns `Err` or panics only rejects its own handle; the
///   lanes and all other jobs are unaffected.
/// - There is no cancellation: once submitted, a job runs to completion even
///   if its handle is dropped.
///
/// Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct TaskQueue {
    backlog: mpsc::UnboundedSender<Job>,
    lanes: Vec<JoinHandle<()>>,
    capacity: NonZeroUsize,
}

impl TaskQueue {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx: Backlog = Arc::new(Mutex::new(rx));

        let lanes = (0..capacity.get())
            .map(|lane| tokio::spawn(run_lane(lane, Arc::clone(&rx))))
            .collect();

        debug!(lanes = capacity.get(), "task queue started");

        Self {
            backlog: tx,
            lanes,
            capacity,
        }
    }

    /// Maximum number of jobs in flight (K).
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Enqueue `operation(item)`. Never blocks; the returned handle settles
    /// with the operation's outcome.
    pub fn submit<I, R, F, Fut>(&self, item: I, operation: F) -> TaskHandle<R>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: FnOnce(I) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let job: Job = Box::new(move || -> BoxFuture<'static, ()> {
            Box::pin(async move {
                // Run on its own task so a panic is contained to this job.
                let outcome = match tokio::spawn(operation(item).in_current_span()).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(TaskError::Failed(err)),
                    Err(join_err) => Err(TaskError::from_join(join_err)),
                };
                if tx.send(outcome).is_err() {
                    trace!("task handle dropped before completion; result discarded");
                }
            })
        });

        if self.backlog.send(job).is_err() {
            // All lanes are gone; the dropped job closes `tx` and the handle
            // resolves to `TaskError::Abandoned`.
            warn!("task queue has no running lanes; submission abandoned");
        }

        TaskHandle { rx }
    }

    /// Submit every item with the same operation, returning the handles in
    /// input order.
    pub fn submit_all<I, R, F, Fut>(
        &self,
        items: impl IntoIterator<Item = I>,
        operation: F,
    ) -> Vec<TaskHandle<R>>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let operation = Arc::new(operation);
        items
            .into_iter()
            .map(|item| {
                let op = Arc::clone(&operation);
                self.submit(item, move |item| (*op)(item))
            })
            .collect()
    }

    /// Run `operation` over all items and collect results in input order.
    ///
    /// Fail-fast: resolves to the first rejection as soon as it surfaces.
    /// The remaining jobs still run to completion in their lanes; callers
    /// that need every outcome should await the handles from
    /// [`TaskQueue::submit_all`] individually (see `BatchRunner`).
    pub async fn run_all<I, R, F, Fut>(
        &self,
        items: impl IntoIterator<Item = I>,
        operation: F,
    ) -> Result<Vec<R>, TaskError>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        try_join_all(self.submit_all(items, operation)).await
    }

    /// Close the backlog and wait until every queued job has finished.
    pub async fn shutdown(self) {
        let Self { backlog, lanes, .. } = self;
        drop(backlog);
        for lane in lanes {
            if let Err(e) = lane.await {
                warn!(error = %e, "lane terminated abnormally");
            }
        }
        debug!("task queue drained");
    }
}

async fn run_lane(lane: usize, backlog: Backlog) {
    loop {
        // Holding the lock while waiting keeps pulls strictly FIFO.
        let next = {
            let mut rx = backlog.lock().await;
            rx.recv().await
        };

        let Some(job) = next else {
            break;
        };

        job().instrument(tracing::debug_span!("lane", lane)).await;
    }

    trace!(lane, "lane finished (backlog closed)");
}

/// Pending result of a submitted job.
///
/// Resolves exactly once, to the job's value or to the reason it failed.
#[derive(Debug)]
pub struct TaskHandle<R> {
    rx: oneshot::Receiver<Result<R, TaskError>>,
}

impl<R> Future for TaskHandle<R> {
    type Output = Result<R, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|settled| settled.unwrap_or_else(|_| Err(TaskError::Abandoned)))
    }
}
