use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use monorun::engine::ExecutionResult;
use monorun::exec::{ScriptExecutor, ScriptRequest};

/// How the fake should behave for one unit.
#[derive(Debug, Clone, Copy)]
pub enum FakeBehaviour {
    Succeed,
    Fail(i32),
    Panic,
}

/// Start/end of one fake execution.
#[derive(Debug, Clone)]
pub struct Interval {
    pub unit: String,
    pub start: Instant,
    pub end: Instant,
}

/// A fake executor that:
/// - records every request it receives
/// - sleeps for a configurable delay instead of spawning a process
/// - succeeds, fails or panics per unit
/// - tracks how many executions overlap
#[derive(Debug, Default)]
pub struct FakeExecutor {
    behaviours: HashMap<String, FakeBehaviour>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<Vec<ScriptRequest>>,
    intervals: Mutex<Vec<Interval>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, unit: &str, code: i32) -> Self {
        self.behaviours.insert(unit.to_string(), FakeBehaviour::Fail(code));
        self
    }

    pub fn panicking(mut self, unit: &str) -> Self {
        self.behaviours.insert(unit.to_string(), FakeBehaviour::Panic);
        self
    }

    pub fn with_delay(mut self, unit: &str, delay: Duration) -> Self {
        self.delays.insert(unit.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<ScriptRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Unit names in the order their execution started.
    pub fn executed_units(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.unit).collect()
    }

    pub fn intervals(&self) -> Vec<Interval> {
        self.intervals.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ScriptExecutor for FakeExecutor {
    fn execute(
        &self,
        request: ScriptRequest,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>> {
        Box::pin(async move {
            let start = Instant::now();
            self.calls.lock().unwrap().push(request.clone());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay = self
                .delays
                .get(&request.unit)
                .copied()
                .unwrap_or(self.default_delay);
            tokio::time::sleep(delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.intervals.lock().unwrap().push(Interval {
                unit: request.unit.clone(),
                start,
                end: Instant::now(),
            });

            match self
                .behaviours
                .get(&request.unit)
                .copied()
                .unwrap_or(FakeBehaviour::Succeed)
            {
                FakeBehaviour::Succeed => ExecutionResult::success(&request.unit, start.elapsed()),
                FakeBehaviour::Fail(code) => ExecutionResult::failed(
                    &request.unit,
                    code,
                    Some(format!("{} exited with {code}", request.command)),
                    start.elapsed(),
                ),
                FakeBehaviour::Panic => panic!("simulated fault in {}", request.unit),
            }
        })
    }
}
