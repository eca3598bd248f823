#![allow(dead_code)]

use std::num::NonZeroUsize;

pub use monorun_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Lane count for tests.
pub fn lanes(k: usize) -> NonZeroUsize {
    NonZeroUsize::new(k).expect("lane count must be >= 1")
}
