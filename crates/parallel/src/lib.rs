//! # ewsgrid Parallel
//!
//! Execution strategies for ewsgrid batch computations.
//!
//! This crate provides:
//! - `ProcessingMode` / `ParallelStrategy`: a reified execution-context
//!   value selecting sequential or worker-pool dispatch
//! - `CancelToken`: cooperative cancellation checked between units of work
//!
//! With the default `parallel` feature disabled, every mode degrades to
//! sequential execution with an identical API.

pub mod cancel;
pub mod strategy;

pub use cancel::CancelToken;
pub use strategy::{ParallelStrategy, ProcessingMode};

/// Number of worker threads the parallel mode would use
#[cfg(feature = "parallel")]
pub fn num_threads() -> usize {
    rayon::current_num_threads()
}

/// Number of worker threads the parallel mode would use
#[cfg(not(feature = "parallel"))]
pub fn num_threads() -> usize {
    1
}
