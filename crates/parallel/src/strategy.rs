//! Execution strategies for batch computations

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Execution mode for embarrassingly parallel batch work.
///
/// Reified as a value passed into batch operations rather than ambient
/// global state, so concurrency mode is a testable parameter. Parallel
/// execution is a throughput choice only; with a fixed seed all modes
/// produce identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Single-threaded, deterministic scheduling
    Sequential,
    /// Parallel processing using all available cores
    Parallel,
    /// Parallel with a specified number of threads
    ParallelWith(usize),
}

impl Default for ProcessingMode {
    fn default() -> Self {
        ProcessingMode::Parallel
    }
}

/// Strategy for dispatching independent units of work.
///
/// Results are index-tagged: `par_map` returns outputs in input order
/// regardless of task completion order.
pub trait ParallelStrategy {
    /// Execute a function over indices
    fn par_for_each<F>(&self, range: std::ops::Range<usize>, f: F)
    where
        F: Fn(usize) + Sync + Send;

    /// Map a function over indices, collecting results in index order
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    #[cfg(feature = "parallel")]
    fn par_for_each<F>(&self, range: std::ops::Range<usize>, f: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => {
                for i in range {
                    f(i);
                }
            }
            ProcessingMode::Parallel => {
                range.into_par_iter().for_each(f);
            }
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .expect("Failed to build thread pool");
                pool.install(|| {
                    range.into_par_iter().for_each(f);
                });
            }
        }
    }

    #[cfg(feature = "parallel")]
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            ProcessingMode::Parallel => range.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .expect("Failed to build thread pool");
                pool.install(|| range.into_par_iter().map(f).collect())
            }
        }
    }

    // Without rayon every mode degrades to sequential execution.

    #[cfg(not(feature = "parallel"))]
    fn par_for_each<F>(&self, range: std::ops::Range<usize>, f: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        for i in range {
            f(i);
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        range.map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_par_map_preserves_order() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let out = mode.par_map(0..100, |i| i * 2);
            let expected: Vec<usize> = (0..100).map(|i| i * 2).collect();
            assert_eq!(out, expected, "order broken for {:?}", mode);
        }
    }

    #[test]
    fn test_par_for_each_visits_all() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let counter = AtomicUsize::new(0);
        ProcessingMode::Parallel.par_for_each(0..50, |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(counter.load(Ordering::Relaxed), 50);
    }
}
