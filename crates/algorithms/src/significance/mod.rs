//! Null-model significance testing
//!
//! Applies an indicator function to a collection of grids (a trend), then
//! compares each observed value against an empirical null distribution
//! built by recomputing the same indicator on N randomized surrogates.
//!
//! The p-value convention is one-sided and deliberate: **low p means the
//! observed value sits above the null distribution**. The `+1` correction
//! in `(#{null >= observed} + 1) / (N + 1)` keeps p-values strictly
//! positive and biases toward the conservative side.

use crate::indicators::IndicatorValues;
use crate::nullmodels::{default_family, generate_null, NullFamily, NullMode};
use ewsgrid_core::{Error, Grid, GridElement, Result};
use ewsgrid_parallel::{CancelToken, ParallelStrategy, ProcessingMode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tracing::warn;

/// Capability interface for pluggable indicators.
///
/// Any `Fn(&Grid<T>) -> Result<IndicatorValues>` qualifies via the blanket
/// impl; no inheritance hierarchy is required. Indicators must be pure:
/// deterministic output for deterministic input, so null-replicate
/// recomputation is directly comparable to the observed computation.
pub trait Indicator<T: GridElement>: Send + Sync {
    /// Compute named indicator values for one grid
    fn compute(&self, grid: &Grid<T>) -> Result<IndicatorValues>;
}

impl<T, F> Indicator<T> for F
where
    T: GridElement,
    F: Fn(&Grid<T>) -> Result<IndicatorValues> + Send + Sync,
{
    fn compute(&self, grid: &Grid<T>) -> Result<IndicatorValues> {
        self(grid)
    }
}

/// Execution context for batch operations: processing mode plus a
/// cooperative cancellation token. Passed explicitly rather than read from
/// global state so concurrency is a testable parameter.
#[derive(Debug, Clone, Default)]
pub struct ExecPlan {
    /// Sequential or worker-pool dispatch
    pub mode: ProcessingMode,
    /// Checked between grids and between replicates
    pub cancel: CancelToken,
}

/// Indicator outcome for one grid of a collection.
///
/// Failures stay attached to the grid's position instead of silently
/// dropping the grid from the trend.
#[derive(Debug)]
pub struct GridOutcome {
    /// Position of the grid in the input collection
    pub index: usize,
    /// Indicator values, or the error that grid produced
    pub outcome: Result<IndicatorValues>,
}

/// Ordered collection of per-grid indicator outcomes.
///
/// Order follows the input collection, which usually represents a gradient.
#[derive(Debug)]
pub struct Trend {
    /// One outcome per input grid, in input order
    pub outcomes: Vec<GridOutcome>,
}

impl Trend {
    /// Number of grids in the trend
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the trend is empty
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Values of one named indicator along the trend; `None` where the
    /// grid failed or the indicator did not report that name.
    pub fn indicator(&self, name: &str) -> Vec<Option<f64>> {
        self.outcomes
            .iter()
            .map(|o| match &o.outcome {
                Ok(values) => values.get(name).copied(),
                Err(_) => None,
            })
            .collect()
    }
}

/// Apply an indicator to every grid of a collection.
///
/// Outputs are reassembled in input order regardless of completion order
/// under parallel execution.
pub fn compute_trend<T, I>(grids: &[Grid<T>], indicator: &I, plan: &ExecPlan) -> Trend
where
    T: GridElement,
    I: Indicator<T>,
{
    let outcomes = plan.mode.par_map(0..grids.len(), |i| {
        if plan.cancel.is_cancelled() {
            return GridOutcome {
                index: i,
                outcome: Err(Error::Cancelled),
            };
        }
        GridOutcome {
            index: i,
            outcome: indicator.compute(&grids[i]),
        }
    });
    Trend { outcomes }
}

/// Parameters of one significance test invocation.
///
/// The replicate count is fixed per invocation and identical across every
/// grid of the batch.
#[derive(Debug, Clone)]
pub struct TestParams {
    /// Null-generation mode
    pub mode: NullMode,
    /// Number of null replicates per grid (>= 1)
    pub replicates: usize,
    /// Model family override; `None` auto-selects from the grid value kind
    /// and emits a warning once per call
    pub family: Option<NullFamily>,
    /// Two-sided quantile bounds of the null sample
    pub quantiles: (f64, f64),
    /// Master seed; replicate streams are split from it deterministically
    pub seed: u64,
    /// Retain the generated null grids for inspection
    pub keep_null_grids: bool,
}

impl Default for TestParams {
    fn default() -> Self {
        Self {
            mode: NullMode::Perm,
            replicates: 999,
            family: None,
            quantiles: (0.05, 0.95),
            seed: 0,
            keep_null_grids: false,
        }
    }
}

/// Empirical null distribution of one indicator on one grid
#[derive(Debug, Clone)]
pub struct NullReplicateSet {
    /// Observed indicator value
    pub observed: f64,
    /// Null indicator values in replicate order
    pub values: Vec<f64>,
    /// Mean of the null sample
    pub mean: f64,
    /// Lower quantile bound of the null sample
    pub q_low: f64,
    /// Upper quantile bound of the null sample
    pub q_high: f64,
    /// One-sided empirical p-value: (#{null >= observed} + 1) / (N + 1)
    pub p_value: f64,
}

/// Significance-test result for one grid
#[derive(Debug)]
pub struct GridTestResult<T: GridElement> {
    /// Position of the grid in the input collection
    pub index: usize,
    /// Observed indicator values
    pub observed: IndicatorValues,
    /// Null distribution summary per indicator name
    pub nulls: BTreeMap<String, NullReplicateSet>,
    /// Generated null grids, retained only when requested
    pub null_grids: Vec<Grid<T>>,
}

/// Per-grid test outcome; errors stay attached to the grid's position
#[derive(Debug)]
pub struct TestOutcome<T: GridElement> {
    /// Position of the grid in the input collection
    pub index: usize,
    /// Test result, or the error that aborted this grid's test
    pub outcome: Result<GridTestResult<T>>,
}

/// Run a null-model significance test over a collection of grids.
///
/// For each grid, N null grids are generated, the indicator is recomputed
/// on each, and the observed values are ranked against the empirical null
/// distributions. A null-model fit failure aborts the affected grid's test
/// rather than silently skipping replicates, which would bias the null.
pub fn significance_test<T, I>(
    grids: &[Grid<T>],
    indicator: &I,
    params: &TestParams,
    plan: &ExecPlan,
) -> Result<Vec<TestOutcome<T>>>
where
    T: GridElement,
    I: Indicator<T>,
{
    if params.replicates == 0 {
        return Err(Error::InvalidParameter {
            name: "replicates",
            value: "0".to_string(),
            reason: "at least one null replicate is required".to_string(),
        });
    }
    let (q_low, q_high) = params.quantiles;
    if !(0.0..=1.0).contains(&q_low) || !(0.0..=1.0).contains(&q_high) || q_low >= q_high {
        return Err(Error::InvalidParameter {
            name: "quantiles",
            value: format!("({q_low}, {q_high})"),
            reason: "bounds must satisfy 0 <= low < high <= 1".to_string(),
        });
    }

    let family = match params.family {
        Some(f) => f,
        None => {
            let f = default_family(T::kind());
            // Perm ignores the family entirely; only warn when the default
            // actually shapes the null model.
            if params.mode != NullMode::Perm {
                warn!(
                    family = ?f,
                    mode = ?params.mode,
                    "null-model family auto-selected from grid value kind"
                );
            }
            f
        }
    };

    let outcomes = plan.mode.par_map(0..grids.len(), |g| {
        if plan.cancel.is_cancelled() {
            return TestOutcome {
                index: g,
                outcome: Err(Error::Cancelled),
            };
        }
        TestOutcome {
            index: g,
            outcome: test_single_grid(&grids[g], g, indicator, params, family, plan),
        }
    });

    Ok(outcomes)
}

fn test_single_grid<T, I>(
    grid: &Grid<T>,
    grid_index: usize,
    indicator: &I,
    params: &TestParams,
    family: NullFamily,
    plan: &ExecPlan,
) -> Result<GridTestResult<T>>
where
    T: GridElement,
    I: Indicator<T>,
{
    let observed = indicator.compute(grid)?;

    let replicates: Vec<Result<(IndicatorValues, Option<Grid<T>>)>> =
        plan.mode.par_map(0..params.replicates, |r| {
            if plan.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let mut rng = StdRng::seed_from_u64(replicate_seed(params.seed, grid_index, r));
            let null = generate_null(grid, params.mode, family, &mut rng)?;
            let values = indicator.compute(&null)?;
            let kept = if params.keep_null_grids {
                Some(null)
            } else {
                None
            };
            Ok((values, kept))
        });

    let mut null_values: Vec<IndicatorValues> = Vec::with_capacity(replicates.len());
    let mut null_grids = Vec::new();
    for replicate in replicates {
        let (values, kept) = replicate?;
        null_values.push(values);
        if let Some(g) = kept {
            null_grids.push(g);
        }
    }

    let n = null_values.len();
    let mut nulls = BTreeMap::new();
    for (name, &obs) in &observed {
        let mut values = Vec::with_capacity(n);
        for replicate in &null_values {
            let v = replicate.get(name).copied().ok_or_else(|| {
                Error::Algorithm(format!(
                    "indicator dropped key '{name}' on a null replicate"
                ))
            })?;
            values.push(v);
        }

        let exceed = values.iter().filter(|&&v| v >= obs).count();
        let p_value = (exceed + 1) as f64 / (n + 1) as f64;
        let mean = values.iter().sum::<f64>() / n as f64;

        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        let q_low = quantile(&sorted, params.quantiles.0);
        let q_high = quantile(&sorted, params.quantiles.1);

        nulls.insert(
            name.clone(),
            NullReplicateSet {
                observed: obs,
                values,
                mean,
                q_low,
                q_high,
                p_value,
            },
        );
    }

    Ok(GridTestResult {
        index: grid_index,
        observed,
        nulls,
        null_grids,
    })
}

/// Empirical quantile with linear interpolation over a sorted sample
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = q * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Deterministic per-replicate seed: SplitMix64 finalizer over the master
/// seed and the (grid, replicate) coordinates. No two replicates share a
/// stream, and results do not depend on scheduling.
fn replicate_seed(seed: u64, grid: usize, replicate: usize) -> u64 {
    let mut z = seed
        ^ (grid as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (replicate as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9).rotate_left(17);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
