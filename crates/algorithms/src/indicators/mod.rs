//! Generic early-warning indicators on real-valued grids
//!
//! - **coarse-graining**: block-averaging to a coarser resolution
//! - **variance / skewness**: spatial moments of cell values
//! - **Moran's I**: lag-1 spatial autocorrelation with row-normalized
//!   4- or 8-neighbor weights
//!
//! Plus the built-in indicator closures plugged into the significance
//! framework (generic set, SDR, patch metrics).

use crate::fitting::{fit_distributions, Family, FitOptions};
use crate::maybe_rayon::*;
use crate::patches::label_patches;
use crate::spectral::{sdr, SdrBands};
use ewsgrid_core::{Connectivity, Error, Grid, Result};
use std::collections::BTreeMap;

/// Named indicator values for one grid.
///
/// A `BTreeMap` keeps key order deterministic, which the significance
/// tester relies on when aggregating null replicates.
pub type IndicatorValues = BTreeMap<String, f64>;

/// Parameters for the generic indicator set
#[derive(Debug, Clone)]
pub struct GenericIndicatorParams {
    /// Coarse-graining block size; `None` computes on the raw grid
    pub block: Option<usize>,
    /// Adjacency rule for the Moran's I weight matrix
    pub connectivity: Connectivity,
}

impl Default for GenericIndicatorParams {
    fn default() -> Self {
        Self {
            block: None,
            connectivity: Connectivity::Four,
        }
    }
}

/// Block-average a grid to a coarser resolution.
///
/// The grid is partitioned into non-overlapping `block x block` squares and
/// each is replaced by its mean. Incomplete blocks at the right and bottom
/// edges are dropped, so the output shape is `(rows / block, cols / block)`
/// exactly; this fixed policy keeps results deterministic.
pub fn coarse_grain(grid: &Grid<f64>, block: usize) -> Result<Grid<f64>> {
    grid.validate()?;
    let (rows, cols) = grid.shape();
    if block == 0 {
        return Err(Error::InvalidParameter {
            name: "block",
            value: "0".to_string(),
            reason: "block size must be >= 1".to_string(),
        });
    }
    let out_rows = rows / block;
    let out_cols = cols / block;
    if out_rows == 0 || out_cols == 0 {
        return Err(Error::InvalidParameter {
            name: "block",
            value: block.to_string(),
            reason: format!("no complete block fits a {rows}x{cols} grid"),
        });
    }

    let area = (block * block) as f64;
    Grid::from_shape_fn(out_rows, out_cols, |br, bc| {
        let mut sum = 0.0;
        for r in br * block..(br + 1) * block {
            for c in bc * block..(bc + 1) * block {
                sum += unsafe { grid.get_unchecked(r, c) };
            }
        }
        sum / area
    })
}

/// Population variance of cell values
pub fn variance(grid: &Grid<f64>) -> f64 {
    let mean = grid.mean();
    let n = grid.len() as f64;
    grid.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Skewness (third standardized moment) of cell values.
///
/// A constant grid yields 0 rather than a division fault.
pub fn skewness(grid: &Grid<f64>) -> f64 {
    let mean = grid.mean();
    let n = grid.len() as f64;
    let m2 = grid.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    if m2 <= f64::EPSILON * mean.abs().max(1.0) {
        return 0.0;
    }
    let m3 = grid
        .iter()
        .map(|v| (v - mean) * (v - mean) * (v - mean))
        .sum::<f64>()
        / n;
    m3 / m2.powf(1.5)
}

/// Lag-1 spatial autocorrelation (Moran's I) with a row-normalized
/// 4- or 8-neighbor weight matrix.
///
/// With row-normalized weights this reduces to the mean cross-product of
/// each cell's deviation with the mean deviation of its neighbors, scaled
/// by the variance. A constant grid (or a 1x1 grid, which has no neighbor
/// pairs) yields 0.
pub fn morans_i(grid: &Grid<f64>, connectivity: Connectivity) -> f64 {
    let (rows, cols) = grid.shape();
    let mean = grid.mean();
    let sum_sq: f64 = grid.iter().map(|v| (v - mean) * (v - mean)).sum();
    if sum_sq <= f64::EPSILON * mean.abs().max(1.0) {
        return 0.0;
    }

    // Per-row partial sums, collected in order so the final reduction is
    // deterministic under parallel execution
    let partials: Vec<(f64, f64)> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut cross = 0.0;
            let mut weight = 0.0;
            for col in 0..cols {
                let dev = unsafe { grid.get_unchecked(row, col) } - mean;
                let mut neighbor_sum = 0.0;
                let mut degree = 0usize;
                for (nr, nc) in connectivity.neighbors(row, col, rows, cols) {
                    neighbor_sum += unsafe { grid.get_unchecked(nr, nc) } - mean;
                    degree += 1;
                }
                if degree > 0 {
                    cross += dev * neighbor_sum / degree as f64;
                    weight += 1.0;
                }
            }
            (cross, weight)
        })
        .collect();

    let numerator: f64 = partials.iter().map(|p| p.0).sum();
    let w_sum: f64 = partials.iter().map(|p| p.1).sum();
    if w_sum == 0.0 {
        return 0.0;
    }

    (grid.len() as f64 / w_sum) * (numerator / sum_sq)
}

/// Compute the generic indicator set (variance, skewness, Moran's I) on a
/// grid, optionally after coarse-graining.
pub fn generic_indicators(
    grid: &Grid<f64>,
    params: &GenericIndicatorParams,
) -> Result<IndicatorValues> {
    grid.validate()?;
    let coarse;
    let target = match params.block {
        Some(block) => {
            coarse = coarse_grain(grid, block)?;
            &coarse
        }
        None => grid,
    };

    let mut values = IndicatorValues::new();
    values.insert("variance".to_string(), variance(target));
    values.insert("skewness".to_string(), skewness(target));
    values.insert("moran".to_string(), morans_i(target, params.connectivity));
    Ok(values)
}

// ---------------------------------------------------------------------------
// Built-in indicator closures for the significance framework
// ---------------------------------------------------------------------------

/// Generic indicator set as a pluggable indicator function
pub fn generic_indicator(
    params: GenericIndicatorParams,
) -> impl Fn(&Grid<f64>) -> Result<IndicatorValues> + Send + Sync + Clone {
    move |grid| generic_indicators(grid, &params)
}

/// Spectral-density ratio as a pluggable indicator function
pub fn sdr_indicator(
    bands: SdrBands,
) -> impl Fn(&Grid<f64>) -> Result<IndicatorValues> + Send + Sync + Clone {
    move |grid| {
        let mut values = IndicatorValues::new();
        values.insert("sdr".to_string(), sdr(grid, &bands)?);
        Ok(values)
    }
}

/// Patch-geometry metrics as a pluggable indicator function.
///
/// Reports the patch count, the largest patch as a fraction of the grid
/// area, and the fitted power-law exponent of the patch-size distribution
/// (`plexp`). A grid with no active cells reports zero count and fraction;
/// `plexp` is NaN whenever the size sample cannot support a fit (empty or
/// degenerate), so the unavailability stays visible in null summaries.
pub fn patch_indicator(
    connectivity: Connectivity,
) -> impl Fn(&Grid<bool>) -> Result<IndicatorValues> + Send + Sync + Clone {
    move |grid| {
        let labels = label_patches(grid, connectivity)?;
        let mut values = IndicatorValues::new();
        values.insert("patch_count".to_string(), labels.patch_count() as f64);
        values.insert(
            "largest_patch_frac".to_string(),
            labels.largest() as f64 / grid.len() as f64,
        );
        values.insert("plexp".to_string(), powerlaw_exponent(labels.sizes()));
        Ok(values)
    }
}

/// Fitted power-law exponent of a patch-size sample, NaN when the sample
/// is empty or too degenerate to identify one.
fn powerlaw_exponent(sizes: &[usize]) -> f64 {
    let sample: Vec<u64> = sizes.iter().map(|&s| s as u64).collect();
    let options = FitOptions {
        families: vec![Family::PowerLaw],
        xmin: None,
    };
    match fit_distributions(&sample, &options) {
        Ok(report) => report.best().params[0],
        Err(_) => f64::NAN,
    }
}
