//! # EwsGrid Algorithms
//!
//! Spatial early-warning-signal analysis for EwsGrid.
//!
//! ## Available Algorithm Categories
//!
//! - **patches**: Connected-component labeling, patch-size distributions
//! - **fitting**: Heavy-tailed discrete distribution fitting with AIC ranking
//! - **spectral**: Radially-averaged power spectra, spectral-density ratio
//! - **indicators**: Variance, skewness, Moran's I, coarse-graining
//! - **nullmodels**: Permutation, intercept-only and trend-surface nulls
//! - **significance**: Trend computation and null-model significance tests

pub mod fitting;
pub mod indicators;
mod maybe_rayon;
pub mod nullmodels;
pub mod patches;
pub mod significance;
pub mod spectral;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::fitting::{
        fit_distributions, CandidateFit, Family, FitOptions, FitReport,
    };
    pub use crate::indicators::{
        coarse_grain, generic_indicator, generic_indicators, morans_i, patch_indicator,
        sdr_indicator, skewness, variance, GenericIndicatorParams, IndicatorValues,
    };
    pub use crate::nullmodels::{default_family, generate_null, NullFamily, NullMode};
    pub use crate::patches::{
        label_patches, patch_size_distribution, PatchLabels, PatchSizeDistribution,
    };
    pub use crate::significance::{
        compute_trend, significance_test, ExecPlan, GridOutcome, GridTestResult, Indicator,
        NullReplicateSet, TestOutcome, TestParams, Trend,
    };
    pub use crate::spectral::{rspectrum, sdr, SdrBands, SpectrumSample};
    pub use ewsgrid_core::prelude::*;
}
