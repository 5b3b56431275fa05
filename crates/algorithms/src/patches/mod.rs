//! Patch detection on boolean grids
//!
//! A patch is a maximal connected region of active cells under a chosen
//! adjacency rule. Patches are derived on demand from a boolean grid and
//! never persisted; the multiset of their sizes is the empirical sample
//! fed to the distribution fitter.

mod labeling;

pub use labeling::{label_patches, PatchLabels};

use ewsgrid_core::{Connectivity, Grid, Result};

/// The multiset of patch sizes derived from one grid.
///
/// Sizes are positive integers sorted ascending. Their sum equals the
/// grid's active-cell count exactly (labeling is exhaustive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSizeDistribution {
    sizes: Vec<u64>,
}

impl PatchSizeDistribution {
    /// Build from raw sizes (sorted internally)
    pub fn from_sizes(mut sizes: Vec<u64>) -> Self {
        sizes.sort_unstable();
        Self { sizes }
    }

    /// Sorted patch sizes
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Number of patches
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Whether the grid had no active cells
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Total active cells across all patches
    pub fn total(&self) -> u64 {
        self.sizes.iter().sum()
    }

    /// Largest patch size, 0 when empty
    pub fn largest(&self) -> u64 {
        self.sizes.last().copied().unwrap_or(0)
    }
}

/// Label a boolean grid and return its patch-size distribution.
///
/// A grid with zero active cells yields an empty distribution, not an error.
pub fn patch_size_distribution(
    grid: &Grid<bool>,
    connectivity: Connectivity,
) -> Result<PatchSizeDistribution> {
    let labels = label_patches(grid, connectivity)?;
    Ok(PatchSizeDistribution::from_sizes(
        labels.sizes().iter().map(|&s| s as u64).collect(),
    ))
}
