//! Connected-component labeling of active cells

use ewsgrid_core::{Connectivity, Grid, Result};
use ndarray::Array2;

/// Result of labeling a boolean grid.
///
/// Labels are 1-based; 0 marks background (inactive) cells. `sizes[k]` is
/// the cell count of the patch labeled `k + 1`.
#[derive(Debug, Clone)]
pub struct PatchLabels {
    labels: Array2<u32>,
    sizes: Vec<usize>,
}

impl PatchLabels {
    /// Number of patches found
    pub fn patch_count(&self) -> usize {
        self.sizes.len()
    }

    /// Label grid: 0 = background, 1..=n identify patches
    pub fn labels(&self) -> &Array2<u32> {
        &self.labels
    }

    /// Patch sizes indexed by label - 1
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Size of the largest patch, 0 if there are no patches
    pub fn largest(&self) -> usize {
        self.sizes.iter().copied().max().unwrap_or(0)
    }

    /// Total number of labeled (active) cells
    pub fn total_active(&self) -> usize {
        self.sizes.iter().sum()
    }
}

/// Label the patches (maximal connected regions of active cells) of a
/// boolean grid under the given adjacency rule.
///
/// Flood-fill over active cells; every cell is visited exactly once, so the
/// cost is O(rows * cols). Edges are hard boundaries. A grid with zero
/// active cells yields zero patches; a fully active grid yields a single
/// patch covering the whole grid.
pub fn label_patches(grid: &Grid<bool>, connectivity: Connectivity) -> Result<PatchLabels> {
    let (rows, cols) = grid.shape();
    let mut labels: Array2<u32> = Array2::zeros((rows, cols));
    let mut sizes: Vec<usize> = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            let active = unsafe { grid.get_unchecked(row, col) };
            if !active || labels[(row, col)] != 0 {
                continue;
            }

            let label = sizes.len() as u32 + 1;
            let mut size = 0usize;
            stack.push((row, col));
            labels[(row, col)] = label;

            while let Some((r, c)) = stack.pop() {
                size += 1;
                for (nr, nc) in connectivity.neighbors(r, c, rows, cols) {
                    let neighbor_active = unsafe { grid.get_unchecked(nr, nc) };
                    if neighbor_active && labels[(nr, nc)] == 0 {
                        labels[(nr, nc)] = label;
                        stack.push((nr, nc));
                    }
                }
            }

            sizes.push(size);
        }
    }

    Ok(PatchLabels { labels, sizes })
}
