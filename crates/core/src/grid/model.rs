//! Main Grid type

use crate::error::{Error, Result};
use crate::grid::GridElement;
use ndarray::{Array2, ArrayView2};

/// An immutable 2D grid of cell values.
///
/// `Grid<T>` is the basic unit of analysis: a `rows x cols` array of numeric
/// or boolean values backed by [`ndarray::Array2`]. Grids are immutable once
/// constructed; coarse-graining, null-model generation and every other
/// transformation produce new grids.
///
/// # Type Parameters
///
/// - `T`: The cell value type, must implement [`GridElement`]
///
/// # Example
///
/// ```
/// use ewsgrid_core::Grid;
///
/// let grid = Grid::from_shape_fn(4, 4, |r, c| (r + c) as f64).unwrap();
/// assert_eq!(grid.shape(), (4, 4));
/// assert_eq!(grid.get(1, 2).unwrap(), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T: GridElement> {
    /// Cell values in row-major order (row, col)
    data: Array2<T>,
}

impl<T: GridElement> Grid<T> {
    fn check_shape(rows: usize, cols: usize) -> Result<()> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        Ok(())
    }

    /// Create a grid from an existing ndarray
    pub fn from_array(data: Array2<T>) -> Result<Self> {
        let (rows, cols) = data.dim();
        Self::check_shape(rows, cols)?;
        Ok(Self { data })
    }

    /// Create a grid from a flat row-major vector
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        Self::check_shape(rows, cols)?;
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { data: array })
    }

    /// Create a grid filled with a single value
    pub fn filled(rows: usize, cols: usize, value: T) -> Result<Self> {
        Self::check_shape(rows, cols)?;
        Ok(Self {
            data: Array2::from_elem((rows, cols), value),
        })
    }

    /// Create a grid by evaluating a function at every (row, col)
    pub fn from_shape_fn<F>(rows: usize, cols: usize, f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> T,
    {
        Self::check_shape(rows, cols)?;
        let mut f = f;
        Ok(Self {
            data: Array2::from_shape_fn((rows, cols), move |(r, c)| f(r, c)),
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid has zero cells (never true for a valid grid)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Consume the grid and return the underlying array
    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    /// Iterate over cell values in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Apply a function to every cell, producing a new grid
    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        U: GridElement,
        F: Fn(T) -> U,
    {
        Grid {
            data: self.data.mapv(|v| f(v)),
        }
    }

    /// Convert every cell to `f64`
    pub fn to_f64(&self) -> Grid<f64> {
        self.map(GridElement::to_f64)
    }

    /// Cell values as a flat row-major `f64` vector
    pub fn values_f64(&self) -> Vec<f64> {
        self.data.iter().map(|v| v.to_f64()).collect()
    }

    // Validation

    /// Number of cells carrying a missing-data marker
    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_missing()).count()
    }

    /// Reject grids containing missing-data markers.
    ///
    /// Every analysis entry point calls this; resolving missing values
    /// (interpolation, masking) is the caller's responsibility.
    pub fn validate(&self) -> Result<()> {
        let count = self.missing_count();
        if count > 0 {
            return Err(Error::MissingValues { count });
        }
        Ok(())
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> GridStatistics<T>
    where
        T: PartialOrd,
    {
        let mut min = None;
        let mut max = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if value.is_missing() {
                continue;
            }

            if min.is_none() || value < min.unwrap() {
                min = Some(value);
            }
            if max.is_none() || value > max.unwrap() {
                max = Some(value);
            }

            sum += value.to_f64();
            count += 1;
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        GridStatistics {
            min,
            max,
            mean,
            valid_count: count,
            missing_count: self.len() - count,
        }
    }
}

/// Basic statistics for a grid
#[derive(Debug, Clone)]
pub struct GridStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub missing_count: usize,
}

impl Grid<bool> {
    /// Number of active (true) cells
    pub fn active_count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

impl Grid<f64> {
    /// Mean of all cell values
    pub fn mean(&self) -> f64 {
        self.data.iter().sum::<f64>() / self.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid: Grid<f64> = Grid::filled(10, 20, 0.0).unwrap();
        assert_eq!(grid.rows(), 10);
        assert_eq!(grid.cols(), 20);
        assert_eq!(grid.shape(), (10, 20));
        assert_eq!(grid.len(), 200);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(Grid::<f64>::filled(0, 10, 0.0).is_err());
        assert!(Grid::<f64>::from_vec(vec![], 0, 0).is_err());
    }

    #[test]
    fn test_from_vec_shape_mismatch() {
        let result = Grid::from_vec(vec![1.0, 2.0, 3.0], 2, 2);
        assert!(result.is_err());
    }

    #[test]
    fn test_one_by_one_grid() {
        let grid = Grid::filled(1, 1, 42.0).unwrap();
        assert_eq!(grid.get(0, 0).unwrap(), 42.0);
        assert!(grid.get(0, 1).is_err());
    }

    #[test]
    fn test_bounds_checked_access() {
        let grid = Grid::from_shape_fn(3, 3, |r, c| (r * 3 + c) as f64).unwrap();
        assert_eq!(grid.get(2, 2).unwrap(), 8.0);
        assert!(matches!(
            grid.get(3, 0),
            Err(Error::IndexOutOfBounds { row: 3, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_missing() {
        let grid = Grid::from_vec(vec![1.0, f64::NAN, 3.0, 4.0], 2, 2).unwrap();
        assert!(matches!(
            grid.validate(),
            Err(Error::MissingValues { count: 1 })
        ));
        assert_eq!(grid.missing_count(), 1);
    }

    #[test]
    fn test_bool_grid_active_count() {
        let grid = Grid::from_vec(vec![true, false, true, true], 2, 2).unwrap();
        assert_eq!(grid.active_count(), 3);
        assert!(grid.validate().is_ok());
    }

    #[test]
    fn test_statistics() {
        let grid = Grid::from_shape_fn(10, 10, |r, c| (r * 10 + c) as f64).unwrap();
        let stats = grid.statistics();
        assert_eq!(stats.min, Some(0.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.mean, Some(49.5));
        assert_eq!(stats.valid_count, 100);
        assert_eq!(stats.missing_count, 0);
    }

    #[test]
    fn test_statistics_skips_missing() {
        let grid = Grid::from_vec(vec![2.0, f64::NAN, 8.0, 5.0], 2, 2).unwrap();
        let stats = grid.statistics();
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(8.0));
        assert_eq!(stats.mean, Some(5.0));
        assert_eq!(stats.valid_count, 3);
        assert_eq!(stats.missing_count, 1);
    }

    #[test]
    fn test_to_f64_conversion() {
        let grid = Grid::from_vec(vec![true, false, false, true], 2, 2).unwrap();
        let f = grid.to_f64();
        assert_eq!(f.get(0, 0).unwrap(), 1.0);
        assert_eq!(f.get(0, 1).unwrap(), 0.0);
        assert_eq!(f.mean(), 0.5);
    }
}
