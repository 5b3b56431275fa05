//! 2D spectral analysis: r-spectrum and spectral-density ratio
//!
//! Computes the 2D discrete Fourier transform of a real-valued grid and
//! reduces it to a 1D radially-averaged power spectrum. The SDR indicator
//! compares power integrated over a low-frequency radial band against a
//! high-frequency band; rising SDR signals coarsening spatial structure.

use crate::maybe_rayon::*;
use ewsgrid_core::{Error, Grid, Result};
use ndarray::{Array2, Axis};
use num_complex::Complex;
use rustfft::FftPlanner;
use std::ops::Range;

/// Radially-averaged power spectrum of one grid.
///
/// Entries are ordered by increasing integer radial distance (in pixel
/// frequency units); the zero-distance bin is excluded because the mean is
/// removed before the transform.
#[derive(Debug, Clone)]
pub struct SpectrumSample {
    distances: Vec<usize>,
    power: Vec<f64>,
}

impl SpectrumSample {
    /// Radial distance bins, ascending
    pub fn distances(&self) -> &[usize] {
        &self.distances
    }

    /// Mean power per distance bin, parallel to `distances`
    pub fn power(&self) -> &[f64] {
        &self.power
    }

    /// Number of radial bins
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Whether the spectrum has no non-zero-distance bins
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Largest representable radial distance
    pub fn max_distance(&self) -> usize {
        self.distances.last().copied().unwrap_or(0)
    }

    /// Total power integrated (summed) over a half-open fractional band of
    /// the maximum radial distance. Returns `None` when no bin falls inside
    /// the band.
    pub fn band_power(&self, band: &Range<f64>) -> Option<f64> {
        let dmax = self.max_distance() as f64;
        if dmax == 0.0 {
            return None;
        }
        // A band ending at 1.0 is closed at the top so the outermost bin
        // is never orphaned.
        let closed_top = band.end >= 1.0;
        let mut sum = 0.0;
        let mut count = 0usize;
        for (&d, &p) in self.distances.iter().zip(&self.power) {
            let frac = d as f64 / dmax;
            if frac >= band.start && (frac < band.end || (closed_top && frac <= 1.0)) {
                sum += p;
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(sum)
        }
    }
}

/// Frequency bands for the spectral-density ratio, as half-open fractional
/// ranges of the maximum radial distance. Overlap is not checked; that is
/// the caller's responsibility.
#[derive(Debug, Clone)]
pub struct SdrBands {
    /// Low-frequency band (default 0.0..0.2)
    pub low: Range<f64>,
    /// High-frequency band (default 0.8..1.0)
    pub high: Range<f64>,
}

impl Default for SdrBands {
    fn default() -> Self {
        Self {
            low: 0.0..0.2,
            high: 0.8..1.0,
        }
    }
}

impl SdrBands {
    fn validate(&self) -> Result<()> {
        for (name, band) in [("low", &self.low), ("high", &self.high)] {
            if !(0.0..=1.0).contains(&band.start)
                || !(0.0..=1.0).contains(&band.end)
                || band.start >= band.end
            {
                return Err(Error::InvalidParameter {
                    name: "band",
                    value: format!("{name} = {:.3}..{:.3}", band.start, band.end),
                    reason: "bands must be non-empty sub-ranges of [0, 1]".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Compute the radially-averaged power spectrum (r-spectrum) of a grid.
///
/// The mean is removed, the 2D DFT computed, and per-bin power (squared
/// magnitude, normalized by the squared cell count) averaged by
/// integer-rounded radial frequency distance. Wrap-aware indices
/// (`min(i, n - i)`) map the unshifted transform onto radial distances.
pub fn rspectrum(grid: &Grid<f64>) -> Result<SpectrumSample> {
    grid.validate()?;
    let (rows, cols) = grid.shape();

    let mean = grid.mean();
    let mut field: Array2<Complex<f64>> =
        Array2::from_shape_fn((rows, cols), |(r, c)| {
            Complex::new(unsafe { grid.get_unchecked(r, c) } - mean, 0.0)
        });

    fft_2d(&mut field);

    // Bin power by integer-rounded radial distance, averaging within bins
    let n_cells = (rows * cols) as f64;
    let max_d = max_radial_distance(rows, cols);
    let mut sums = vec![0.0; max_d + 1];
    let mut counts = vec![0usize; max_d + 1];

    for ((i, j), v) in field.indexed_iter() {
        let ky = i.min(rows - i);
        let kx = j.min(cols - j);
        let d = (((kx * kx + ky * ky) as f64).sqrt()).round() as usize;
        if d == 0 || d > max_d {
            continue;
        }
        sums[d] += v.norm_sqr() / (n_cells * n_cells);
        counts[d] += 1;
    }

    let mut distances = Vec::new();
    let mut power = Vec::new();
    for d in 1..=max_d {
        if counts[d] > 0 {
            distances.push(d);
            power.push(sums[d] / counts[d] as f64);
        }
    }

    Ok(SpectrumSample { distances, power })
}

/// Spectral-density ratio: summed low-band power over summed high-band
/// power. A band containing no spectrum bins is an error for both bands;
/// a silently empty band would make the ratio meaningless.
pub fn sdr(grid: &Grid<f64>, bands: &SdrBands) -> Result<f64> {
    bands.validate()?;
    let spectrum = rspectrum(grid)?;
    if spectrum.is_empty() {
        return Err(Error::InsufficientData(
            "grid too small for spectral analysis".to_string(),
        ));
    }

    let low = spectrum.band_power(&bands.low).ok_or_else(|| {
        Error::Algorithm("low-frequency band contains no spectrum bins".to_string())
    })?;
    let high = spectrum.band_power(&bands.high).ok_or_else(|| {
        Error::Algorithm("high-frequency band contains no spectrum bins".to_string())
    })?;
    if high == 0.0 {
        return Err(Error::Algorithm(
            "high-frequency band has zero power".to_string(),
        ));
    }

    Ok(low / high)
}

/// In-place 2D FFT: row pass, then column pass over the transposed layout
fn fft_2d(field: &mut Array2<Complex<f64>>) {
    let (rows, cols) = field.dim();
    let mut planner = FftPlanner::new();
    let fft_rows = planner.plan_fft_forward(cols);
    let fft_cols = planner.plan_fft_forward(rows);

    let row_slices: Vec<&mut [Complex<f64>]> = field
        .axis_iter_mut(Axis(0))
        .map(|row| row.into_slice().expect("row-major layout"))
        .collect();
    row_slices.into_par_iter().for_each(|row| {
        fft_rows.process(row);
    });

    let mut transposed = field.t().as_standard_layout().to_owned();
    let col_slices: Vec<&mut [Complex<f64>]> = transposed
        .axis_iter_mut(Axis(0))
        .map(|row| row.into_slice().expect("row-major layout"))
        .collect();
    col_slices.into_par_iter().for_each(|row| {
        fft_cols.process(row);
    });

    field.assign(&transposed.t());
}

/// Largest radial distance representable on a rows x cols frequency grid
fn max_radial_distance(rows: usize, cols: usize) -> usize {
    let ky = rows / 2;
    let kx = cols / 2;
    (((kx * kx + ky * ky) as f64).sqrt()).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_constant_grid_has_zero_spectrum() {
        let grid = Grid::filled(16, 16, 3.7).unwrap();
        let spectrum = rspectrum(&grid).unwrap();
        for (&d, &p) in spectrum.distances().iter().zip(spectrum.power()) {
            assert!(p.abs() < 1e-20, "power {p} at distance {d}");
        }
    }

    #[test]
    fn test_sinusoid_power_concentrates_at_its_frequency() {
        // cos(2*pi*4*c/32): a pure wave at kx = 4, ky = 0
        let grid =
            Grid::from_shape_fn(32, 32, |_, c| (2.0 * PI * 4.0 * c as f64 / 32.0).cos()).unwrap();
        let spectrum = rspectrum(&grid).unwrap();
        let (best_d, _) = spectrum
            .distances()
            .iter()
            .zip(spectrum.power())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(*best_d, 4);
    }

    #[test]
    fn test_spectrum_distances_ascending() {
        let grid = Grid::from_shape_fn(20, 25, |r, c| ((r * 31 + c * 17) % 7) as f64).unwrap();
        let spectrum = rspectrum(&grid).unwrap();
        assert!(spectrum
            .distances()
            .windows(2)
            .all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_missing_values_rejected() {
        let mut data = vec![1.0; 16];
        data[5] = f64::NAN;
        let grid = Grid::from_vec(data, 4, 4).unwrap();
        assert!(rspectrum(&grid).is_err());
    }

    #[test]
    fn test_sdr_low_frequency_dominated_grid() {
        // Smooth large-scale wave plus a speck of broadband texture so the
        // high band is never identically zero
        let grid = Grid::from_shape_fn(32, 32, |r, c| {
            (2.0 * PI * r as f64 / 32.0).sin()
                + (2.0 * PI * c as f64 / 32.0).cos()
                + 0.01 * ((r * 7 + c * 13) % 5) as f64
        })
        .unwrap();
        let value = sdr(&grid, &SdrBands::default()).unwrap();
        assert!(value > 1.0, "smooth grid should have SDR > 1, got {value}");
    }

    #[test]
    fn test_band_power_sums_bins() {
        let spectrum = SpectrumSample {
            distances: vec![1, 2, 3, 4, 5],
            power: vec![10.0, 8.0, 4.0, 2.0, 1.0],
        };
        // Fractions of dmax = 5: 0.2, 0.4, 0.6, 0.8, 1.0
        assert_eq!(spectrum.band_power(&(0.0..0.5)).unwrap(), 18.0);
        // Top-closed band keeps the outermost bin
        assert_eq!(spectrum.band_power(&(0.8..1.0)).unwrap(), 3.0);
        assert_eq!(spectrum.band_power(&(0.01..0.05)), None);
    }

    #[test]
    fn test_sdr_empty_low_band_is_an_error() {
        let grid = Grid::from_shape_fn(32, 32, |r, c| ((r * 7 + c * 13) % 5) as f64).unwrap();
        let bands = SdrBands {
            low: 0.001..0.002,
            high: 0.8..1.0,
        };
        assert!(matches!(sdr(&grid, &bands), Err(Error::Algorithm(_))));
    }

    #[test]
    fn test_sdr_band_validation() {
        let grid = Grid::filled(8, 8, 1.0).unwrap();
        let bad = SdrBands {
            low: 0.5..0.2,
            high: 0.8..1.0,
        };
        assert!(matches!(
            sdr(&grid, &bad),
            Err(Error::InvalidParameter { .. })
        ));
        let out_of_range = SdrBands {
            low: 0.0..0.2,
            high: 0.8..1.5,
        };
        assert!(sdr(&grid, &out_of_range).is_err());
    }
}
