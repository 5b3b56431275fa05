//! Cell element trait for generic grids

use num_traits::NumCast;
use std::fmt::Debug;

/// Broad classification of a grid's cell values.
///
/// Drives the automatic null-model family selection: boolean grids get a
/// binomial model, everything else a Gaussian one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Presence/absence cells (e.g., vegetated vs. bare)
    Boolean,
    /// Real- or integer-valued cells (e.g., cover fraction, biomass)
    Continuous,
}

/// Trait for types that can be stored in a grid cell.
///
/// Bounds the types usable as cell values and provides the conversions the
/// indicator and null-model machinery needs: everything is computed in `f64`
/// and converted back when a new grid is materialized.
pub trait GridElement: Copy + Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Declared value kind of this element type
    fn kind() -> ValueKind;

    /// Convert the cell value to `f64`
    fn to_f64(self) -> f64;

    /// Convert an `f64` back to a cell value (rounding/thresholding as needed)
    fn from_f64(v: f64) -> Self;

    /// Whether this value is a missing-data marker (NaN for floats)
    fn is_missing(self) -> bool {
        false
    }
}

impl GridElement for bool {
    fn kind() -> ValueKind {
        ValueKind::Boolean
    }

    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    fn from_f64(v: f64) -> Self {
        v >= 0.5
    }
}

macro_rules! impl_grid_element_float {
    ($t:ty) => {
        impl GridElement for $t {
            fn kind() -> ValueKind {
                ValueKind::Continuous
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(v: f64) -> Self {
                v as $t
            }

            fn is_missing(self) -> bool {
                self.is_nan()
            }
        }
    };
}

macro_rules! impl_grid_element_int {
    ($t:ty) => {
        impl GridElement for $t {
            fn kind() -> ValueKind {
                ValueKind::Continuous
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(v: f64) -> Self {
                NumCast::from(v.round()).unwrap_or(0)
            }
        }
    };
}

impl_grid_element_float!(f32);
impl_grid_element_float!(f64);
impl_grid_element_int!(i16);
impl_grid_element_int!(i32);
impl_grid_element_int!(i64);
impl_grid_element_int!(u8);
impl_grid_element_int!(u16);
impl_grid_element_int!(u32);
impl_grid_element_int!(u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(bool::kind(), ValueKind::Boolean);
        assert_eq!(f64::kind(), ValueKind::Continuous);
        assert_eq!(u32::kind(), ValueKind::Continuous);
    }

    #[test]
    fn test_bool_roundtrip() {
        assert_eq!(bool::from_f64(0.9), true);
        assert_eq!(bool::from_f64(0.1), false);
        assert_eq!(true.to_f64(), 1.0);
    }

    #[test]
    fn test_missing_markers() {
        assert!(f64::NAN.is_missing());
        assert!(!1.0_f64.is_missing());
        assert!(!true.is_missing());
        assert!(!7_u32.is_missing());
    }
}
