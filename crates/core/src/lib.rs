//! # ewsgrid Core
//!
//! Core types for the ewsgrid spatial early-warning-signal library.
//!
//! This crate provides:
//! - `Grid<T>`: generic immutable 2D grid type
//! - `GridElement` / `ValueKind`: cell-value abstraction and classification
//! - `Connectivity`: 4- or 8-neighbor adjacency rules
//! - The shared error taxonomy
//!
//! Raster I/O, plotting and classification layers live outside this
//! workspace; they consume the analysis outputs of `ewsgrid-algorithms`.

pub mod error;
pub mod grid;

pub use error::{Error, Result};
pub use grid::{Connectivity, Grid, GridElement, GridStatistics, ValueKind};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::grid::{Connectivity, Grid, GridElement, GridStatistics, ValueKind};
}
