//! Grid data structures and adjacency rules

mod element;
mod model;
mod neighborhood;

pub use element::{GridElement, ValueKind};
pub use model::{Grid, GridStatistics};
pub use neighborhood::Connectivity;
