//! Cell adjacency rules

/// Adjacency rule connecting a cell to its neighbors.
///
/// Controls both patch detection and spatial-autocorrelation weights.
/// Edges are hard boundaries; no periodic wrap-around is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Von Neumann neighborhood: N, S, E, W
    #[default]
    Four,
    /// Moore neighborhood: the four cardinals plus diagonals
    Eight,
}

const FOUR_OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const EIGHT_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Connectivity {
    /// Relative (row, col) offsets of the neighbors, center excluded
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &FOUR_OFFSETS,
            Connectivity::Eight => &EIGHT_OFFSETS,
        }
    }

    /// Maximum number of neighbors under this rule
    pub fn degree(&self) -> usize {
        self.offsets().len()
    }

    /// Iterate over the in-bounds neighbor coordinates of (row, col)
    /// in a grid of the given shape.
    pub fn neighbors(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.offsets().iter().filter_map(move |&(dr, dc)| {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                Some((nr as usize, nc as usize))
            } else {
                None
            }
        })
    }
}
