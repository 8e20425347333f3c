use crate::board::{Board, Pos, neighbors};

/// Tracks revealed-cell labels and derives the frontier: the hidden cells
/// adjacent to at least one revealed cell. Each frontier cell gets a stable
/// index that doubles as its solver variable.
///
/// A map is rebuilt for every computation and discarded afterwards; frontier
/// indices must never be reused across board mutations.
pub struct BoundaryMap {
    rows: usize,
    cols: usize,
    /// `None` for hidden cells, otherwise the revealed neighbor-mine count.
    labels: Vec<Vec<Option<u8>>>,
    frontier: Vec<Pos>,
    /// Reverse lookup from coordinate to frontier index.
    index: Vec<Vec<Option<usize>>>,
    /// Forced classifications: `Some(true)` = forced mine, `Some(false)` =
    /// forced safe. Populated by trivial deduction here and by the solver as
    /// it discovers forced values.
    cache: Vec<Vec<Option<bool>>>,
    /// Hidden cells that are neither revealed nor on the frontier.
    outside: usize,
}

impl BoundaryMap {
    pub fn new(rows: usize, cols: usize) -> Self {
        BoundaryMap {
            rows,
            cols,
            labels: vec![vec![None; cols]; rows],
            frontier: Vec::new(),
            index: vec![vec![None; cols]; rows],
            cache: vec![vec![None; cols]; rows],
            outside: rows * cols,
        }
    }

    /// Builds a map from a batch of labels with a single frontier recompute.
    pub fn from_labels(
        rows: usize,
        cols: usize,
        labels: impl IntoIterator<Item = (Pos, u8)>,
    ) -> Self {
        let mut map = Self::new(rows, cols);
        for (at, label) in labels {
            map.labels[at.row][at.col] = Some(label);
        }
        map.recompute();
        map
    }

    /// Builds a map from every revealed cell of a board snapshot.
    pub fn from_board(board: &Board) -> Self {
        Self::from_labels(
            board.rows,
            board.cols,
            board.cells.iter().enumerate().flat_map(|(row, cells)| {
                cells.iter().enumerate().filter_map(move |(col, cell)| {
                    cell.is_revealed
                        .then_some((Pos { row, col }, cell.neighbor_mines))
                })
            }),
        )
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Marks a cell revealed with its neighbor-mine count and recomputes the
    /// frontier and trivial cache. Cost is proportional to the board size,
    /// which is fine because it only runs on demand, not per frame.
    pub fn set_label(&mut self, at: Pos, label: u8) {
        self.labels[at.row][at.col] = Some(label);
        self.recompute();
    }

    pub fn label(&self, at: Pos) -> Option<u8> {
        self.labels[at.row][at.col]
    }

    pub fn frontier(&self) -> &[Pos] {
        &self.frontier
    }

    pub fn boundary_index(&self, at: Pos) -> Option<usize> {
        self.index[at.row][at.col]
    }

    /// True for hidden cells that are not on the frontier.
    pub fn is_outside(&self, at: Pos) -> bool {
        self.labels[at.row][at.col].is_none() && self.index[at.row][at.col].is_none()
    }

    pub fn outside_count(&self) -> usize {
        self.outside
    }

    pub fn cached(&self, idx: usize) -> Option<bool> {
        let at = self.frontier[idx];
        self.cache[at.row][at.col]
    }

    pub fn set_cached(&mut self, idx: usize, forced_mine: bool) {
        let at = self.frontier[idx];
        self.cache[at.row][at.col] = Some(forced_mine);
    }

    /// Clears all forced classifications, e.g. when re-deriving from scratch
    /// for a solvability check on a freshly generated board.
    pub fn reset_cache(&mut self) {
        for row in &mut self.cache {
            row.fill(None);
        }
    }

    fn recompute(&mut self) {
        self.frontier.clear();
        for row in &mut self.index {
            row.fill(None);
        }

        let mut revealed = 0;
        for row in 0..self.rows {
            for col in 0..self.cols {
                let Some(label) = self.labels[row][col] else {
                    continue;
                };
                revealed += 1;

                let mut adjacent = Vec::new();
                for n in neighbors(self.rows, self.cols, Pos { row, col }) {
                    if self.labels[n.row][n.col].is_some() {
                        continue;
                    }
                    let idx = match self.index[n.row][n.col] {
                        Some(idx) => idx,
                        None => {
                            let idx = self.frontier.len();
                            self.index[n.row][n.col] = Some(idx);
                            self.frontier.push(n);
                            idx
                        }
                    };
                    adjacent.push(idx);
                }

                // Trivial deductions, sound by counting: a label that equals
                // its hidden-neighbor count pins every one of them as a mine,
                // and a zero label pins every hidden neighbor as safe.
                if adjacent.len() == label as usize {
                    for &idx in &adjacent {
                        self.set_cached(idx, true);
                    }
                } else if label == 0 {
                    for &idx in &adjacent {
                        self.set_cached(idx, false);
                    }
                }
            }
        }

        self.outside = self.rows * self.cols - revealed - self.frontier.len();
    }
}
