use std::collections::BTreeSet;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// A 2D coordinate on the minesweeper board.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

/// The full state of a single cell. Only `is_revealed` cells are visible to
/// players; `is_mine` and `neighbor_mines` of hidden cells are provisional in
/// dynamic modes and may be rewritten on every placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Cell {
    pub is_mine: bool,
    pub is_revealed: bool,
    pub is_flagged: bool,
    pub neighbor_mines: u8,
}

/// A rows x cols grid of cells plus the total mine budget.
///
/// The board is a passive snapshot: the placement policy reads it and returns
/// a mine grid, and `apply_mine_grid` merges that grid back in. There is a
/// single writer per move.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Board {
    pub rows: usize,
    pub cols: usize,
    /// Total number of mines the board contains. Acts as a global constraint.
    pub mines: usize,
    pub cells: Vec<Vec<Cell>>,
}

/// Iterates the in-bounds neighbors of a coordinate, handling edges and
/// corners.
pub(crate) fn neighbors(rows: usize, cols: usize, at: Pos) -> impl Iterator<Item = Pos> {
    (-1isize..=1).flat_map(move |dr| {
        (-1isize..=1).filter_map(move |dc| {
            if dr == 0 && dc == 0 {
                return None;
            }
            let nr = at.row as isize + dr;
            let nc = at.col as isize + dc;
            if nr >= 0 && nr < rows as isize && nc >= 0 && nc < cols as isize {
                Some(Pos {
                    row: nr as usize,
                    col: nc as usize,
                })
            } else {
                None
            }
        })
    })
}

impl Board {
    pub fn new(rows: usize, cols: usize, mines: usize) -> Self {
        if mines >= rows * cols {
            panic!("Total mines must be less than the number of cells on the board.");
        }
        Board {
            rows,
            cols,
            mines,
            cells: vec![vec![Cell::default(); cols]; rows],
        }
    }

    pub fn cell(&self, at: Pos) -> &Cell {
        &self.cells[at.row][at.col]
    }

    pub fn cell_mut(&mut self, at: Pos) -> &mut Cell {
        &mut self.cells[at.row][at.col]
    }

    pub fn neighbors(&self, at: Pos) -> impl Iterator<Item = Pos> {
        neighbors(self.rows, self.cols, at)
    }

    pub fn count_neighbor_mines(&self, at: Pos) -> u8 {
        self.neighbors(at)
            .filter(|&n| self.cell(n).is_mine)
            .count() as u8
    }

    /// Recomputes `neighbor_mines` for every non-mine cell.
    pub fn recount_all(&mut self) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let at = Pos { row, col };
                if !self.cell(at).is_mine {
                    self.cells[row][col].neighbor_mines = self.count_neighbor_mines(at);
                }
            }
        }
    }

    /// Merges a boolean mine grid into every hidden cell, then recounts the
    /// neighbor labels of every cell adjacent to a change. Revealed cells are
    /// never touched. Returns the set of coordinates whose state (own mine
    /// flag or neighbor count) may have changed, for delta broadcasting.
    pub fn apply_mine_grid(&mut self, grid: &[Vec<bool>]) -> BTreeSet<Pos> {
        let mut changed = BTreeSet::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let at = Pos { row, col };
                if self.cell(at).is_revealed {
                    continue;
                }
                let old = self.cell(at).is_mine;
                let new = grid[row][col];
                if old != new {
                    self.cells[row][col].is_mine = new;
                    changed.insert(at);
                    changed.extend(self.neighbors(at));
                }
            }
        }
        for &at in &changed {
            if !self.cell(at).is_mine {
                self.cells[at.row][at.col].neighbor_mines = self.count_neighbor_mines(at);
            }
        }
        changed
    }

    /// Reveals the zero-region around an already revealed zero cell using an
    /// explicit worklist. Flagged cells and mines stay hidden. Returns the
    /// number of newly revealed cells and records them in `changed`.
    pub fn flood_reveal(&mut self, from: Pos, changed: &mut BTreeSet<Pos>) -> usize {
        let mut revealed = 0;
        let mut queue = vec![from];
        while let Some(at) = queue.pop() {
            for n in neighbors(self.rows, self.cols, at) {
                let cell = self.cell(n);
                if cell.is_revealed || cell.is_flagged || cell.is_mine {
                    continue;
                }
                self.cells[n.row][n.col].is_revealed = true;
                revealed += 1;
                changed.insert(n);
                if self.cell(n).neighbor_mines == 0 {
                    queue.push(n);
                }
            }
        }
        revealed
    }

    /// Static pre-placement for classic mode: the seed makes a board
    /// reproducible across restarts.
    pub fn place_mines_seeded(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut placed = 0;
        while placed < self.mines {
            let row = rng.random_range(0..self.rows);
            let col = rng.random_range(0..self.cols);
            if !self.cells[row][col].is_mine {
                self.cells[row][col].is_mine = true;
                placed += 1;
            }
        }
        self.recount_all();
    }

    /// Relocates any mine in the 3x3 neighborhood of the first click so the
    /// opening reveal can never explode (classic mode with quick start).
    pub fn ensure_first_click_safe(&mut self, at: Pos, rng: &mut impl Rng) {
        let mut to_move = Vec::new();
        for n in neighbors(self.rows, self.cols, at).chain(std::iter::once(at)) {
            if self.cell(n).is_mine {
                to_move.push(n);
                self.cells[n.row][n.col].is_mine = false;
            }
        }
        for _ in &to_move {
            for _attempt in 0..100 {
                let row = rng.random_range(0..self.rows);
                let col = rng.random_range(0..self.cols);
                let candidate = Pos { row, col };
                let near_click =
                    at.row.abs_diff(row) <= 1 && at.col.abs_diff(col) <= 1;
                if !near_click && !self.cell(candidate).is_mine {
                    self.cells[row][col].is_mine = true;
                    break;
                }
            }
        }
        self.recount_all();
    }

    /// Count of mines currently sitting on hidden cells.
    pub fn hidden_mines(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| !c.is_revealed && c.is_mine)
            .count()
    }
}
