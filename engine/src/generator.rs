use anyhow::bail;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::board::{Pos, neighbors};
use crate::boundary::BoundaryMap;
use crate::solver::Solver;

/// Checks whether a fully materialized mine layout admits a logical solving
/// path from its first mine-free cell: the opening is flood-revealed, the
/// frontier classified, and the board accepted iff some frontier cell is
/// provably safe (or nothing is left to deduce).
pub fn check_solvability(mines: &[Vec<bool>], budget: usize) -> bool {
    let rows = mines.len();
    let cols = if rows > 0 { mines[0].len() } else { 0 };
    if rows == 0 || cols == 0 {
        return false;
    }

    let Some(opening) = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| Pos { row, col }))
        .find(|&at| !mines[at.row][at.col])
    else {
        return false;
    };

    // Flood-reveal the opening region, recording each label as it opens.
    let mut revealed = vec![vec![false; cols]; rows];
    let mut labels = Vec::new();
    let mut stack = vec![opening];
    while let Some(at) = stack.pop() {
        if revealed[at.row][at.col] || mines[at.row][at.col] {
            continue;
        }
        revealed[at.row][at.col] = true;
        let count = neighbors(rows, cols, at)
            .filter(|n| mines[n.row][n.col])
            .count() as u8;
        labels.push((at, count));
        if count == 0 {
            stack.extend(neighbors(rows, cols, at));
        }
    }

    let mut map = BoundaryMap::from_labels(rows, cols, labels);
    let solver = Solver::build(&mut map, budget);
    solver.has_safe_cells() || solver.frontier().is_empty()
}

/// Generates a random mine layout and rejects it until one passes
/// `check_solvability`, so games can start without forcing a guess.
pub fn generate_solvable_board(
    rows: usize,
    cols: usize,
    mines: usize,
    max_attempts: usize,
    rng: &mut impl Rng,
) -> anyhow::Result<Vec<Vec<bool>>> {
    let mut positions: Vec<usize> = (0..rows * cols).collect();

    for attempt in 0..max_attempts {
        let mut grid = vec![vec![false; cols]; rows];
        positions.shuffle(rng);
        for &p in positions.iter().take(mines) {
            grid[p / cols][p % cols] = true;
        }

        if check_solvability(&grid, mines) {
            log::debug!("solvable board found on attempt {}", attempt + 1);
            return Ok(grid);
        }
    }

    bail!("no solvable {rows}x{cols} board with {mines} mines in {max_attempts} attempts")
}
