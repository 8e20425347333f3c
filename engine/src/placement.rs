use rand::Rng;

use crate::board::{Board, Pos};
use crate::boundary::BoundaryMap;
use crate::solver::Solver;

/// The closed set of game modes. Placement strategy and hint behavior both
/// dispatch on this instead of the string tags the protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameMode {
    /// Mines are fixed at game start from a seed.
    Classic,
    /// Dynamic placement, with live hint overlays after every reveal.
    Training,
    /// Dynamic placement without overlays; hints are computed on loss.
    Fair,
}

/// How mines get onto the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// One static layout decided before the first reveal.
    Static,
    /// Re-derived from the clue constraints on every reveal.
    Dynamic,
}

impl GameMode {
    pub fn placement(self) -> Placement {
        match self {
            GameMode::Classic => Placement::Static,
            GameMode::Training | GameMode::Fair => Placement::Dynamic,
        }
    }

    pub fn live_hints(self) -> bool {
        matches!(self, GameMode::Training)
    }
}

/// Decides a full mine grid for a reveal at `click` in a dynamic mode.
///
/// The entire hidden region is re-decided on every call, so `remaining_mines`
/// is the full board budget; whatever provisional mines the previous call
/// left behind are rederived from the clue constraints alone. The returned
/// grid always contains exactly `remaining_mines` mines, all on hidden cells.
///
/// The clicked cell dies only when it must: a frontier click gets a safe
/// shape whenever one exists and no other provably safe cell would be wasted;
/// an off-frontier click stays empty whenever the budget and the clues allow
/// a mine-free outside region.
pub fn determine_mine_placement(
    board: &Board,
    remaining_mines: usize,
    click: Pos,
    quick_start: bool,
    rng: &mut impl Rng,
) -> Vec<Vec<bool>> {
    let first_click = board.cells.iter().flatten().all(|c| !c.is_revealed);
    if first_click && quick_start {
        return quick_start_grid(board, remaining_mines, click, rng);
    }

    let mut map = BoundaryMap::from_board(board);
    let solver = Solver::build(&mut map, remaining_mines);
    let has_safe = solver.has_safe_cells();

    let shape = match solver.boundary_index(click) {
        None => {
            // Interior of the open region, or nothing revealed yet: the
            // click is constrained only through the global budget.
            let outside_safe =
                solver.outside_is_safe() || (!has_safe && solver.outside_can_be_safe());
            if outside_safe {
                if let Some(shape) = solver.shape_with_outside_slack() {
                    return shape.grid_with_empty(click, rng);
                }
                None
            } else if let Some(shape) = solver.shape_with_outside_mine() {
                return shape.grid_with_mine(click, rng);
            } else {
                None
            }
        }
        Some(idx) => {
            let can_be_safe = solver.can_be_safe(idx);
            let can_be_dangerous = solver.can_be_dangerous(idx);
            // The click survives when it is provably safe, or when it is
            // ambiguous and no provably safe cell existed anywhere, so
            // guessing was unavoidable. An ambiguous click while a safe
            // cell was on offer takes the mine.
            if can_be_safe && (!can_be_dangerous || !has_safe) {
                solver.any_safe_shape(idx)
            } else {
                solver.any_dangerous_shape(idx)
            }
        }
    };

    if let Some(shape) = shape {
        return shape.mine_grid(rng);
    }

    log::warn!(
        "no consistent mine shape for click ({}, {}); using random fallback",
        click.row,
        click.col
    );
    random_fallback_grid(board, remaining_mines, click, rng)
}

/// Quick-start opening: the whole 3x3 neighborhood of the first click stays
/// clean so the reveal cascades.
fn quick_start_grid(
    board: &Board,
    mines: usize,
    click: Pos,
    rng: &mut impl Rng,
) -> Vec<Vec<bool>> {
    let mut grid = vec![vec![false; board.cols]; board.rows];
    let mut placed = 0;
    let max_attempts = board.rows * board.cols * 2;
    for _ in 0..max_attempts {
        if placed >= mines {
            break;
        }
        let row = rng.random_range(0..board.rows);
        let col = rng.random_range(0..board.cols);
        let near_click = click.row.abs_diff(row) <= 1 && click.col.abs_diff(col) <= 1;
        if near_click || grid[row][col] {
            continue;
        }
        grid[row][col] = true;
        placed += 1;
    }
    grid
}

/// Last-resort placement when no constrained shape is derivable: uniform
/// random over hidden non-clicked cells, bounded by a fixed attempt count.
/// Never touches revealed cells, so an inconsistent board degrades instead
/// of halting the game.
fn random_fallback_grid(
    board: &Board,
    mines: usize,
    click: Pos,
    rng: &mut impl Rng,
) -> Vec<Vec<bool>> {
    let mut grid = vec![vec![false; board.cols]; board.rows];
    let mut placed = 0;
    let max_attempts = board.rows * board.cols * 2;
    for _ in 0..max_attempts {
        if placed >= mines {
            break;
        }
        let row = rng.random_range(0..board.rows);
        let col = rng.random_range(0..board.cols);
        let at = Pos { row, col };
        if at == click || board.cell(at).is_revealed || grid[row][col] {
            continue;
        }
        grid[row][col] = true;
        placed += 1;
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grid_mines(grid: &[Vec<bool>]) -> usize {
        grid.iter().flatten().filter(|&&m| m).count()
    }

    /// [h, 1, h, 1, h] with one mine: the middle frontier cell is forced.
    fn pinned_board() -> Board {
        let mut board = Board::new(1, 5, 1);
        for col in [1, 3] {
            let cell = board.cell_mut(Pos { row: 0, col });
            cell.is_revealed = true;
            cell.neighbor_mines = 1;
        }
        board
    }

    #[test]
    fn test_first_click_on_fresh_board_is_safe() {
        // Nothing revealed, budget below the cell count: the click is spared
        // and the full budget lands elsewhere.
        let board = Board::new(5, 5, 10);
        let click = Pos { row: 2, col: 2 };
        let mut rng = StdRng::seed_from_u64(5);

        let grid = determine_mine_placement(&board, 10, click, false, &mut rng);

        assert!(!grid[2][2]);
        assert_eq!(grid_mines(&grid), 10);
    }

    #[test]
    fn test_forced_safe_frontier_click_is_spared() {
        let board = pinned_board();
        let mut rng = StdRng::seed_from_u64(2);

        let grid = determine_mine_placement(&board, 1, Pos { row: 0, col: 0 }, false, &mut rng);

        assert!(!grid[0][0]);
        assert!(grid[0][2], "the forced middle cell takes the mine");
        assert_eq!(grid_mines(&grid), 1);
    }

    #[test]
    fn test_forced_mine_frontier_click_explodes() {
        let board = pinned_board();
        let mut rng = StdRng::seed_from_u64(2);

        let grid = determine_mine_placement(&board, 1, Pos { row: 0, col: 2 }, false, &mut rng);

        assert!(grid[0][2]);
        assert_eq!(grid_mines(&grid), 1);
    }

    #[test]
    fn test_ambiguous_click_survives_when_no_safe_cell_exists() {
        // [h, 1, h]: either flank may hold the mine and neither is provably
        // safe, so the clicked one is kept clean and the other takes it.
        let mut board = Board::new(1, 3, 1);
        let cell = board.cell_mut(Pos { row: 0, col: 1 });
        cell.is_revealed = true;
        cell.neighbor_mines = 1;
        let mut rng = StdRng::seed_from_u64(8);

        let grid = determine_mine_placement(&board, 1, Pos { row: 0, col: 0 }, false, &mut rng);

        assert!(!grid[0][0]);
        assert!(grid[0][2]);
    }

    #[test]
    fn test_placement_matches_existing_labels() {
        // Whatever grid comes back, recounting neighbors must reproduce
        // every revealed label.
        let board = pinned_board();
        let mut rng = StdRng::seed_from_u64(13);
        let grid = determine_mine_placement(&board, 1, Pos { row: 0, col: 4 }, false, &mut rng);

        let mut check = board.clone();
        check.apply_mine_grid(&grid);
        for col in [1, 3] {
            let at = Pos { row: 0, col };
            assert_eq!(check.cell(at).neighbor_mines, check.count_neighbor_mines(at));
        }
    }

    #[test]
    fn test_quick_start_opens_a_zero() {
        let board = Board::new(9, 9, 10);
        let click = Pos { row: 4, col: 4 };
        let mut rng = StdRng::seed_from_u64(21);

        let grid = determine_mine_placement(&board, 10, click, true, &mut rng);

        assert_eq!(grid_mines(&grid), 10);
        for dr in -1isize..=1 {
            for dc in -1isize..=1 {
                let row = (click.row as isize + dr) as usize;
                let col = (click.col as isize + dc) as usize;
                assert!(!grid[row][col], "quick start left a mine near the click");
            }
        }
    }

    #[test]
    fn test_off_frontier_click_dies_when_budget_fills_the_outside() {
        // 1x4, (0,0) revealed as 1, budget 3: the frontier cell is forced
        // and both outside cells must hold the rest, so a far click is
        // necessarily a mine.
        let mut board = Board::new(1, 4, 3);
        let cell = board.cell_mut(Pos { row: 0, col: 0 });
        cell.is_revealed = true;
        cell.neighbor_mines = 1;
        let mut rng = StdRng::seed_from_u64(4);

        let grid = determine_mine_placement(&board, 3, Pos { row: 0, col: 3 }, false, &mut rng);

        assert!(grid[0][3], "outside click must take a mine");
        assert_eq!(grid_mines(&grid), 3);
    }

    #[test]
    fn test_off_frontier_click_spared_when_outside_has_slack() {
        // Same layout with budget 2: one mine is forced on the frontier and
        // the other fits in either outside cell, so the click is spared.
        let mut board = Board::new(1, 4, 2);
        let cell = board.cell_mut(Pos { row: 0, col: 0 });
        cell.is_revealed = true;
        cell.neighbor_mines = 1;
        let mut rng = StdRng::seed_from_u64(4);

        let grid = determine_mine_placement(&board, 2, Pos { row: 0, col: 3 }, false, &mut rng);

        assert!(!grid[0][3]);
        assert!(grid[0][1], "the forced frontier mine stays");
        assert_eq!(grid_mines(&grid), 2);
    }

    #[test]
    fn test_mode_dispatch() {
        assert_eq!(GameMode::Classic.placement(), Placement::Static);
        assert_eq!(GameMode::Training.placement(), Placement::Dynamic);
        assert_eq!(GameMode::Fair.placement(), Placement::Dynamic);
        assert!(GameMode::Training.live_hints());
        assert!(!GameMode::Fair.live_hints());
    }
}
