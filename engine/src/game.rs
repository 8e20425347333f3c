use std::collections::BTreeSet;

use anyhow::bail;
use rand::Rng;

use crate::board::{Board, Pos};
use crate::hints::{self, CellHint};
use crate::placement::{GameMode, Placement, determine_mine_placement};

/// Current status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// Hints a player may spend per game.
pub const HINT_LIMIT: u32 = 3;

/// The playable game: a board plus mode flags and win/lose bookkeeping.
///
/// This layer stays thin on purpose: it merges the placement policy's grid,
/// reveals cells, and counts toward the win condition. Everything clever
/// lives underneath it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Game {
    pub board: Board,
    pub mode: GameMode,
    /// First reveal is guaranteed to open a zero region.
    pub quick_start: bool,
    /// Clicking a satisfied number reveals its remaining neighbors.
    pub chording: bool,
    pub state: GameState,
    pub revealed: usize,
    pub hints_used: u32,
}

impl Game {
    /// In classic mode the seed fixes the static layout; dynamic modes leave
    /// the board empty and decide mines click by click.
    pub fn new(rows: usize, cols: usize, mines: usize, mode: GameMode, seed: u64) -> Self {
        let mut board = Board::new(rows, cols, mines);
        if mode.placement() == Placement::Static {
            board.place_mines_seeded(seed);
        }
        Game {
            board,
            mode,
            quick_start: false,
            chording: false,
            state: GameState::Playing,
            revealed: 0,
            hints_used: 0,
        }
    }

    /// The primary entry point for a player click.
    ///
    /// Returns `Ok(true)` when the player survives the reveal and `Ok(false)`
    /// when they hit a mine. Flagged and already revealed cells are ignored
    /// (unless chording applies).
    pub fn reveal_cell(&mut self, at: Pos, rng: &mut impl Rng) -> anyhow::Result<bool> {
        if self.state != GameState::Playing {
            bail!("game_ended");
        }

        let cell = *self.board.cell(at);
        if cell.is_flagged {
            return Ok(true);
        }
        if cell.is_revealed {
            if self.chording && cell.neighbor_mines > 0 {
                return self.chord(at);
            }
            return Ok(true);
        }

        let first_click = self.revealed == 0;
        match self.mode.placement() {
            Placement::Dynamic => {
                // The board votes on whether this click dies; the grid is
                // authoritative for the whole hidden region.
                let grid = determine_mine_placement(
                    &self.board,
                    self.board.mines,
                    at,
                    self.quick_start,
                    rng,
                );
                self.board.apply_mine_grid(&grid);
            }
            Placement::Static => {
                if first_click && self.quick_start {
                    self.board.ensure_first_click_safe(at, rng);
                }
            }
        }

        self.reveal_and_cascade(at)
    }

    /// Reveals one cell, cascades zeros, and updates the game state.
    fn reveal_and_cascade(&mut self, at: Pos) -> anyhow::Result<bool> {
        self.board.cell_mut(at).is_revealed = true;
        self.revealed += 1;

        if self.board.cell(at).is_mine {
            self.state = GameState::Lost;
            if self.mode == GameMode::Fair {
                // Post-mortem overlay: show what was actually provable.
                log::debug!("loss on ({}, {}); hints available", at.row, at.col);
            }
            return Ok(false);
        }

        if self.board.cell(at).neighbor_mines == 0 {
            let mut changed = BTreeSet::new();
            self.revealed += self.board.flood_reveal(at, &mut changed);
        }

        if self.revealed == self.board.rows * self.board.cols - self.board.mines {
            self.state = GameState::Won;
        }
        Ok(true)
    }

    /// Chording: when the flags around a revealed number account for its
    /// label, open every other hidden neighbor.
    fn chord(&mut self, at: Pos) -> anyhow::Result<bool> {
        let flagged = self
            .board
            .neighbors(at)
            .filter(|&n| self.board.cell(n).is_flagged)
            .count() as u8;
        if flagged != self.board.cell(at).neighbor_mines {
            return Ok(true);
        }

        let targets: Vec<Pos> = self
            .board
            .neighbors(at)
            .filter(|&n| {
                let cell = self.board.cell(n);
                !cell.is_revealed && !cell.is_flagged
            })
            .collect();
        for n in targets {
            if self.board.cell(n).is_revealed {
                continue; // a cascade from an earlier neighbor got here first
            }
            if !self.reveal_and_cascade(n)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn toggle_flag(&mut self, at: Pos) {
        let cell = self.board.cell_mut(at);
        if !cell.is_revealed {
            cell.is_flagged = !cell.is_flagged;
        }
    }

    /// Spends a hint on a hidden cell: a mine gets flagged, anything else is
    /// revealed. No-op once the hint budget is gone.
    pub fn use_hint(&mut self, at: Pos) -> anyhow::Result<bool> {
        if self.state != GameState::Playing {
            bail!("game_ended");
        }
        if self.hints_used >= HINT_LIMIT {
            return Ok(true);
        }
        let cell = *self.board.cell(at);
        if cell.is_revealed || cell.is_flagged {
            return Ok(true);
        }

        self.hints_used += 1;
        if cell.is_mine {
            self.board.cell_mut(at).is_flagged = true;
            return Ok(true);
        }
        self.reveal_and_cascade(at)
    }

    /// Frontier classification for overlay rendering.
    pub fn cell_hints(&self) -> Vec<CellHint> {
        hints::classify_frontier(&self.board, self.board.mines)
    }

    /// The provably safe frontier cells.
    pub fn safe_cells(&self) -> Vec<Pos> {
        hints::safe_cells(&self.board, self.board.mines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_first_dynamic_click_is_safe() {
        let mut game = Game::new(5, 5, 10, GameMode::Training, 0);
        let mut rng = StdRng::seed_from_u64(1);

        let survived = game.reveal_cell(Pos { row: 2, col: 2 }, &mut rng).unwrap();

        assert!(survived);
        assert_eq!(game.state, GameState::Playing);
        assert!(game.board.cell(Pos { row: 2, col: 2 }).is_revealed);
        assert_eq!(game.board.hidden_mines(), 10);
    }

    #[test]
    fn test_dynamic_placement_never_contradicts_labels() {
        // Every revealed label must keep matching a fresh recount after
        // each dynamic placement.
        let mut game = Game::new(6, 6, 8, GameMode::Fair, 0);
        let mut rng = StdRng::seed_from_u64(14);

        for &(row, col) in &[(0, 0), (2, 3), (5, 5), (3, 1)] {
            if game.state != GameState::Playing {
                break;
            }
            let _ = game.reveal_cell(Pos { row, col }, &mut rng).unwrap();
            for r in 0..6 {
                for c in 0..6 {
                    let at = Pos { row: r, col: c };
                    let cell = game.board.cell(at);
                    if cell.is_revealed && !cell.is_mine {
                        assert_eq!(
                            cell.neighbor_mines,
                            game.board.count_neighbor_mines(at),
                            "label mismatch at ({r}, {c})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_reveal_after_game_over_fails() {
        let mut game = Game::new(3, 3, 1, GameMode::Training, 0);
        game.state = GameState::Lost;
        let mut rng = StdRng::seed_from_u64(0);
        assert!(game.reveal_cell(Pos { row: 0, col: 0 }, &mut rng).is_err());
    }

    #[test]
    fn test_flagged_cell_is_not_revealed() {
        let mut game = Game::new(3, 3, 1, GameMode::Training, 0);
        let mut rng = StdRng::seed_from_u64(0);
        game.toggle_flag(Pos { row: 1, col: 1 });

        let survived = game.reveal_cell(Pos { row: 1, col: 1 }, &mut rng).unwrap();

        assert!(survived);
        assert!(!game.board.cell(Pos { row: 1, col: 1 }).is_revealed);
    }

    #[test]
    fn test_classic_win_by_revealing_all_safe_cells() {
        let mut game = Game::new(2, 2, 1, GameMode::Classic, 7);
        let mut rng = StdRng::seed_from_u64(0);

        for row in 0..2 {
            for col in 0..2 {
                let at = Pos { row, col };
                if !game.board.cell(at).is_mine {
                    assert!(game.reveal_cell(at, &mut rng).unwrap());
                }
            }
        }
        assert_eq!(game.state, GameState::Won);
    }

    #[test]
    fn test_classic_mine_click_loses() {
        let mut game = Game::new(3, 3, 2, GameMode::Classic, 9);
        let mut rng = StdRng::seed_from_u64(0);

        let mine = (0..3)
            .flat_map(|row| (0..3).map(move |col| Pos { row, col }))
            .find(|&at| game.board.cell(at).is_mine)
            .expect("a mine was placed");

        assert!(!game.reveal_cell(mine, &mut rng).unwrap());
        assert_eq!(game.state, GameState::Lost);
    }

    #[test]
    fn test_chording_reveals_satisfied_neighbors() {
        // Hand-built classic board: one mine, its neighbor revealed as 1 and
        // the mine flagged; chording the 1 opens the rest of the board.
        let mut game = Game::new(2, 3, 1, GameMode::Classic, 0);
        game.chording = true;
        for row in &mut game.board.cells {
            for cell in row.iter_mut() {
                *cell = Default::default();
            }
        }
        game.board.cell_mut(Pos { row: 0, col: 0 }).is_mine = true;
        game.board.recount_all();
        game.board.cell_mut(Pos { row: 0, col: 1 }).is_revealed = true;
        game.revealed = 1;
        game.toggle_flag(Pos { row: 0, col: 0 });

        let mut rng = StdRng::seed_from_u64(0);
        let survived = game.reveal_cell(Pos { row: 0, col: 1 }, &mut rng).unwrap();

        assert!(survived);
        assert!(game.board.cell(Pos { row: 1, col: 1 }).is_revealed);
        assert!(game.board.cell(Pos { row: 0, col: 2 }).is_revealed);
        assert!(!game.board.cell(Pos { row: 0, col: 0 }).is_revealed);
        assert_eq!(game.state, GameState::Won);
    }

    #[test]
    fn test_hint_budget_is_enforced() {
        let mut game = Game::new(4, 4, 2, GameMode::Training, 0);
        // Materialize some mines first so hints act on a real layout.
        let mut rng = StdRng::seed_from_u64(3);
        game.reveal_cell(Pos { row: 0, col: 0 }, &mut rng).unwrap();

        let mut spent = 0;
        for row in 0..4 {
            for col in 0..4 {
                let at = Pos { row, col };
                if game.state != GameState::Playing || game.hints_used >= HINT_LIMIT {
                    continue;
                }
                if !game.board.cell(at).is_revealed && !game.board.cell(at).is_flagged {
                    game.use_hint(at).unwrap();
                    spent += 1;
                }
                if spent >= 5 {
                    break;
                }
            }
        }
        assert!(game.hints_used <= HINT_LIMIT);
    }

    #[test]
    fn test_training_hints_after_reveal() {
        let mut game = Game::new(5, 5, 5, GameMode::Training, 0);
        let mut rng = StdRng::seed_from_u64(6);
        game.reveal_cell(Pos { row: 2, col: 2 }, &mut rng).unwrap();

        // Every hint refers to a hidden frontier cell of the current board.
        for hint in game.cell_hints() {
            assert!(!game.board.cell(hint.pos).is_revealed);
        }
    }
}
