pub mod board;
pub mod boundary;
pub mod game;
pub mod generator;
pub mod hints;
pub mod placement;
pub mod sat;
pub mod solver;

pub use board::{Board, Cell, Pos};
pub use boundary::BoundaryMap;
pub use game::{Game, GameState, HINT_LIMIT};
pub use generator::{check_solvability, generate_solvable_board};
pub use hints::{CellHint, Deduction, classify_frontier, safe_cells};
pub use placement::{GameMode, Placement, determine_mine_placement};
pub use solver::{MineShape, Solver};
