use crate::board::{Board, Pos};
use crate::boundary::BoundaryMap;
use crate::solver::Solver;

/// What the solver can prove about a single frontier cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Deduction {
    /// Every consistent assignment leaves this cell mine-free.
    Safe,
    /// Every consistent assignment mines this cell.
    Mine,
    /// Consistent assignments exist both ways.
    Unknown,
}

/// One classified frontier cell, for hint overlay rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CellHint {
    pub pos: Pos,
    pub deduction: Deduction,
}

/// Classifies every frontier cell of the board snapshot. Cells the solver
/// finds impossible in both directions (only reachable from an already
/// inconsistent board) are skipped rather than reported.
pub fn classify_frontier(board: &Board, mines: usize) -> Vec<CellHint> {
    let mut map = BoundaryMap::from_board(board);
    let solver = Solver::build(&mut map, mines);

    let mut hints = Vec::new();
    for (i, &pos) in solver.frontier().iter().enumerate() {
        let deduction = match (solver.can_be_dangerous(i), solver.can_be_safe(i)) {
            (true, true) => Deduction::Unknown,
            (true, false) => Deduction::Mine,
            (false, true) => Deduction::Safe,
            (false, false) => continue,
        };
        hints.push(CellHint { pos, deduction });
    }
    hints
}

/// The frontier cells that are provably mine-free, for no-guess assistance.
pub fn safe_cells(board: &Board, mines: usize) -> Vec<Pos> {
    let mut map = BoundaryMap::from_board(board);
    let solver = Solver::build(&mut map, mines);

    solver
        .frontier()
        .iter()
        .enumerate()
        .filter(|&(i, _)| !solver.can_be_dangerous(i))
        .map(|(_, &pos)| pos)
        .collect()
}
