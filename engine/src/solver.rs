use rand::Rng;
use rand::seq::SliceRandom;

use crate::board::{Pos, neighbors};
use crate::boundary::BoundaryMap;
use crate::sat::{Lit, Sat, Solution, counter_at_least, counter_at_most};

/// Classifies every frontier cell of a [`BoundaryMap`] as can-be-safe /
/// can-be-dangerous by probing both polarities against the clue constraints
/// and the global mine budget, and hands out concrete mine shapes consistent
/// with everything known.
///
/// A solver is built fresh for every computation. Forced values it discovers
/// are written back into the map's cache so an immediately following
/// computation (say, a hint request right after a reveal) skips re-solving
/// them.
pub struct Solver<'a> {
    map: &'a mut BoundaryMap,
    /// Frontier size; frontier index i is SAT variable i.
    n: usize,
    /// Lower bound on frontier mines: budget minus outside capacity. Kept
    /// unclamped so the outside-region queries stay exact when the frontier
    /// is small or empty.
    min_mines: isize,
    /// Remaining mine budget over all hidden cells.
    max_mines: usize,
    /// Per-clue labels, already reduced by cached forced mines.
    labels: Vec<isize>,
    /// The uncached frontier variables each clue constrains.
    label_vars: Vec<Vec<usize>>,
    cache: Vec<Option<bool>>,
    sat: Sat,
    can_be_safe: Vec<bool>,
    can_be_dangerous: Vec<bool>,
    uncached: Vec<usize>,
    num_cached_true: usize,
    counter: Vec<usize>,
}

impl<'a> Solver<'a> {
    /// Assembles the constraints for the map's current state and runs the
    /// classification.
    pub fn build(map: &'a mut BoundaryMap, max_mines: usize) -> Self {
        let n = map.frontier().len();
        let min_mines = max_mines as isize - map.outside_count() as isize;

        let mut cache = Vec::with_capacity(n);
        let mut uncached = Vec::new();
        let mut num_cached_true = 0;
        for i in 0..n {
            let forced = map.cached(i);
            cache.push(forced);
            match forced {
                None => uncached.push(i),
                Some(true) => num_cached_true += 1,
                Some(false) => {}
            }
        }

        // One constraint per revealed cell that still touches the frontier,
        // with cached forced mines already subtracted from its label.
        let mut labels = Vec::new();
        let mut label_vars = Vec::new();
        for row in 0..map.rows() {
            for col in 0..map.cols() {
                let at = Pos { row, col };
                let Some(label) = map.label(at) else { continue };
                let vars: Vec<usize> = neighbors(map.rows(), map.cols(), at)
                    .filter_map(|n| map.boundary_index(n))
                    .collect();
                if vars.is_empty() {
                    continue;
                }
                let mut adjusted = label as isize;
                let mut unresolved = Vec::new();
                for &v in &vars {
                    match cache[v] {
                        None => unresolved.push(v),
                        Some(true) => adjusted -= 1,
                        Some(false) => {}
                    }
                }
                labels.push(adjusted);
                label_vars.push(unresolved);
            }
        }

        let mut solver = Solver {
            map,
            n,
            min_mines,
            max_mines,
            labels,
            label_vars,
            cache,
            sat: Sat::new(n),
            can_be_safe: vec![false; n],
            can_be_dangerous: vec![false; n],
            uncached,
            num_cached_true,
            counter: Vec::new(),
        };
        solver.run();
        solver
    }

    /// Asserts every constraint family and classifies each frontier cell by
    /// probing both polarities.
    fn run(&mut self) {
        for (label, vars) in self.labels.iter().zip(&self.label_vars) {
            if vars.is_empty() {
                continue;
            }
            self.sat.assert_at_least(vars, *label);
            self.sat.assert_at_most(vars, *label);
        }

        for i in 0..self.n {
            match self.cache[i] {
                Some(true) => self.sat.assert(&[Lit::pos(i)]),
                Some(false) => self.sat.assert(&[Lit::neg(i)]),
                None => {}
            }
        }

        if !self.uncached.is_empty() {
            self.counter = self.sat.add_counter(&self.uncached.clone());
            let min_remaining = self.min_remaining();
            if min_remaining > 0 {
                let clauses = counter_at_least(&self.counter, min_remaining);
                self.sat.assert_all(&clauses);
            }
            let max_remaining = self.max_remaining();
            if max_remaining < 0 {
                // More forced mines than budget: the board was already
                // inconsistent, make the contradiction explicit.
                self.sat.assert(&[]);
            } else if (max_remaining as usize) < self.counter.len() {
                let clauses = counter_at_most(&self.counter, max_remaining);
                self.sat.assert_all(&clauses);
            }
        }

        for i in 0..self.n {
            if let Some(mine) = self.cache[i] {
                self.can_be_safe[i] = !mine;
                self.can_be_dangerous[i] = mine;
                continue;
            }

            // A witness from an earlier probe may have answered one or both
            // polarities already; the overlay is monotonic, so skip those.
            if !self.can_be_safe[i] {
                match self.sat.solve_with(&[vec![Lit::neg(i)]]) {
                    Solution::Model(model) => {
                        self.can_be_safe[i] = true;
                        self.observe(&model);
                    }
                    Solution::Unsat => {}
                    Solution::Aborted => {
                        log::warn!("safe probe for frontier cell {i} ran out of budget");
                        self.can_be_safe[i] = true;
                        self.can_be_dangerous[i] = true;
                        continue;
                    }
                }
            }
            if !self.can_be_dangerous[i] {
                match self.sat.solve_with(&[vec![Lit::pos(i)]]) {
                    Solution::Model(model) => {
                        self.can_be_dangerous[i] = true;
                        self.observe(&model);
                    }
                    Solution::Unsat => {}
                    Solution::Aborted => {
                        log::warn!("mine probe for frontier cell {i} ran out of budget");
                        self.can_be_safe[i] = true;
                        self.can_be_dangerous[i] = true;
                        continue;
                    }
                }
            }

            if self.can_be_dangerous[i] && !self.can_be_safe[i] {
                self.cache[i] = Some(true);
                self.map.set_cached(i, true);
            } else if self.can_be_safe[i] && !self.can_be_dangerous[i] {
                self.cache[i] = Some(false);
                self.map.set_cached(i, false);
            }
        }
    }

    /// Folds a witness into the running overlay: every variable the model
    /// determines answers that polarity for its cell, for free.
    fn observe(&mut self, model: &[bool]) {
        for i in 0..self.n {
            if model[i] {
                self.can_be_dangerous[i] = true;
            } else {
                self.can_be_safe[i] = true;
            }
        }
    }

    fn min_remaining(&self) -> isize {
        self.min_mines - self.num_cached_true as isize
    }

    fn max_remaining(&self) -> isize {
        self.max_mines as isize - self.num_cached_true as isize
    }

    pub fn frontier(&self) -> &[Pos] {
        self.map.frontier()
    }

    pub fn boundary_index(&self, at: Pos) -> Option<usize> {
        self.map.boundary_index(at)
    }

    pub fn can_be_safe(&self, idx: usize) -> bool {
        idx < self.n && self.can_be_safe[idx]
    }

    pub fn can_be_dangerous(&self, idx: usize) -> bool {
        idx < self.n && self.can_be_dangerous[idx]
    }

    /// True iff some frontier cell is provably mine-free.
    pub fn has_safe_cells(&self) -> bool {
        (0..self.n).any(|i| !self.can_be_dangerous[i])
    }

    /// True iff every remaining mine provably sits on the frontier, leaving
    /// the outside region mine-free.
    pub fn outside_is_safe(&self) -> bool {
        self.n >= self.max_mines
            && self
                .sat
                .solve_with(&counter_at_most(&self.counter, self.max_remaining() - 1))
                == Solution::Unsat
    }

    /// True iff some consistent assignment leaves at least one outside cell
    /// empty, i.e. an off-frontier click can still be made safe.
    pub fn outside_can_be_safe(&self) -> bool {
        if self.min_mines < 0 {
            return true;
        }
        matches!(
            self.sat
                .solve_with(&counter_at_least(&self.counter, self.min_remaining() + 1)),
            Solution::Model(_)
        )
    }

    /// A shape with frontier cell `idx` mine-free, if one exists.
    pub fn any_safe_shape(&self, idx: usize) -> Option<MineShape<'_>> {
        self.shape(self.sat.solve_with(&[vec![Lit::neg(idx)]]))
    }

    /// A shape with frontier cell `idx` mined, if one exists.
    pub fn any_dangerous_shape(&self, idx: usize) -> Option<MineShape<'_>> {
        self.shape(self.sat.solve_with(&[vec![Lit::pos(idx)]]))
    }

    /// A shape that leaves at least one outside cell empty.
    pub fn shape_with_outside_slack(&self) -> Option<MineShape<'_>> {
        let extra = counter_at_least(&self.counter, self.min_remaining() + 1);
        self.shape(self.sat.solve_with(&extra))
    }

    /// A shape that leaves at least one mine for the outside region.
    pub fn shape_with_outside_mine(&self) -> Option<MineShape<'_>> {
        let extra = counter_at_most(&self.counter, self.max_remaining() - 1);
        self.shape(self.sat.solve_with(&extra))
    }

    /// Any consistent shape at all.
    pub fn any_shape(&self) -> Option<MineShape<'_>> {
        self.shape(self.sat.solve())
    }

    fn shape(&self, solution: Solution) -> Option<MineShape<'_>> {
        let model = solution.model()?;
        let mines: Vec<bool> = model[..self.n].to_vec();
        let placed = mines.iter().filter(|&&m| m).count();
        Some(MineShape {
            map: &*self.map,
            mines,
            remaining: self.max_mines.saturating_sub(placed),
        })
    }
}

/// One concrete, fully-determined mine assignment for the frontier, plus the
/// count of mines still owed to the outside region. Turning it into a full
/// grid fills the outside uniformly at random.
pub struct MineShape<'m> {
    map: &'m BoundaryMap,
    mines: Vec<bool>,
    remaining: usize,
}

impl MineShape<'_> {
    pub fn mine_grid(&self, rng: &mut impl Rng) -> Vec<Vec<bool>> {
        self.fill(None, false, rng)
    }

    /// Full grid with a mine forced at `at` (an outside cell).
    pub fn grid_with_mine(&self, at: Pos, rng: &mut impl Rng) -> Vec<Vec<bool>> {
        self.fill(Some(at), true, rng)
    }

    /// Full grid guaranteed empty at `at` (an outside cell).
    pub fn grid_with_empty(&self, at: Pos, rng: &mut impl Rng) -> Vec<Vec<bool>> {
        self.fill(Some(at), false, rng)
    }

    fn fill(&self, except: Option<Pos>, except_is_mine: bool, rng: &mut impl Rng) -> Vec<Vec<bool>> {
        let mut grid = vec![vec![false; self.map.cols()]; self.map.rows()];
        for (i, &at) in self.map.frontier().iter().enumerate() {
            if self.mines[i] {
                grid[at.row][at.col] = true;
            }
        }

        let mut remaining = self.remaining;
        if let Some(at) = except {
            if except_is_mine {
                grid[at.row][at.col] = true;
                remaining = remaining.saturating_sub(1);
            }
        }

        if remaining > 0 {
            let mut candidates: Vec<Pos> = Vec::new();
            for row in 0..self.map.rows() {
                for col in 0..self.map.cols() {
                    let at = Pos { row, col };
                    if self.map.is_outside(at) && except != Some(at) {
                        candidates.push(at);
                    }
                }
            }
            candidates.shuffle(rng);
            for at in candidates.into_iter().take(remaining) {
                grid[at.row][at.col] = true;
            }
        }

        grid
    }
}
