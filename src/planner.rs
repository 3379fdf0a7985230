//! Placement planner for the automated player.
//!
//! Exhaustive search over every rotation and column of the current piece, scored by a
//! weighted board heuristic, plus a coarse look-ahead over the next piece:
//!
//! 1. Drop the rotated shape from the top row of a scratch board until it rests.
//! 2. Score the resulting board (row clears, heights, holes, transitions, bumpiness, wells).
//! 3. Collapse full rows and take the best follow-up score of the next piece over every
//!    second column; half of it is added to the first score.
//!
//! The live board is never touched; [`Planner::decide`] always returns a placement.

use crate::board::{Anchor, BOARD_HEIGHT, BOARD_WIDTH, Board, Cell};
use crate::pieces::{PieceKind, Shape, shape_width};

/// Column step used by the look-ahead search.
const FOLLOW_UP_COLUMN_STEP: usize = 2;

/// Target of a planning decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub rotation: usize,
    pub column: i32,
}

impl Placement {
    /// Spawn rotation at the spawn column.
    pub const fn fallback() -> Self {
        Self {
            rotation: 0,
            column: Anchor::spawn().col,
        }
    }

    /// True when the rotation exists for `kind` and the rotated shape fits the board width at `column`.
    pub fn is_well_formed(&self, kind: PieceKind) -> bool {
        if self.rotation >= kind.rotation_count() {
            return false;
        }
        let width = shape_width(kind.shape(self.rotation));
        self.column >= 0 && self.column + width <= BOARD_WIDTH as i32
    }
}

/// Heuristic weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub completed_row: f64,
    pub aggregate_height: f64,
    pub hole: f64,
    pub transition: f64,
    pub bumpiness: f64,
    pub max_height: f64,
    pub well: f64,
    /// Share of the best follow-up score added to the first placement.
    pub follow_up: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            completed_row: 150.0,
            aggregate_height: 0.6,
            hole: 15.0,
            transition: 0.3,
            bumpiness: 1.0,
            max_height: 2.0,
            well: 10.0,
            follow_up: 0.5,
        }
    }
}

/// Shape-of-the-stack measurements of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardMetrics {
    pub heights: [u32; BOARD_WIDTH],
    pub completed_rows: u32,
    pub aggregate_height: u32,
    pub max_height: u32,
    pub holes: u32,
    pub transitions: u32,
    pub bumpiness: u32,
}

impl BoardMetrics {
    pub fn measure(board: &Board) -> Self {
        let heights = board.column_heights();
        let aggregate_height = heights.iter().sum();
        let max_height = heights.iter().copied().max().unwrap_or(0);
        let bumpiness = heights.windows(2).map(|w| w[0].abs_diff(w[1])).sum();

        let mut holes = 0;
        let mut transitions = 0;
        for col in 0..BOARD_WIDTH as i32 {
            let mut covered = false;
            let mut above: Option<bool> = None;
            for row in 0..BOARD_HEIGHT as i32 {
                let filled = board.get(row, col).is_some_and(Cell::is_filled);
                if filled {
                    covered = true;
                } else if covered {
                    holes += 1;
                }
                if above.is_some_and(|a| a != filled) {
                    transitions += 1;
                }
                above = Some(filled);
            }
        }

        Self {
            heights,
            completed_rows: board.full_row_count() as u32,
            aggregate_height,
            max_height,
            holes,
            transitions,
            bumpiness,
        }
    }

    /// Interior columns at least four cells lower than both neighbours.
    pub fn deep_wells(&self) -> u32 {
        self.heights
            .windows(3)
            .filter(|w| w[1] + 4 <= w[0] && w[1] + 4 <= w[2])
            .count() as u32
    }
}

/// Deepest row at which `shape` rests in `column` when dropped from the top, or `None`
/// when it does not even fit in the top row.
pub fn resting_row(board: &Board, shape: Shape, column: i32) -> Option<i32> {
    if !board.is_valid_placement(shape, Anchor::new(0, column)) {
        return None;
    }
    let mut row = 0;
    while board.is_valid_placement(shape, Anchor::new(row + 1, column)) {
        row += 1;
    }
    Some(row)
}

/// A candidate dropped onto a scratch copy of the board.
struct Landing {
    board: Board,
    metrics: BoardMetrics,
}

fn land(board: &Board, kind: PieceKind, rotation: usize, column: i32) -> Option<Landing> {
    let shape = kind.shape(rotation);
    let row = resting_row(board, shape, column)?;
    let mut scratch = board.clone();
    scratch.lock(shape, Anchor::new(row, column), Cell::Filled);
    let metrics = BoardMetrics::measure(&scratch);
    Some(Landing {
        board: scratch,
        metrics,
    })
}

fn columns_for(shape: Shape) -> std::ops::RangeInclusive<i32> {
    0..=(BOARD_WIDTH as i32 - shape_width(shape))
}

#[derive(Debug, Clone, Default)]
pub struct Planner {
    weights: Weights,
}

impl Planner {
    /// Board score shared by both plies (everything but the well bonus).
    fn stack_score(&self, m: &BoardMetrics) -> f64 {
        let w = &self.weights;
        w.completed_row * f64::from(m.completed_rows)
            - w.aggregate_height * f64::from(m.aggregate_height)
            - w.hole * f64::from(m.holes)
            - w.transition * f64::from(m.transitions)
            - w.bumpiness * f64::from(m.bumpiness)
            - w.max_height * f64::from(m.max_height)
    }

    /// First-ply score, including the well bonus when the piece is not the line piece.
    fn placement_score(&self, m: &BoardMetrics, kind: PieceKind) -> f64 {
        let mut score = self.stack_score(m);
        if m.max_height > 4 && kind != PieceKind::I {
            score += self.weights.well * f64::from(m.deep_wells());
        }
        score
    }

    /// Best look-ahead score for `next` on `board`, over every second column.
    /// `None` when no placement of `next` is reachable.
    fn best_follow_up(&self, board: &Board, next: PieceKind) -> Option<f64> {
        let mut best: Option<f64> = None;
        for rotation in 0..next.rotation_count() {
            let shape = next.shape(rotation);
            for column in columns_for(shape).step_by(FOLLOW_UP_COLUMN_STEP) {
                if let Some(landing) = land(board, next, rotation, column) {
                    let score = self.stack_score(&landing.metrics);
                    if best.is_none_or(|b| score > b) {
                        best = Some(score);
                    }
                }
            }
        }
        best
    }

    /// Score of one candidate, or `None` when it is unreachable.
    pub fn evaluate(
        &self,
        board: &Board,
        current: PieceKind,
        next: PieceKind,
        placement: Placement,
    ) -> Option<f64> {
        let landing = land(board, current, placement.rotation, placement.column)?;
        let first = self.placement_score(&landing.metrics, current);
        let mut collapsed = landing.board;
        collapsed.clear_completed_rows();
        Some(match self.best_follow_up(&collapsed, next) {
            Some(follow_up) => first + self.weights.follow_up * follow_up,
            None => first,
        })
    }

    /// Best placement for `current` given the known `next` piece.
    ///
    /// Candidates are enumerated by rotation then column; only a strictly better score
    /// replaces the incumbent. Falls back to [`Placement::fallback`] if nothing is reachable.
    pub fn decide(&self, board: &Board, current: PieceKind, next: PieceKind) -> Placement {
        let mut best: Option<(f64, Placement)> = None;
        for rotation in 0..current.rotation_count() {
            for column in columns_for(current.shape(rotation)) {
                let placement = Placement { rotation, column };
                let Some(score) = self.evaluate(board, current, next, placement) else {
                    continue;
                };
                if best.is_none_or(|(b, _)| score > b) {
                    best = Some((score, placement));
                }
            }
        }
        best.map_or_else(Placement::fallback, |(_, p)| p)
    }
}
