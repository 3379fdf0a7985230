//! One player's game: board, falling piece, next piece, score and fall speed.

use crate::board::{Anchor, Board, Cell};
use crate::pieces::{PieceKind, Shape};

/// Which of the two players a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Human,
    Ai,
}

impl Side {
    pub const BOTH: [Self; 2] = [Self::Human, Self::Ai];

    pub fn other(self) -> Self {
        match self {
            Self::Human => Self::Ai,
            Self::Ai => Self::Human,
        }
    }

    /// Slot in two-element per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Human => 0,
            Self::Ai => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Human => "Player",
            Self::Ai => "AI",
        }
    }
}

/// Falling piece: kind, rotation index and anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub rotation: usize,
    pub anchor: Anchor,
}

impl ActivePiece {
    pub fn spawn(kind: PieceKind) -> Self {
        Self {
            kind,
            rotation: 0,
            anchor: Anchor::spawn(),
        }
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.kind.shape(self.rotation)
    }

    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> {
        self.anchor.cells(self.shape())
    }

    fn fits(&self, board: &Board) -> bool {
        board.is_valid_placement(self.shape(), self.anchor)
    }
}

/// Points for one clearing transition.
pub fn line_clear_points(lines: usize) -> u32 {
    match lines {
        0 => 0,
        1 => 100,
        2 => 300,
        3 => 500,
        4 => 800,
        n => 200 * n as u32,
    }
}

/// What locking a piece produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockReport {
    pub kind: PieceKind,
    pub lines_cleared: usize,
    pub points: u32,
}

/// Result of one fall step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallOutcome {
    /// Piece moved one row down.
    Moved,
    /// Piece could not move: it was locked, rows were cleared and scored. A spawn must follow.
    Locked(LockReport),
    /// Nothing to do (no piece, paused or game over).
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned,
    /// The fresh piece does not fit at the spawn anchor; the session is over.
    Blocked,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    side: Side,
    board: Board,
    current: Option<ActivePiece>,
    next: PieceKind,
    score: u32,
    lines_cleared: u32,
    pieces_locked: u32,
    fall_interval_ms: u64,
    paused: bool,
    game_over: bool,
}

impl GameSession {
    pub fn new(side: Side, first_next: PieceKind, fall_interval_ms: u64) -> Self {
        Self {
            side,
            board: Board::new(),
            current: None,
            next: first_next,
            score: 0,
            lines_cleared: 0,
            pieces_locked: 0,
            fall_interval_ms: fall_interval_ms.max(1),
            paused: false,
            game_over: false,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    #[cfg(test)]
    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[cfg(test)]
    pub fn set_score(&mut self, score: u32) {
        self.score = score;
    }

    pub fn current(&self) -> Option<ActivePiece> {
        self.current
    }

    pub fn next(&self) -> PieceKind {
        self.next
    }

    /// Replace the pre-generated next piece (gift rule).
    pub fn set_next(&mut self, kind: PieceKind) {
        self.next = kind;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn pieces_locked(&self) -> u32 {
        self.pieces_locked
    }

    pub fn fall_interval_ms(&self) -> u64 {
        self.fall_interval_ms
    }

    pub fn set_fall_interval_ms(&mut self, ms: u64) {
        self.fall_interval_ms = ms.max(1);
    }

    #[cfg(test)]
    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    #[cfg(test)]
    pub fn game_over(&self) -> bool {
        self.game_over
    }

    /// Absorbing: once set, every operation becomes a no-op.
    pub fn end(&mut self) {
        self.game_over = true;
    }

    #[inline]
    fn accepts_moves(&self) -> bool {
        !self.paused && !self.game_over
    }

    /// Promote the next piece to the falling piece and queue `fresh_next` behind it.
    pub fn spawn(&mut self, fresh_next: PieceKind) -> SpawnOutcome {
        if self.game_over {
            return SpawnOutcome::Blocked;
        }
        let piece = ActivePiece::spawn(self.next);
        self.next = fresh_next;
        self.current = Some(piece);
        if piece.fits(&self.board) {
            SpawnOutcome::Spawned
        } else {
            self.game_over = true;
            SpawnOutcome::Blocked
        }
    }

    /// Move the piece one row down, or lock it, clear rows and score when it cannot move.
    pub fn fall_step(&mut self) -> FallOutcome {
        if !self.accepts_moves() {
            return FallOutcome::Idle;
        }
        let Some(piece) = self.current else {
            return FallOutcome::Idle;
        };
        let lowered = ActivePiece {
            anchor: piece.anchor.offset(1, 0),
            ..piece
        };
        if lowered.fits(&self.board) {
            self.current = Some(lowered);
            return FallOutcome::Moved;
        }

        self.board
            .lock(piece.shape(), piece.anchor, Cell::marker_for(piece.kind));
        self.current = None;
        self.pieces_locked += 1;

        let lines = self.board.clear_completed_rows();
        let points = line_clear_points(lines);
        self.score += points;
        self.lines_cleared += lines as u32;
        FallOutcome::Locked(LockReport {
            kind: piece.kind,
            lines_cleared: lines,
            points,
        })
    }

    /// Shift the piece horizontally by `dcol`; invalid shifts are ignored.
    pub fn shift(&mut self, dcol: i32) -> bool {
        if !self.accepts_moves() {
            return false;
        }
        let Some(piece) = self.current else {
            return false;
        };
        let moved = ActivePiece {
            anchor: piece.anchor.offset(0, dcol),
            ..piece
        };
        if moved.fits(&self.board) {
            self.current = Some(moved);
            true
        } else {
            false
        }
    }

    /// Advance to the next rotation state at the same anchor; no wall kicks.
    pub fn rotate(&mut self) -> bool {
        if !self.accepts_moves() {
            return false;
        }
        let Some(piece) = self.current else {
            return false;
        };
        let turned = ActivePiece {
            rotation: piece.kind.next_rotation(piece.rotation),
            ..piece
        };
        if turned.fits(&self.board) {
            self.current = Some(turned);
            true
        } else {
            false
        }
    }

    /// Set the rotation directly, without checking the board (planner execution).
    pub fn set_rotation(&mut self, rotation: usize) {
        if !self.accepts_moves() {
            return;
        }
        if let Some(piece) = self.current.as_mut() {
            piece.rotation = rotation % piece.kind.rotation_count();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BOARD_HEIGHT, BOARD_WIDTH};

    fn session_with(kind: PieceKind) -> GameSession {
        let mut s = GameSession::new(Side::Human, kind, 1000);
        assert_eq!(s.spawn(PieceKind::T), SpawnOutcome::Spawned);
        s
    }

    fn drop_until_locked(s: &mut GameSession) -> LockReport {
        for _ in 0..=BOARD_HEIGHT {
            if let FallOutcome::Locked(report) = s.fall_step() {
                return report;
            }
        }
        panic!("piece never locked");
    }

    #[test]
    fn points_table_is_exact() {
        assert_eq!(line_clear_points(0), 0);
        assert_eq!(line_clear_points(1), 100);
        assert_eq!(line_clear_points(2), 300);
        assert_eq!(line_clear_points(3), 500);
        assert_eq!(line_clear_points(4), 800);
        assert_eq!(line_clear_points(5), 1000);
        assert_eq!(line_clear_points(6), 1200);
    }

    #[test]
    fn spawn_promotes_next_and_centres_the_piece() {
        let s = session_with(PieceKind::O);
        let piece = s.current().unwrap();
        assert_eq!(piece.kind, PieceKind::O);
        assert_eq!(piece.rotation, 0);
        assert_eq!(piece.anchor, Anchor::new(0, (BOARD_WIDTH / 2 - 1) as i32));
        assert_eq!(s.next(), PieceKind::T);
    }

    #[test]
    fn square_settles_on_the_floor() {
        let mut s = session_with(PieceKind::O);
        let report = drop_until_locked(&mut s);
        assert_eq!(report.lines_cleared, 0);
        assert_eq!(report.points, 0);
        assert_eq!(s.board().filled_count(), 4);
        assert!(s.board().get(18, 4).unwrap().is_filled());
        assert!(s.board().get(19, 5).unwrap().is_filled());
        assert!(!s.board().get(17, 4).unwrap().is_filled());
        assert_eq!(s.score(), 0);
        assert!(s.current().is_none());
    }

    #[test]
    fn vertical_line_completes_the_bottom_row() {
        let mut s = session_with(PieceKind::I);
        for col in 0..9 {
            s.board_mut().set(19, col, Cell::Filled);
        }
        assert!(s.rotate());
        while s.shift(1) {}
        assert_eq!(s.current().unwrap().anchor.col, 9);
        let report = drop_until_locked(&mut s);
        assert_eq!(report.lines_cleared, 1);
        assert_eq!(s.score(), 100);
        assert_eq!(s.lines_cleared(), 1);
        // the three remaining I cells fell by one row
        assert_eq!(s.board().filled_count(), 3);
        assert!(s.board().get(19, 9).unwrap().is_filled());
    }

    #[test]
    fn four_rows_score_eight_hundred() {
        let mut s = session_with(PieceKind::I);
        for row in 16..20 {
            for col in 0..9 {
                s.board_mut().set(row, col, Cell::Filled);
            }
        }
        s.rotate();
        while s.shift(1) {}
        let report = drop_until_locked(&mut s);
        assert_eq!(report.lines_cleared, 4);
        assert_eq!(report.points, 800);
        assert_eq!(s.board().filled_count(), 0);
    }

    #[test]
    fn invalid_moves_are_silent() {
        let mut s = session_with(PieceKind::O);
        while s.shift(-1) {}
        let before = s.current();
        assert!(!s.shift(-1));
        assert_eq!(s.current(), before);
        // O has one rotation state; rotating keeps index 0
        assert!(s.rotate());
        assert_eq!(s.current().unwrap().rotation, 0);
    }

    #[test]
    fn rotation_is_rejected_against_the_wall() {
        let mut s = session_with(PieceKind::I);
        assert!(s.rotate());
        while s.shift(1) {}
        // horizontal I at column 9 would leave the board
        assert!(!s.rotate());
        assert_eq!(s.current().unwrap().rotation, 1);
    }

    #[test]
    fn paused_and_finished_sessions_ignore_input() {
        let mut s = session_with(PieceKind::T);
        s.set_paused(true);
        assert!(!s.shift(1));
        assert!(!s.rotate());
        assert_eq!(s.fall_step(), FallOutcome::Idle);
        s.set_paused(false);
        s.end();
        assert!(!s.shift(1));
        assert_eq!(s.fall_step(), FallOutcome::Idle);
        assert_eq!(s.spawn(PieceKind::O), SpawnOutcome::Blocked);
    }

    #[test]
    fn blocked_spawn_ends_the_session() {
        let mut s = GameSession::new(Side::Ai, PieceKind::O, 500);
        s.board_mut().set(0, 4, Cell::Filled);
        assert_eq!(s.spawn(PieceKind::T), SpawnOutcome::Blocked);
        assert!(s.game_over());
    }

    #[test]
    fn set_rotation_wraps() {
        let mut s = session_with(PieceKind::S);
        s.set_rotation(3);
        assert_eq!(s.current().unwrap().rotation, 1);
    }
}
