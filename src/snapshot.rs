//! Read-only copies of duel state handed to the render layer.

use crate::board::{Anchor, BOARD_HEIGHT, BOARD_WIDTH, Cell};
use crate::duel::Outcome;
use crate::pieces::PieceKind;
use crate::session::{GameSession, Side};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub rotation: usize,
    pub anchor: Anchor,
}

impl ActiveSnapshot {
    /// Absolute (row, col) of every cell of the falling piece.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> {
        self.anchor.cells(self.kind.shape(self.rotation))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub side: Side,
    pub board: [[Cell; BOARD_WIDTH]; BOARD_HEIGHT],
    pub active: Option<ActiveSnapshot>,
    pub next: PieceKind,
    pub score: u32,
    pub lines_cleared: u32,
    pub pieces_locked: u32,
    pub fall_interval_ms: u64,
}

impl SessionSnapshot {
    pub fn capture(session: &GameSession) -> Self {
        Self {
            side: session.side(),
            board: session.board().to_matrix(),
            active: session.current().map(|piece| ActiveSnapshot {
                kind: piece.kind,
                rotation: piece.rotation,
                anchor: piece.anchor,
            }),
            next: session.next(),
            score: session.score(),
            lines_cleared: session.lines_cleared(),
            pieces_locked: session.pieces_locked(),
            fall_interval_ms: session.fall_interval_ms(),
        }
    }

    /// Kind of the falling piece covering (row, col), if any.
    pub fn active_at(&self, row: i32, col: i32) -> Option<PieceKind> {
        self.active
            .as_ref()
            .filter(|a| a.cells().any(|cell| cell == (row, col)))
            .map(|a| a.kind)
    }
}

/// Text shown in the sidebar's rule line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Paused,
    Rainbow,
    SlowMode,
    Idle,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Self::Paused => "PAUSED",
            Self::Rainbow => "Rainbow mode active!",
            Self::SlowMode => "Slow mode active!",
            Self::Idle => "No active rule",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuelSnapshot {
    pub sessions: [SessionSnapshot; 2],
    pub paused: bool,
    pub slow_mode: bool,
    pub rainbow: bool,
    pub outcome: Option<Outcome>,
}

impl DuelSnapshot {
    pub fn session(&self, side: Side) -> &SessionSnapshot {
        &self.sessions[side.index()]
    }

    pub fn status(&self) -> Status {
        if self.paused {
            Status::Paused
        } else if self.rainbow {
            Status::Rainbow
        } else if self.slow_mode {
            Status::SlowMode
        } else {
            Status::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_copies_the_falling_piece() {
        let mut session = GameSession::new(Side::Ai, PieceKind::O, 500);
        session.spawn(PieceKind::I);
        let snap = SessionSnapshot::capture(&session);
        let active = snap.active.as_ref().unwrap();
        assert_eq!(active.kind, PieceKind::O);
        assert_eq!(active.cells().count(), 4);
        assert_eq!(active.rotation, 0);
        assert_eq!(active.anchor, Anchor::spawn());
        assert_eq!(snap.next, PieceKind::I);
        assert_eq!(snap.active_at(0, 4), Some(PieceKind::O));
        assert_eq!(snap.active_at(0, 3), None);
        assert_eq!(snap.board[19][0], Cell::Empty);
    }

    #[test]
    fn status_prefers_pause_then_rainbow_then_slow() {
        let session = GameSession::new(Side::Human, PieceKind::T, 1000);
        let mut snap = DuelSnapshot {
            sessions: [
                SessionSnapshot::capture(&session),
                SessionSnapshot::capture(&session),
            ],
            paused: true,
            slow_mode: true,
            rainbow: true,
            outcome: None,
        };
        assert_eq!(snap.status(), Status::Paused);
        snap.paused = false;
        assert_eq!(snap.status(), Status::Rainbow);
        snap.rainbow = false;
        assert_eq!(snap.status(), Status::SlowMode);
        snap.slow_mode = false;
        assert_eq!(snap.status().label(), "No active rule");
    }
}
