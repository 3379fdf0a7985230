//! Cross-session special rules: the easy-piece gift, slow mode, the rainbow cue and the
//! special-piece gate.
//!
//! All cross-session mutation goes through [`SpecialRules`], which the duel owns and passes
//! both sessions into.

use crate::pieces::{PieceKind, random_easy_kind};
use crate::session::{GameSession, Side};
use rand::Rng;

/// Fall-interval multiplier while slow mode is active.
pub const SLOW_FACTOR: f64 = 1.2;
pub const SLOW_DURATION_MS: u64 = 10_000;
const SLOW_SCORE_STEP: u32 = 1000;
const SLOW_SCORE_BAND: u32 = 50;

const SPECIAL_SCORE_STEP: u32 = 3000;
const SPECIAL_SCORE_BAND: u32 = 100;

pub const RAINBOW_PERIOD_SECS: f64 = 120.0;
pub const RAINBOW_WINDOW_SECS: f64 = 20.0;

/// Lines that must be cleared in one lock to hand the opponent an easy piece.
const GIFT_LINES: usize = 2;

/// True when either score sits in the first 100 points past a multiple of 3000.
pub fn special_pieces_unlocked(scores: [u32; 2]) -> bool {
    scores
        .iter()
        .any(|&s| s >= SPECIAL_SCORE_STEP && s % SPECIAL_SCORE_STEP < SPECIAL_SCORE_BAND)
}

/// Observable consequence of a rule firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleEffect {
    GiftGiven { to: Side, kind: PieceKind },
    SlowMode(bool),
    Rainbow(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlowMode {
    started_at_ms: u64,
    /// Pre-activation intervals, indexed by `Side::index`.
    saved_intervals: [u64; 2],
}

/// Flags shared by both sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecialState {
    slow_mode: Option<SlowMode>,
    rainbow_since: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct SpecialRules {
    state: SpecialState,
}

impl SpecialRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slow_mode_active(&self) -> bool {
        self.state.slow_mode.is_some()
    }

    pub fn rainbow_active(&self) -> bool {
        self.state.rainbow_since.is_some()
    }

    /// Run after every lock of `source`, with the number of rows that lock cleared.
    pub fn on_clear<R: Rng + ?Sized>(
        &mut self,
        sessions: &mut [GameSession; 2],
        source: Side,
        lines: usize,
        now_ms: u64,
        rng: &mut R,
    ) -> Vec<RuleEffect> {
        let mut effects = Vec::new();

        if lines == GIFT_LINES {
            let to = source.other();
            let kind = random_easy_kind(rng);
            sessions[to.index()].set_next(kind);
            effects.push(RuleEffect::GiftGiven { to, kind });
        }

        let score = sessions[source.index()].score();
        if score > 0 && score % SLOW_SCORE_STEP < SLOW_SCORE_BAND && !self.slow_mode_active() {
            let saved_intervals = [
                sessions[0].fall_interval_ms(),
                sessions[1].fall_interval_ms(),
            ];
            for session in sessions.iter_mut() {
                let slowed = (session.fall_interval_ms() as f64 * SLOW_FACTOR).round() as u64;
                session.set_fall_interval_ms(slowed);
            }
            self.state.slow_mode = Some(SlowMode {
                started_at_ms: now_ms,
                saved_intervals,
            });
            effects.push(RuleEffect::SlowMode(true));
        }

        effects
    }

    /// Periodic check: slow-mode expiry on the logical clock, rainbow window on wall-clock seconds.
    pub fn poll(
        &mut self,
        sessions: &mut [GameSession; 2],
        now_ms: u64,
        wall_secs: f64,
    ) -> Vec<RuleEffect> {
        let mut effects = Vec::new();

        let expired = self
            .state
            .slow_mode
            .filter(|slow| now_ms.saturating_sub(slow.started_at_ms) >= SLOW_DURATION_MS);
        if let Some(slow) = expired {
            for (session, saved) in sessions.iter_mut().zip(slow.saved_intervals) {
                session.set_fall_interval_ms(saved);
            }
            self.state.slow_mode = None;
            effects.push(RuleEffect::SlowMode(false));
        }

        match self.state.rainbow_since {
            None if wall_secs >= RAINBOW_PERIOD_SECS
                && wall_secs % RAINBOW_PERIOD_SECS < RAINBOW_WINDOW_SECS =>
            {
                self.state.rainbow_since = Some(wall_secs);
                effects.push(RuleEffect::Rainbow(true));
            }
            Some(since) if wall_secs - since > RAINBOW_WINDOW_SECS => {
                self.state.rainbow_since = None;
                effects.push(RuleEffect::Rainbow(false));
            }
            _ => {}
        }

        effects
    }
}
