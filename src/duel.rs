//! The duel: two sessions, the planner, the special rules and the scheduler that drives them.
//!
//! Time only enters through [`Duel::advance`]; every timer (fall ticks, the automated
//! player's think and drive steps, rule polling) is an entry in one [`Scheduler`] queue.

use crate::GameConfig;
use crate::pieces::{PieceKind, random_kind};
use crate::planner::{Placement, Planner};
use crate::rules::{RuleEffect, SpecialRules, special_pieces_unlocked};
use crate::scheduler::{Scheduler, Task};
use crate::session::{FallOutcome, GameSession, Side, SpawnOutcome};
use crate::snapshot::{DuelSnapshot, SessionSnapshot};
use rand::Rng;
use rand::rngs::StdRng;
use std::cmp::Ordering;

/// Input from the human player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
}

/// Final result: the session whose spawn collided lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub winner: Side,
    /// Final scores indexed by `Side::index`.
    pub scores: [u32; 2],
}

impl Outcome {
    pub fn score(&self, side: Side) -> u32 {
        self.scores[side.index()]
    }

    pub fn message(&self) -> String {
        format!("{} wins!", self.winner.label())
    }
}

/// Notable transitions, drained by the app for the status line and effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelEvent {
    PieceLocked { side: Side, lines: usize, points: u32 },
    GiftGiven { to: Side, kind: PieceKind },
    SlowMode(bool),
    Rainbow(bool),
    Paused(bool),
    GameOver(Outcome),
}

impl From<RuleEffect> for DuelEvent {
    fn from(effect: RuleEffect) -> Self {
        match effect {
            RuleEffect::GiftGiven { to, kind } => Self::GiftGiven { to, kind },
            RuleEffect::SlowMode(on) => Self::SlowMode(on),
            RuleEffect::Rainbow(on) => Self::Rainbow(on),
        }
    }
}

/// Where the automated player is between spawn and lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AiPhase {
    Thinking,
    Driving(Placement),
    Falling,
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    ai_think_ms: u64,
    ai_step_ms: u64,
    rule_poll_ms: u64,
}

pub struct Duel<R: Rng = StdRng> {
    sessions: [GameSession; 2],
    rules: SpecialRules,
    planner: Planner,
    scheduler: Scheduler,
    rng: R,
    timing: Timing,
    ai_phase: AiPhase,
    started: bool,
    paused: bool,
    quit: bool,
    outcome: Option<Outcome>,
    events: Vec<DuelEvent>,
    wall_secs: f64,
}

impl<R: Rng> Duel<R> {
    pub fn new(config: &GameConfig, mut rng: R) -> Self {
        let human_next = random_kind(&mut rng, false);
        let ai_next = random_kind(&mut rng, false);
        Self {
            sessions: [
                GameSession::new(Side::Human, human_next, config.human_fall_ms),
                GameSession::new(Side::Ai, ai_next, config.ai_fall_ms),
            ],
            rules: SpecialRules::new(),
            planner: Planner::default(),
            scheduler: Scheduler::new(),
            rng,
            timing: Timing {
                ai_think_ms: config.ai_think_ms,
                ai_step_ms: config.ai_step_ms,
                rule_poll_ms: config.rule_poll_ms.max(1),
            },
            ai_phase: AiPhase::Thinking,
            started: false,
            paused: false,
            quit: false,
            outcome: None,
            events: Vec::new(),
            wall_secs: 0.0,
        }
    }

    /// Spawn both first pieces and arm the timers. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.scheduler
            .schedule_in(self.timing.rule_poll_ms, Task::RulePoll);
        for side in Side::BOTH {
            if self.outcome.is_some() {
                break;
            }
            self.spawn(side);
        }
    }

    /// Run every task due up to logical time `now_ms`. `wall_secs` is the wall clock in
    /// seconds, used only by the rainbow cue.
    pub fn advance(&mut self, now_ms: u64, wall_secs: f64) {
        self.wall_secs = wall_secs;
        while let Some(task) = self.scheduler.pop_due(now_ms) {
            self.run(task);
        }
    }

    /// Apply a command. Only the human session takes commands; returns whether anything moved.
    pub fn handle_command(&mut self, side: Side, command: Command) -> bool {
        if side != Side::Human || !self.is_running() {
            return false;
        }
        if command == Command::SoftDrop {
            self.scheduler
                .cancel(|task| task == Task::Fall(Side::Human));
            self.fall(Side::Human);
            return true;
        }
        let human = &mut self.sessions[Side::Human.index()];
        match command {
            Command::MoveLeft => human.shift(-1),
            Command::MoveRight => human.shift(1),
            Command::Rotate => human.rotate(),
            Command::SoftDrop => false,
        }
    }

    pub fn toggle_pause(&mut self) {
        if !self.started || self.outcome.is_some() || self.quit {
            return;
        }
        self.paused = !self.paused;
        for session in &mut self.sessions {
            session.set_paused(self.paused);
        }
        if self.paused {
            self.scheduler.cancel(Task::is_session_task);
        } else {
            self.rearm();
        }
        self.events.push(DuelEvent::Paused(self.paused));
    }

    pub fn quit(&mut self) {
        self.quit = true;
        self.scheduler.clear();
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[cfg(test)]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    #[cfg(test)]
    pub fn session(&self, side: Side) -> &GameSession {
        &self.sessions[side.index()]
    }

    #[cfg(test)]
    fn session_mut(&mut self, side: Side) -> &mut GameSession {
        &mut self.sessions[side.index()]
    }

    pub fn drain_events(&mut self) -> Vec<DuelEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> DuelSnapshot {
        DuelSnapshot {
            sessions: [
                SessionSnapshot::capture(&self.sessions[0]),
                SessionSnapshot::capture(&self.sessions[1]),
            ],
            paused: self.paused,
            slow_mode: self.rules.slow_mode_active(),
            rainbow: self.rules.rainbow_active(),
            outcome: self.outcome,
        }
    }

    fn is_running(&self) -> bool {
        self.started && !self.paused && !self.quit && self.outcome.is_none()
    }

    fn scores(&self) -> [u32; 2] {
        [self.sessions[0].score(), self.sessions[1].score()]
    }

    fn fall_interval(&self, side: Side) -> u64 {
        self.sessions[side.index()].fall_interval_ms()
    }

    fn run(&mut self, task: Task) {
        match task {
            Task::Fall(side) => self.fall(side),
            Task::PlanDecide => self.plan(),
            Task::PlanStep => self.drive_step(),
            Task::RulePoll => {
                let effects = self.rules.poll(
                    &mut self.sessions,
                    self.scheduler.now(),
                    self.wall_secs,
                );
                self.events.extend(effects.into_iter().map(DuelEvent::from));
                self.scheduler
                    .schedule_in(self.timing.rule_poll_ms, Task::RulePoll);
            }
        }
    }

    fn spawn(&mut self, side: Side) {
        let unlocked = special_pieces_unlocked(self.scores());
        let fresh = random_kind(&mut self.rng, unlocked);
        match self.sessions[side.index()].spawn(fresh) {
            SpawnOutcome::Spawned => match side {
                Side::Human => self
                    .scheduler
                    .schedule_in(self.fall_interval(Side::Human), Task::Fall(Side::Human)),
                Side::Ai => {
                    self.ai_phase = AiPhase::Thinking;
                    self.scheduler
                        .schedule_in(self.timing.ai_think_ms, Task::PlanDecide);
                }
            },
            SpawnOutcome::Blocked => self.finish(side.other()),
        }
    }

    fn fall(&mut self, side: Side) {
        match self.sessions[side.index()].fall_step() {
            FallOutcome::Moved => self
                .scheduler
                .schedule_in(self.fall_interval(side), Task::Fall(side)),
            FallOutcome::Locked(report) => {
                self.events.push(DuelEvent::PieceLocked {
                    side,
                    lines: report.lines_cleared,
                    points: report.points,
                });
                let effects = self.rules.on_clear(
                    &mut self.sessions,
                    side,
                    report.lines_cleared,
                    self.scheduler.now(),
                    &mut self.rng,
                );
                self.events.extend(effects.into_iter().map(DuelEvent::from));
                self.spawn(side);
            }
            FallOutcome::Idle => {}
        }
    }

    /// Choose a placement for the automated piece, turn it, then start driving it sideways.
    fn plan(&mut self) {
        let ai = &self.sessions[Side::Ai.index()];
        let Some(piece) = ai.current() else {
            return;
        };
        let mut target = self.planner.decide(ai.board(), piece.kind, ai.next());
        if !target.is_well_formed(piece.kind) {
            target = Placement::fallback();
        }
        self.sessions[Side::Ai.index()].set_rotation(target.rotation);
        self.ai_phase = AiPhase::Driving(target);
        self.continue_drive(target);
    }

    fn drive_step(&mut self) {
        let AiPhase::Driving(target) = self.ai_phase else {
            return;
        };
        let ai = &mut self.sessions[Side::Ai.index()];
        let Some(piece) = ai.current() else {
            return;
        };
        let dcol = match target.column.cmp(&piece.anchor.col) {
            Ordering::Less => -1,
            Ordering::Greater => 1,
            Ordering::Equal => 0,
        };
        if dcol != 0 && !ai.shift(dcol) {
            self.start_ai_fall();
            return;
        }
        self.continue_drive(target);
    }

    fn continue_drive(&mut self, target: Placement) {
        let at_target = self.sessions[Side::Ai.index()]
            .current()
            .is_none_or(|piece| piece.anchor.col == target.column);
        if at_target {
            self.start_ai_fall();
        } else {
            self.scheduler
                .schedule_in(self.timing.ai_step_ms, Task::PlanStep);
        }
    }

    fn start_ai_fall(&mut self) {
        self.ai_phase = AiPhase::Falling;
        self.scheduler
            .schedule_in(self.fall_interval(Side::Ai), Task::Fall(Side::Ai));
    }

    /// Re-arm session timers after a pause, resuming the automated player where it stopped.
    fn rearm(&mut self) {
        self.scheduler
            .schedule_in(self.fall_interval(Side::Human), Task::Fall(Side::Human));
        match self.ai_phase {
            AiPhase::Thinking => self
                .scheduler
                .schedule_in(self.timing.ai_think_ms, Task::PlanDecide),
            AiPhase::Driving(_) => self
                .scheduler
                .schedule_in(self.timing.ai_step_ms, Task::PlanStep),
            AiPhase::Falling => self
                .scheduler
                .schedule_in(self.fall_interval(Side::Ai), Task::Fall(Side::Ai)),
        }
    }

    fn finish(&mut self, winner: Side) {
        for session in &mut self.sessions {
            session.end();
        }
        self.scheduler.clear();
        let outcome = Outcome {
            winner,
            scores: self.scores(),
        };
        self.outcome = Some(outcome);
        self.events.push(DuelEvent::GameOver(outcome));
    }
}
