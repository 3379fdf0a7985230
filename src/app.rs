//! App: terminal init, main loop, clock and key handling.

use crate::GameConfig;
use crate::duel::{Duel, DuelEvent};
use crate::input::{Action, key_to_action};
use crate::session::Side;
use crate::theme::Theme;
use crate::ui::{self, Flashes, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    duel: Duel,
    screen: Screen,
    /// Origin of the duel's logical clock.
    game_start: Instant,
    flashes: Flashes,
}

/// Seconds since the Unix epoch; the rainbow cue follows the time of day.
fn wall_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn new_duel(config: &GameConfig) -> Duel {
    let mut duel = Duel::new(config, StdRng::from_entropy());
    duel.start();
    duel
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        config.validate()?;
        let duel = new_duel(&config);
        Ok(Self {
            config,
            theme,
            duel,
            screen: Screen::Playing,
            game_start: Instant::now(),
            flashes: Flashes::default(),
        })
    }

    fn reset_game(&mut self) {
        self.duel = new_duel(&self.config);
        self.screen = Screen::Playing;
        self.game_start = Instant::now();
        self.flashes.clear();
    }

    fn logical_now(&self) -> u64 {
        self.game_start
            .elapsed()
            .as_millis()
            .min(u128::from(u64::MAX)) as u64
    }

    fn on_event(&mut self, event: DuelEvent) {
        match event {
            DuelEvent::PieceLocked { side, lines, .. } if lines > 0 => self.flashes.trigger(side),
            DuelEvent::GameOver(_) => self.screen = Screen::GameOver,
            _ => {}
        }
    }

    /// Returns false when the app should exit.
    fn apply_action(&mut self, action: Action) -> bool {
        match (self.screen, action) {
            (_, Action::Quit) => {
                self.duel.quit();
                return false;
            }
            (Screen::GameOver, Action::Restart) => self.reset_game(),
            (Screen::Playing, Action::Pause) => self.duel.toggle_pause(),
            (Screen::Playing, _) if !self.duel.is_paused() => {
                if let Some(command) = action.command() {
                    self.duel.handle_command(Side::Human, command);
                }
            }
            _ => {}
        }
        true
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Report press/repeat/release so OS auto-repeat can be told apart (ignored if unsupported)
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        // Clocks restart once the screen is ready so the first fall is not eaten by setup.
        self.reset_game();
        let result = self.run_loop(&mut terminal);

        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        loop {
            let now = Instant::now();
            let wall = wall_secs();
            self.duel.advance(self.logical_now(), wall);
            for event in self.duel.drain_events() {
                self.on_event(event);
            }

            let snapshot = self.duel.snapshot();
            let view = View {
                theme: &self.theme,
                wall_secs: wall,
                now,
                animation: self.config.animation,
            };
            let flashes = &mut self.flashes;
            terminal.draw(|f| ui::draw(f, &snapshot, &view, flashes))?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        // Only the first Press counts; repeats and releases are ignored.
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.apply_action(key_to_action(key)) {
                            return Ok(());
                        }
                    }
                }
            }
            if self.duel.is_quit() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duel::Outcome;

    fn app() -> App {
        App::new(GameConfig::default(), Theme::default()).unwrap()
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = GameConfig {
            human_fall_ms: 0,
            ..GameConfig::default()
        };
        assert!(App::new(config, Theme::default()).is_err());
    }

    #[test]
    fn quit_stops_the_loop() {
        let mut app = app();
        assert!(!app.apply_action(Action::Quit));
        assert!(app.duel.is_quit());
    }

    #[test]
    fn pause_key_toggles_the_duel() {
        let mut app = app();
        assert!(app.apply_action(Action::Pause));
        assert!(app.duel.is_paused());
        assert!(app.apply_action(Action::Pause));
        assert!(!app.duel.is_paused());
    }

    #[test]
    fn restart_only_after_game_over() {
        let mut app = app();
        app.apply_action(Action::MoveLeft);
        let moved = app.duel.session(Side::Human).current();
        app.apply_action(Action::Restart);
        assert_eq!(app.duel.session(Side::Human).current(), moved);

        app.on_event(DuelEvent::GameOver(Outcome {
            winner: Side::Ai,
            scores: [0, 0],
        }));
        assert_eq!(app.screen, Screen::GameOver);
        app.apply_action(Action::Restart);
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.duel.session(Side::Human).pieces_locked(), 0);
    }

    #[test]
    fn clears_trigger_a_flash() {
        let mut app = app();
        app.on_event(DuelEvent::PieceLocked {
            side: Side::Human,
            lines: 0,
            points: 0,
        });
        assert!(!app.flashes.is_running());
        app.on_event(DuelEvent::PieceLocked {
            side: Side::Ai,
            lines: 2,
            points: 300,
        });
        assert!(app.flashes.is_running());
    }
}
