//! Versustris: a falling-block duel in the terminal, you against a heuristic planner.

mod app;
mod board;
mod duel;
mod input;
mod pieces;
mod planner;
mod rules;
mod scheduler;
mod session;
mod snapshot;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::Parser;
use thiserror::Error;

/// Timing options derived from the CLI; the duel is built from this.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub human_fall_ms: u64,
    pub ai_fall_ms: u64,
    pub ai_think_ms: u64,
    pub ai_step_ms: u64,
    pub rule_poll_ms: u64,
    pub frame_rate: f64,
    pub animation: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            human_fall_ms: 1000,
            ai_fall_ms: 500,
            ai_think_ms: 100,
            ai_step_ms: 10,
            rule_poll_ms: 100,
            frame_rate: 30.0,
            animation: true,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("--{name} must be greater than zero")]
    ZeroInterval { name: &'static str },
    #[error("--frame-rate must be a positive number, got {0}")]
    FrameRate(f64),
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let config = Self {
            human_fall_ms: args.human_fall_ms,
            ai_fall_ms: args.ai_fall_ms,
            ai_think_ms: args.ai_think_ms,
            ai_step_ms: args.ai_step_ms,
            rule_poll_ms: args.rule_poll_ms,
            frame_rate: args.frame_rate,
            animation: !args.no_animation,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("human-fall-ms", self.human_fall_ms),
            ("ai-fall-ms", self.ai_fall_ms),
            ("ai-think-ms", self.ai_think_ms),
            ("ai-step-ms", self.ai_step_ms),
            ("rule-poll-ms", self.rule_poll_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ZeroInterval { name: *name });
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(ConfigError::FrameRate(self.frame_rate));
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = GameConfig::from_args(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref()).unwrap_or_default();
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// Falling-block duel in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "versustris",
    version,
    about = "Falling-block duel in the terminal: play your board while an automated opponent plays its own.",
    long_about = "Versustris puts two boards side by side. You play the left one; a heuristic planner \
        plays the right one. Clearing two rows at once hands your opponent an easy piece, every \
        thousand points slows both boards down for ten seconds, and the first player whose new \
        piece cannot spawn loses.\n\n\
        CONTROLS:\n  Left/Right h/l  Move    Up/k  Rotate    Down/j  Soft drop\n  \
        P  Pause    R  Restart (after game over)    Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Built-in colours if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Fall interval of your board in ms.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub human_fall_ms: u64,

    /// Fall interval of the automated board in ms.
    #[arg(long, default_value = "500", value_name = "MS")]
    pub ai_fall_ms: u64,

    /// Delay between the automated piece spawning and the planner deciding its placement.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub ai_think_ms: u64,

    /// Delay between horizontal steps of the automated piece.
    #[arg(long, default_value = "10", value_name = "MS")]
    pub ai_step_ms: u64,

    /// How often special rules (slow mode expiry, rainbow) are checked.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub rule_poll_ms: u64,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_cli_defaults() {
        let args = Args::parse_from(["versustris"]);
        assert_eq!(GameConfig::from_args(&args), Ok(GameConfig::default()));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let args = Args::parse_from(["versustris", "--ai-step-ms", "0"]);
        assert_eq!(
            GameConfig::from_args(&args),
            Err(ConfigError::ZeroInterval { name: "ai-step-ms" })
        );
    }

    #[test]
    fn frame_rate_must_be_positive() {
        let config = GameConfig {
            frame_rate: 0.0,
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::FrameRate(0.0)));
        let config = GameConfig {
            frame_rate: f64::NAN,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn error_messages_name_the_flag() {
        let err = ConfigError::ZeroInterval { name: "rule-poll-ms" };
        assert_eq!(err.to_string(), "--rule-poll-ms must be greater than zero");
    }
}
