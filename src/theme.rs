//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::pieces::PieceKind;
use crate::session::Side;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Piece, board and UI colours.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Piece colours indexed by `PieceKind::index`.
    pub pieces: [Color; 9],
    /// Settled blocks of standard pieces.
    pub settled: Color,
    /// Colours cycled over the boards while the rainbow cue is on.
    pub rainbow: [Color; 7],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, lines).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (hints).
    pub inactive_fg: Color,
    /// Accent of the human player's panel.
    pub human: Color,
    /// Accent of the automated player's panel.
    pub ai: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const RAINBOW: [u32; 7] = [
    0xFF0000, 0xFF7F00, 0xFFFF00, 0x00FF00, 0x0000FF, 0x4B0082, 0x8B00FF,
];

impl Default for Theme {
    fn default() -> Self {
        Self {
            pieces: PieceKind::ALL.map(piece_default),
            settled: Color::from_u32(0x7F8C8D),
            rainbow: RAINBOW.map(Color::from_u32),
            bg: Color::from_u32(0x2C3E50),
            div_line: Color::from_u32(0x34495E),
            main_fg: Color::from_u32(0xECF0F1),
            title: Color::from_u32(0xF1C40F),
            inactive_fg: Color::from_u32(0x95A5A6),
            human: Color::from_u32(0x3498DB),
            ai: Color::from_u32(0xE74C3C),
        }
    }
}

fn piece_default(kind: PieceKind) -> Color {
    parse_hex(kind.default_color_hex()).unwrap_or(Color::Gray)
}

fn piece_key(kind: PieceKind) -> String {
    format!("piece_{}", kind.name().to_ascii_lowercase())
}

impl Theme {
    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to the defaults if path is None or the file is missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default()),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        Ok(Self::from_map(&map))
    }

    /// Keys: `piece_i` .. `piece_star`, `settled`, `human`, `ai`, plus btop's `meter_bg`,
    /// `div_line`, `main_fg`, `title` and `inactive_fg`. Unknown or invalid values keep the default.
    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let d = Self::default();
        Self {
            pieces: PieceKind::ALL
                .map(|kind| get(&piece_key(kind)).unwrap_or(d.pieces[kind.index()])),
            settled: get("settled").unwrap_or(d.settled),
            rainbow: d.rainbow,
            bg: get("meter_bg").or_else(|| get("main_bg")).unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
            human: get("human").or_else(|| get("cpu_box")).unwrap_or(d.human),
            ai: get("ai").or_else(|| get("cpu_end")).unwrap_or(d.ai),
        }
    }

    #[inline]
    pub fn piece_color(&self, kind: PieceKind) -> Color {
        self.pieces[kind.index()]
    }

    #[inline]
    pub fn rainbow_color(&self, index: usize) -> Color {
        self.rainbow[index % self.rainbow.len()]
    }

    pub fn accent(&self, side: Side) -> Color {
        match side {
            Side::Human => self.human,
            Side::Ai => self.ai,
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GG0000"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_default_piece_colours() {
        let theme = Theme::default();
        assert_eq!(theme.piece_color(PieceKind::I), Color::Rgb(0, 0xFF, 0xFF));
        assert_eq!(theme.piece_color(PieceKind::Heart), Color::Rgb(0xFF, 0x69, 0xB4));
        assert_eq!(theme.settled, Color::Rgb(0x7F, 0x8C, 0x8D));
        assert_eq!(theme.rainbow_color(7), theme.rainbow_color(0));
    }

    #[test]
    fn test_overrides_from_file_text() {
        let map = parse_theme_file(
            "# comment\ntheme[piece_t]='#010203'\ntheme[settled]=\"#FFF\"\ntheme[ai]=\"nope\"\n",
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.piece_color(PieceKind::T), Color::Rgb(1, 2, 3));
        assert_eq!(theme.settled, Color::Rgb(255, 255, 255));
        assert_eq!(theme.ai, Theme::default().ai);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let theme = Theme::load(Some(Path::new("/nonexistent/versustris.theme"))).unwrap();
        assert_eq!(theme.human, Theme::default().human);
    }
}
