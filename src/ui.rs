//! Layout and drawing: both boards, the shared sidebar, pause and game-over popups.

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, Cell};
use crate::duel::Outcome;
use crate::pieces::{PieceKind, shape_height, shape_width};
use crate::session::Side;
use crate::snapshot::{DuelSnapshot, SessionSnapshot};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Each board cell is two terminal columns wide so blocks look square.
const CELL_WIDTH: u16 = 2;
const BOARD_OUTER_W: u16 = BOARD_WIDTH as u16 * CELL_WIDTH + 2;
const BOARD_OUTER_H: u16 = BOARD_HEIGHT as u16 + 2;
const SIDEBAR_WIDTH: u16 = 24;
const TOTAL_WIDTH: u16 = BOARD_OUTER_W * 2 + SIDEBAR_WIDTH;

/// Player panel: border, four stat lines and a three-row next preview (tallest shapes).
const PLAYER_PANEL_H: u16 = 9;
const RULES_PANEL_H: u16 = 4;

/// Duration of the line-clear flash in ms.
const LINE_CLEAR_FLASH_MS: u32 = 350;

/// Rainbow colour cycling speed (steps per second) for settled and falling blocks.
const RAINBOW_SETTLED_RATE: f64 = 5.0;
const RAINBOW_ACTIVE_RATE: f64 = 10.0;

/// Line-clear flash per board, created lazily once the board rect is known.
#[derive(Default)]
pub struct Flashes {
    effects: [Option<Effect>; 2],
    armed: [bool; 2],
    last_process: Option<Instant>,
}

impl Flashes {
    /// Start (or restart) the flash on `side`'s board at the next draw.
    pub fn trigger(&mut self, side: Side) {
        self.armed[side.index()] = true;
        self.effects[side.index()] = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.armed.iter().any(|&a| a) || self.effects.iter().any(Option::is_some)
    }
}

/// Everything the renderer needs beyond the snapshot.
pub struct View<'a> {
    pub theme: &'a Theme,
    /// Wall clock in seconds, drives rainbow cycling.
    pub wall_secs: f64,
    pub now: Instant,
    pub animation: bool,
}

/// Draw the whole screen. Never touches engine state.
pub fn draw(frame: &mut Frame, snapshot: &DuelSnapshot, view: &View<'_>, flashes: &mut Flashes) {
    let area = frame.area();
    let theme = view.theme;
    if area.width < TOTAL_WIDTH || area.height < BOARD_OUTER_H {
        let msg = Text::from(vec![
            Line::from("Terminal too small"),
            Line::from(format!("need {}x{}", TOTAL_WIDTH, BOARD_OUTER_H)),
        ]);
        Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.main_fg).bg(theme.bg))
            .render(area, frame.buffer_mut());
        return;
    }

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(TOTAL_WIDTH),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(BOARD_OUTER_H),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_OUTER_W),
            Constraint::Length(SIDEBAR_WIDTH),
            Constraint::Length(BOARD_OUTER_W),
        ])
        .split(vert[1]);

    let boards = [columns[0], columns[2]];
    for side in Side::BOTH {
        draw_board(frame, snapshot, side, boards[side.index()], view);
    }
    draw_sidebar(frame, snapshot, columns[1], theme);

    if view.animation {
        apply_flashes(frame, boards, flashes, view);
    }

    if let Some(outcome) = snapshot.outcome {
        draw_game_over(frame, &outcome, theme, area);
    } else if snapshot.paused {
        draw_pause_overlay(frame, theme, area);
    }
}

/// Colour of a settled cell; `None` for empty cells.
fn settled_color(
    theme: &Theme,
    cell: Cell,
    row: usize,
    col: usize,
    rainbow: bool,
    wall_secs: f64,
) -> Option<Color> {
    match cell {
        Cell::Empty => None,
        Cell::Special(kind) => Some(theme.piece_color(kind)),
        Cell::Filled if rainbow => {
            let phase = (wall_secs * RAINBOW_SETTLED_RATE) as usize;
            Some(theme.rainbow_color(row + col + phase))
        }
        Cell::Filled => Some(theme.settled),
    }
}

fn active_color(theme: &Theme, kind: PieceKind, rainbow: bool, wall_secs: f64) -> Color {
    if rainbow {
        theme.rainbow_color((wall_secs * RAINBOW_ACTIVE_RATE) as usize)
    } else {
        theme.piece_color(kind)
    }
}

/// Board inner rect (no border) for a board's outer rect.
fn board_inner(outer: Rect) -> Rect {
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    }
}

fn draw_board(frame: &mut Frame, snapshot: &DuelSnapshot, side: Side, area: Rect, view: &View<'_>) {
    let theme = view.theme;
    let session = snapshot.session(side);
    let title = format!(" {} ", side.label());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent(side)).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.accent(side)).bold()));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for (row, cells) in session.board.iter().enumerate() {
        for (col, &cell) in cells.iter().enumerate() {
            let active = session.active_at(row as i32, col as i32);
            let color = match active {
                Some(kind) => Some(active_color(theme, kind, snapshot.rainbow, view.wall_secs)),
                None => settled_color(theme, cell, row, col, snapshot.rainbow, view.wall_secs),
            };
            let x = inner.x + col as u16 * CELL_WIDTH;
            let y = inner.y + row as u16;
            if y >= inner.y + inner.height {
                continue;
            }
            for dx in 0..CELL_WIDTH {
                if x + dx >= inner.x + inner.width {
                    continue;
                }
                let style = Style::default().bg(theme.bg);
                match color {
                    Some(c) => buf[(x + dx, y)].set_symbol("█").set_style(style.fg(c)),
                    None => buf[(x + dx, y)].set_symbol(" ").set_style(style),
                };
            }
        }
    }
}

fn draw_sidebar(frame: &mut Frame, snapshot: &DuelSnapshot, area: Rect, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(PLAYER_PANEL_H),
            Constraint::Length(RULES_PANEL_H),
            Constraint::Length(PLAYER_PANEL_H),
        ])
        .split(area);

    draw_player_panel(frame, snapshot.session(Side::Human), chunks[0], theme);

    let rules_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Rules ", Style::default().fg(theme.title)));
    let rules_inner = rules_block.inner(chunks[1]);
    rules_block.render(chunks[1], frame.buffer_mut());
    let status = snapshot.status();
    let lines = vec![
        Line::from(Span::styled(status.label(), Style::default().fg(theme.main_fg))),
        Line::from(Span::styled(
            "P pause  Q quit",
            Style::default().fg(theme.inactive_fg),
        )),
    ];
    Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .render(rules_inner, frame.buffer_mut());

    draw_player_panel(frame, snapshot.session(Side::Ai), chunks[2], theme);
}

fn draw_player_panel(frame: &mut Frame, session: &SessionSnapshot, area: Rect, theme: &Theme) {
    let accent = theme.accent(session.side);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(
            format!(" {} ", session.side.label()),
            Style::default().fg(accent).bold(),
        ));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(3)])
        .split(inner);

    let label = Style::default().fg(theme.title);
    let value = Style::default().fg(theme.main_fg);
    let stats = vec![
        Line::from(vec![
            Span::styled("Score: ", label),
            Span::styled(session.score.to_string(), Style::default().fg(accent).bold()),
        ]),
        Line::from(vec![
            Span::styled("Lines: ", label),
            Span::styled(session.lines_cleared.to_string(), value),
            Span::styled("  Pieces: ", label),
            Span::styled(session.pieces_locked.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Speed: ", label),
            Span::styled(format!("{} ms", session.fall_interval_ms), value),
        ]),
        Line::from(Span::styled("Next", label)),
    ];
    Paragraph::new(Text::from(stats)).render(layout[0], frame.buffer_mut());
    draw_next_preview(frame, session.next, layout[1], theme);
}

/// Next piece in its spawn rotation, centred in `area`.
fn draw_next_preview(frame: &mut Frame, kind: PieceKind, area: Rect, theme: &Theme) {
    let shape = kind.shape(0);
    let w = shape_width(shape) as u16 * CELL_WIDTH;
    let h = shape_height(shape) as u16;
    let off_x = area.width.saturating_sub(w) / 2;
    let off_y = area.height.saturating_sub(h) / 2;
    let color = theme.piece_color(kind);
    let buf = frame.buffer_mut();
    for &(dr, dc) in shape {
        let y = area.y + off_y + dr as u16;
        let x = area.x + off_x + dc as u16 * CELL_WIDTH;
        if y >= area.y + area.height {
            continue;
        }
        for dx in 0..CELL_WIDTH {
            if x + dx < area.x + area.width {
                buf[(x + dx, y)]
                    .set_symbol("█")
                    .set_style(Style::default().fg(color).bg(theme.bg));
            }
        }
    }
}

/// Create armed flashes for their boards and advance running ones (TachyonFX: fade from white).
fn apply_flashes(frame: &mut Frame, boards: [Rect; 2], flashes: &mut Flashes, view: &View<'_>) {
    let delta = flashes
        .last_process
        .map(|t| view.now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flashes.last_process = Some(view.now);

    for side in Side::BOTH {
        let i = side.index();
        let rect = board_inner(boards[i]);
        if flashes.armed[i] {
            flashes.armed[i] = false;
            flashes.effects[i] = Some(
                fx::fade_from(
                    Color::White,
                    view.theme.bg,
                    (LINE_CLEAR_FLASH_MS, Interpolation::Linear),
                )
                .with_area(rect),
            );
        }
        if let Some(effect) = flashes.effects[i].as_mut() {
            frame.render_effect(effect, rect, TfxDuration::from_millis(delta_ms));
            if effect.done() {
                flashes.effects[i] = None;
            }
        }
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P Resume    Q Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    Clear.render(popup, frame.buffer_mut());
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, outcome: &Outcome, theme: &Theme, area: Rect) {
    let popup_w = 30u16;
    let popup_h = 10u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            outcome.message(),
            Style::default().fg(theme.accent(outcome.winner)).bold(),
        )),
        Line::from(Span::styled(
            format!("Player score: {}", outcome.score(Side::Human)),
            Style::default().fg(theme.human),
        )),
        Line::from(Span::styled(
            format!("AI score: {}", outcome.score(Side::Ai)),
            Style::default().fg(theme.ai),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R Restart    Q Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Versustris ", Style::default().fg(theme.title))),
    );
    Clear.render(popup, frame.buffer_mut());
    p.render(popup, frame.buffer_mut());
}
