//! Board: fixed 10x20 occupancy grid. Row 0 is the top.

use crate::pieces::{PieceKind, Shape};
use std::collections::VecDeque;

pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

/// A single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    /// Settled block of a standard piece.
    Filled,
    /// Settled block of a special piece; the kind is kept for rendering only.
    Special(PieceKind),
}

impl Cell {
    #[inline]
    pub fn is_filled(self) -> bool {
        !matches!(self, Self::Empty)
    }

    /// Marker written when a piece of `kind` locks.
    pub fn marker_for(kind: PieceKind) -> Self {
        if kind.is_special() {
            Self::Special(kind)
        } else {
            Self::Filled
        }
    }
}

/// Reference position a shape's offsets are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub row: i32,
    pub col: i32,
}

impl Anchor {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Spawn anchor: top row, column `WIDTH / 2 - 1`.
    pub const fn spawn() -> Self {
        Self::new(0, BOARD_WIDTH as i32 / 2 - 1)
    }

    pub const fn offset(self, drow: i32, dcol: i32) -> Self {
        Self::new(self.row + drow, self.col + dcol)
    }

    /// Absolute board coordinates of every cell of `shape` placed here.
    pub fn cells(self, shape: Shape) -> impl Iterator<Item = (i32, i32)> {
        shape
            .iter()
            .map(move |&(dr, dc)| (self.row + i32::from(dr), self.col + i32::from(dc)))
    }
}

type Row = [Cell; BOARD_WIDTH];

/// Occupancy grid. `rows[0]` is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: VecDeque<Row>,
}

impl Board {
    pub fn new() -> Self {
        Self {
            rows: (0..BOARD_HEIGHT).map(|_| [Cell::Empty; BOARD_WIDTH]).collect(),
        }
    }

    #[inline]
    fn in_bounds(row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < BOARD_HEIGHT && (col as usize) < BOARD_WIDTH
    }

    /// Cell at (row, col); `None` when out of bounds.
    #[inline]
    pub fn get(&self, row: i32, col: i32) -> Option<Cell> {
        if !Self::in_bounds(row, col) {
            return None;
        }
        self.rows.get(row as usize).map(|r| r[col as usize])
    }

    /// Write a cell; out-of-bounds writes are skipped. Returns whether the cell was written.
    pub fn set(&mut self, row: i32, col: i32, cell: Cell) -> bool {
        if !Self::in_bounds(row, col) {
            return false;
        }
        match self.rows.get_mut(row as usize) {
            Some(r) => {
                r[col as usize] = cell;
                true
            }
            None => false,
        }
    }

    /// True iff every cell of `shape` at `anchor` is on the grid and empty.
    pub fn is_valid_placement(&self, shape: Shape, anchor: Anchor) -> bool {
        anchor
            .cells(shape)
            .all(|(row, col)| self.get(row, col) == Some(Cell::Empty))
    }

    /// Write `marker` into every in-bounds cell of `shape` at `anchor`.
    pub fn lock(&mut self, shape: Shape, anchor: Anchor, marker: Cell) {
        for (row, col) in anchor.cells(shape) {
            self.set(row, col, marker);
        }
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .is_some_and(|r| r.iter().all(|c| c.is_filled()))
    }

    /// Number of rows with no empty cell.
    pub fn full_row_count(&self) -> usize {
        (0..BOARD_HEIGHT).filter(|&y| self.is_row_full(y)).count()
    }

    /// Remove every full row and push an empty row on top for each; returns how many were removed.
    pub fn clear_completed_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| !r.iter().all(|c| c.is_filled()));
        let cleared = before - self.rows.len();
        for _ in 0..cleared {
            self.rows.push_front([Cell::Empty; BOARD_WIDTH]);
        }
        cleared
    }

    #[cfg(test)]
    pub fn filled_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.iter().filter(|c| c.is_filled()).count())
            .sum()
    }

    /// Rows top to bottom.
    #[cfg(test)]
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Height of each column: distance from the bottom edge to its topmost filled cell (0 if empty).
    pub fn column_heights(&self) -> [u32; BOARD_WIDTH] {
        let mut heights = [0u32; BOARD_WIDTH];
        for (col, h) in heights.iter_mut().enumerate() {
            if let Some(top) = self.rows.iter().position(|r| r[col].is_filled()) {
                *h = (BOARD_HEIGHT - top) as u32;
            }
        }
        heights
    }

    /// Copy of the grid as a fixed matrix (for snapshots).
    pub fn to_matrix(&self) -> [Row; BOARD_HEIGHT] {
        let mut out = [[Cell::Empty; BOARD_WIDTH]; BOARD_HEIGHT];
        for (dst, src) in out.iter_mut().zip(self.rows.iter()) {
            *dst = *src;
        }
        out
    }

    /// Build a board from text rows (`#` filled, anything else empty), bottom-aligned.
    #[cfg(test)]
    pub fn from_ascii(lines: &[&str]) -> Self {
        let mut board = Self::new();
        let offset = BOARD_HEIGHT - lines.len();
        for (i, line) in lines.iter().enumerate() {
            for (col, ch) in line.chars().take(BOARD_WIDTH).enumerate() {
                if ch == '#' {
                    board.set((offset + i) as i32, col as i32, Cell::Filled);
                }
            }
        }
        board
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_board_is_empty() {
        let board = Board::new();
        assert_eq!(board.filled_count(), 0);
        assert_eq!(board.rows().count(), BOARD_HEIGHT);
        assert_eq!(board.get(0, 0), Some(Cell::Empty));
        assert_eq!(board.get(-1, 0), None);
        assert_eq!(board.get(0, BOARD_WIDTH as i32), None);
        assert_eq!(board.get(BOARD_HEIGHT as i32, 0), None);
    }

    #[test]
    fn placement_rejects_walls_floor_and_blocks() {
        let mut board = Board::new();
        let o = PieceKind::O.shape(0);
        assert!(board.is_valid_placement(o, Anchor::new(0, 0)));
        assert!(board.is_valid_placement(o, Anchor::new(18, 8)));
        assert!(!board.is_valid_placement(o, Anchor::new(19, 0)));
        assert!(!board.is_valid_placement(o, Anchor::new(0, 9)));
        assert!(!board.is_valid_placement(o, Anchor::new(0, -1)));
        assert!(!board.is_valid_placement(o, Anchor::new(-1, 0)));
        board.set(5, 5, Cell::Filled);
        assert!(!board.is_valid_placement(o, Anchor::new(4, 4)));
    }

    #[test]
    fn lock_skips_out_of_bounds_cells() {
        let mut board = Board::new();
        board.lock(PieceKind::I.shape(0), Anchor::new(0, 8), Cell::Filled);
        assert_eq!(board.filled_count(), 2);
    }

    #[test]
    fn special_marker_keeps_the_kind() {
        let mut board = Board::new();
        let heart = PieceKind::Heart;
        board.lock(heart.shape(0), Anchor::new(10, 2), Cell::marker_for(heart));
        assert_eq!(board.get(10, 3), Some(Cell::Special(PieceKind::Heart)));
        assert_eq!(Cell::marker_for(PieceKind::T), Cell::Filled);
    }

    #[test]
    fn clearing_collapses_rows_above() {
        let mut board = Board::from_ascii(&[
            "#.........",
            "##########",
            "..#.......",
            "##########",
        ]);
        assert_eq!(board.full_row_count(), 2);
        assert_eq!(board.clear_completed_rows(), 2);
        assert_eq!(board.filled_count(), 2);
        assert_eq!(board.get(18, 0), Some(Cell::Filled));
        assert_eq!(board.get(19, 2), Some(Cell::Filled));
        assert_eq!(board.get(17, 0), Some(Cell::Empty));
    }

    #[test]
    fn clearing_without_full_rows_changes_nothing() {
        let mut board = Board::from_ascii(&["#########.", ".#.#.#.#.#"]);
        let before = board.clone();
        assert_eq!(board.clear_completed_rows(), 0);
        assert_eq!(board, before);
    }

    #[test]
    fn column_heights_measure_from_the_floor() {
        let board = Board::from_ascii(&["#.........", "#...#....."]);
        let heights = board.column_heights();
        assert_eq!(heights[0], 2);
        assert_eq!(heights[4], 1);
        assert_eq!(heights[9], 0);
    }

    proptest! {
        #[test]
        fn lock_then_same_placement_is_invalid(kind_idx in 0usize..9, rot in 0usize..4, row in 0i32..20, col in 0i32..10) {
            let kind = PieceKind::ALL[kind_idx];
            let shape = kind.shape(rot);
            let mut board = Board::new();
            let anchor = Anchor::new(row, col);
            prop_assume!(board.is_valid_placement(shape, anchor));
            board.lock(shape, anchor, Cell::marker_for(kind));
            prop_assert!(!board.is_valid_placement(shape, anchor));
            prop_assert_eq!(board.filled_count(), shape.len());
        }

        #[test]
        fn clearing_removes_width_cells_per_row(bits in proptest::collection::vec(0u16..1024, BOARD_HEIGHT)) {
            let mut board = Board::new();
            for (row, mask) in bits.iter().enumerate() {
                // every third row is forced full
                let mask = if row % 3 == 0 { 0x3FF } else { *mask };
                for col in 0..BOARD_WIDTH {
                    if mask & (1 << col) != 0 {
                        board.set(row as i32, col as i32, Cell::Filled);
                    }
                }
            }
            let before = board.filled_count();
            let full = board.full_row_count();
            let cleared = board.clear_completed_rows();
            prop_assert_eq!(cleared, full);
            prop_assert_eq!(board.filled_count(), before - cleared * BOARD_WIDTH);
            prop_assert_eq!(board.full_row_count(), 0);
        }
    }
}
