//! Piece catalog: the nine block kinds, their rotation tables and random draws.

use rand::Rng;

/// One cell of a shape as (row offset, column offset) from the piece anchor.
pub type Offset = (i8, i8);

/// One rotation state of a piece.
pub type Shape = &'static [Offset];

const I_SHAPES: &[Shape] = &[
    &[(0, 0), (0, 1), (0, 2), (0, 3)],
    &[(0, 0), (1, 0), (2, 0), (3, 0)],
];
const O_SHAPES: &[Shape] = &[&[(0, 0), (0, 1), (1, 0), (1, 1)]];
const T_SHAPES: &[Shape] = &[
    &[(0, 0), (0, 1), (0, 2), (1, 1)],
    &[(0, 1), (1, 0), (1, 1), (2, 1)],
    &[(1, 0), (0, 1), (1, 1), (1, 2)],
    &[(0, 0), (1, 0), (2, 0), (1, 1)],
];
const S_SHAPES: &[Shape] = &[
    &[(0, 1), (0, 2), (1, 0), (1, 1)],
    &[(0, 0), (1, 0), (1, 1), (2, 1)],
];
const Z_SHAPES: &[Shape] = &[
    &[(0, 0), (0, 1), (1, 1), (1, 2)],
    &[(0, 1), (1, 0), (1, 1), (2, 0)],
];
const J_SHAPES: &[Shape] = &[
    &[(0, 0), (1, 0), (1, 1), (1, 2)],
    &[(0, 0), (0, 1), (1, 0), (2, 0)],
    &[(0, 0), (0, 1), (0, 2), (1, 2)],
    &[(0, 1), (1, 1), (2, 0), (2, 1)],
];
const L_SHAPES: &[Shape] = &[
    &[(0, 0), (0, 1), (0, 2), (1, 0)],
    &[(0, 0), (1, 0), (2, 0), (2, 1)],
    &[(0, 2), (1, 0), (1, 1), (1, 2)],
    &[(0, 0), (0, 1), (1, 1), (2, 1)],
];
const HEART_SHAPES: &[Shape] = &[&[(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)]];
const STAR_SHAPES: &[Shape] = &[&[(0, 2), (1, 0), (1, 1), (1, 2), (1, 3), (1, 4), (2, 2)]];

/// Block kinds: the seven standard tetrominoes plus the two special pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
    Heart,
    Star,
}

impl PieceKind {
    pub const ALL: [Self; 9] = [
        Self::I,
        Self::O,
        Self::T,
        Self::S,
        Self::Z,
        Self::J,
        Self::L,
        Self::Heart,
        Self::Star,
    ];

    /// Drawn uniformly while the special gate is closed.
    pub const STANDARD: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// Rectangular pieces handed out by the gift rule.
    pub const EASY: [Self; 2] = [Self::I, Self::O];

    pub const SPECIAL: [Self; 2] = [Self::Heart, Self::Star];

    /// Rotation states in rotation order. Symmetric pieces have fewer than four.
    pub fn shapes(self) -> &'static [Shape] {
        match self {
            Self::I => I_SHAPES,
            Self::O => O_SHAPES,
            Self::T => T_SHAPES,
            Self::S => S_SHAPES,
            Self::Z => Z_SHAPES,
            Self::J => J_SHAPES,
            Self::L => L_SHAPES,
            Self::Heart => HEART_SHAPES,
            Self::Star => STAR_SHAPES,
        }
    }

    /// Shape for a rotation index, taken modulo the number of states.
    pub fn shape(self, rotation: usize) -> Shape {
        let shapes = self.shapes();
        shapes[rotation % shapes.len()]
    }

    #[inline]
    pub fn rotation_count(self) -> usize {
        self.shapes().len()
    }

    #[inline]
    pub fn next_rotation(self, rotation: usize) -> usize {
        (rotation + 1) % self.rotation_count()
    }

    pub fn is_special(self) -> bool {
        matches!(self, Self::Heart | Self::Star)
    }

    /// Stable slot 0..9 used by the theme's piece palette.
    pub fn index(self) -> usize {
        match self {
            Self::I => 0,
            Self::O => 1,
            Self::T => 2,
            Self::S => 3,
            Self::Z => 4,
            Self::J => 5,
            Self::L => 6,
            Self::Heart => 7,
            Self::Star => 8,
        }
    }

    /// Default display colour as "#RRGGBB".
    pub fn default_color_hex(self) -> &'static str {
        match self {
            Self::I => "#00FFFF",
            Self::O => "#FFFF00",
            Self::T => "#800080",
            Self::S => "#00FF00",
            Self::Z => "#FF0000",
            Self::J => "#0000FF",
            Self::L => "#FF7F00",
            Self::Heart => "#FF69B4",
            Self::Star => "#FFD700",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I => "I",
            Self::O => "O",
            Self::T => "T",
            Self::S => "S",
            Self::Z => "Z",
            Self::J => "J",
            Self::L => "L",
            Self::Heart => "Heart",
            Self::Star => "Star",
        }
    }
}

/// Column span of a shape (max column offset - min column offset + 1).
pub fn shape_width(shape: Shape) -> i32 {
    let (lo, hi) = shape
        .iter()
        .fold((i8::MAX, i8::MIN), |(lo, hi), &(_, dc)| (lo.min(dc), hi.max(dc)));
    i32::from(hi) - i32::from(lo) + 1
}

/// Row span of a shape.
pub fn shape_height(shape: Shape) -> i32 {
    let (lo, hi) = shape
        .iter()
        .fold((i8::MAX, i8::MIN), |(lo, hi), &(dr, _)| (lo.min(dr), hi.max(dr)));
    i32::from(hi) - i32::from(lo) + 1
}

/// Draw the next piece: one of the special pieces while the gate is open, else a standard one.
pub fn random_kind<R: Rng + ?Sized>(rng: &mut R, specials_unlocked: bool) -> PieceKind {
    if specials_unlocked {
        PieceKind::SPECIAL[rng.gen_range(0..PieceKind::SPECIAL.len())]
    } else {
        PieceKind::STANDARD[rng.gen_range(0..PieceKind::STANDARD.len())]
    }
}

pub fn random_easy_kind<R: Rng + ?Sized>(rng: &mut R) -> PieceKind {
    PieceKind::EASY[rng.gen_range(0..PieceKind::EASY.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn every_rotation_keeps_the_cell_count() {
        for kind in PieceKind::ALL {
            let expected = kind.shapes()[0].len();
            for shape in kind.shapes() {
                assert_eq!(shape.len(), expected, "{kind:?}");
            }
        }
    }

    #[test]
    fn symmetric_pieces_have_fewer_states() {
        assert_eq!(PieceKind::O.rotation_count(), 1);
        assert_eq!(PieceKind::I.rotation_count(), 2);
        assert_eq!(PieceKind::S.rotation_count(), 2);
        assert_eq!(PieceKind::T.rotation_count(), 4);
        assert_eq!(PieceKind::Heart.rotation_count(), 1);
    }

    #[test]
    fn widths_match_the_tables() {
        assert_eq!(shape_width(PieceKind::I.shape(0)), 4);
        assert_eq!(shape_width(PieceKind::I.shape(1)), 1);
        assert_eq!(shape_height(PieceKind::I.shape(1)), 4);
        assert_eq!(shape_width(PieceKind::Star.shape(0)), 5);
        assert_eq!(shape_width(PieceKind::O.shape(0)), 2);
    }

    #[test]
    fn indices_are_distinct() {
        let mut seen = [false; 9];
        for kind in PieceKind::ALL {
            assert!(!seen[kind.index()]);
            seen[kind.index()] = true;
        }
    }

    #[test]
    fn draws_respect_the_special_gate() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(!random_kind(&mut rng, false).is_special());
            assert!(random_kind(&mut rng, true).is_special());
            assert!(PieceKind::EASY.contains(&random_easy_kind(&mut rng)));
        }
    }

    proptest! {
        #[test]
        fn rotation_index_stays_in_range(kind_idx in 0usize..9, start in 0usize..64, turns in 0usize..32) {
            let kind = PieceKind::ALL[kind_idx];
            let mut rotation = start % kind.rotation_count();
            for _ in 0..turns {
                rotation = kind.next_rotation(rotation);
                prop_assert!(rotation < kind.rotation_count());
            }
        }
    }
}
