//! Per-worker move-ordering heuristics: butterfly, capture, continuation
//! and countermove tables.
//!
//! Updates use the gravity formula, which saturates entries smoothly at
//! `±HIST_MAX` instead of clamping, so recent results keep moving stale
//! scores.

use crate::board::{Color, Move, Piece, Square};

pub const HIST_MAX: i32 = 16384;

/// The (piece, to-square) of a recently played move, keying continuation
/// history for the plies below it.
pub type ContKey = (Piece, Square);

#[inline]
fn gravity(entry: &mut i16, bonus: i32) {
    let bonus = bonus.clamp(-HIST_MAX, HIST_MAX);
    let decayed = i32::from(*entry) * bonus.abs() / HIST_MAX;
    *entry = (i32::from(*entry) + bonus - decayed) as i16;
}

/// History bonus for a cutoff found at `depth`; the malus is its negation.
#[inline]
#[must_use]
pub fn history_bonus(depth: i32) -> i32 {
    (16 * depth * depth + 32 * depth).min(1600)
}

pub struct HistoryTables {
    /// `butterfly[color][from][to]`
    butterfly: Box<[[[i16; 64]; 64]; 2]>,
    /// `capture[piece][to][captured]`
    capture: Box<[[[i16; 6]; 64]; 6]>,
    /// `continuation[prev_piece][prev_to][piece][to]`, shared by the
    /// 1-ply and 2-ply lookups.
    continuation: Box<[[[[i16; 64]; 6]; 64]; 6]>,
    /// `countermove[prev_piece][prev_to]`
    countermove: Box<[[Move; 64]; 6]>,
}

impl HistoryTables {
    #[must_use]
    pub fn new() -> Self {
        HistoryTables {
            butterfly: Box::new([[[0; 64]; 64]; 2]),
            capture: Box::new([[[0; 6]; 64]; 6]),
            continuation: Box::new([[[[0; 64]; 6]; 64]; 6]),
            countermove: Box::new([[Move::NULL; 64]; 6]),
        }
    }

    pub fn clear(&mut self) {
        self.butterfly = Box::new([[[0; 64]; 64]; 2]);
        self.capture = Box::new([[[0; 6]; 64]; 6]);
        self.continuation = Box::new([[[[0; 64]; 6]; 64]; 6]);
        self.countermove = Box::new([[Move::NULL; 64]; 6]);
    }

    /// Halve every score between searches so old games fade.
    pub fn age(&mut self) {
        for color in self.butterfly.iter_mut() {
            for from in color.iter_mut() {
                for entry in from.iter_mut() {
                    *entry /= 2;
                }
            }
        }
        for piece in self.capture.iter_mut() {
            for to in piece.iter_mut() {
                for entry in to.iter_mut() {
                    *entry /= 2;
                }
            }
        }
        for prev_piece in self.continuation.iter_mut() {
            for prev_to in prev_piece.iter_mut() {
                for piece in prev_to.iter_mut() {
                    for entry in piece.iter_mut() {
                        *entry /= 2;
                    }
                }
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn butterfly(&self, color: Color, mv: Move) -> i32 {
        i32::from(self.butterfly[color.index()][mv.from().index()][mv.to().index()])
    }

    #[inline]
    pub fn update_butterfly(&mut self, color: Color, mv: Move, bonus: i32) {
        gravity(
            &mut self.butterfly[color.index()][mv.from().index()][mv.to().index()],
            bonus,
        );
    }

    #[inline]
    #[must_use]
    pub fn capture(&self, piece: Piece, to: Square, victim: Piece) -> i32 {
        i32::from(self.capture[piece.index()][to.index()][victim.index()])
    }

    #[inline]
    pub fn update_capture(&mut self, piece: Piece, to: Square, victim: Piece, bonus: i32) {
        gravity(
            &mut self.capture[piece.index()][to.index()][victim.index()],
            bonus,
        );
    }

    #[inline]
    #[must_use]
    pub fn continuation(&self, key: ContKey, piece: Piece, to: Square) -> i32 {
        let (prev_piece, prev_to) = key;
        i32::from(
            self.continuation[prev_piece.index()][prev_to.index()][piece.index()][to.index()],
        )
    }

    #[inline]
    pub fn update_continuation(&mut self, key: ContKey, piece: Piece, to: Square, bonus: i32) {
        let (prev_piece, prev_to) = key;
        gravity(
            &mut self.continuation[prev_piece.index()][prev_to.index()][piece.index()]
                [to.index()],
            bonus,
        );
    }

    #[inline]
    #[must_use]
    pub fn counter(&self, key: ContKey) -> Move {
        let (prev_piece, prev_to) = key;
        self.countermove[prev_piece.index()][prev_to.index()]
    }

    #[inline]
    pub fn set_counter(&mut self, key: ContKey, mv: Move) {
        let (prev_piece, prev_to) = key;
        self.countermove[prev_piece.index()][prev_to.index()] = mv;
    }
}

impl Default for HistoryTables {
    fn default() -> Self {
        HistoryTables::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv() -> Move {
        Move::quiet(Square::new(0, 1), Square::new(2, 2))
    }

    #[test]
    fn butterfly_update_and_read() {
        let mut tables = HistoryTables::new();
        tables.update_butterfly(Color::White, mv(), 500);
        assert_eq!(tables.butterfly(Color::White, mv()), 500);
        assert_eq!(tables.butterfly(Color::Black, mv()), 0);
    }

    #[test]
    fn gravity_saturates_below_max() {
        let mut tables = HistoryTables::new();
        for _ in 0..200 {
            tables.update_butterfly(Color::White, mv(), HIST_MAX);
        }
        let score = tables.butterfly(Color::White, mv());
        assert!(score <= HIST_MAX);
        assert!(score > HIST_MAX / 2);

        for _ in 0..400 {
            tables.update_butterfly(Color::White, mv(), -HIST_MAX);
        }
        assert!(tables.butterfly(Color::White, mv()) >= -HIST_MAX);
    }

    #[test]
    fn aging_halves_scores() {
        let mut tables = HistoryTables::new();
        tables.update_butterfly(Color::White, mv(), 1000);
        tables.age();
        assert_eq!(tables.butterfly(Color::White, mv()), 500);
    }

    #[test]
    fn countermove_round_trip() {
        let mut tables = HistoryTables::new();
        let key = (Piece::Knight, Square::new(2, 2));
        assert!(tables.counter(key).is_null());
        tables.set_counter(key, mv());
        assert_eq!(tables.counter(key), mv());
    }

    #[test]
    fn continuation_keys_are_independent() {
        let mut tables = HistoryTables::new();
        let key_a = (Piece::Bishop, Square::new(3, 3));
        let key_b = (Piece::Bishop, Square::new(4, 4));
        tables.update_continuation(key_a, Piece::Knight, Square::new(5, 5), 700);
        assert_eq!(tables.continuation(key_a, Piece::Knight, Square::new(5, 5)), 700);
        assert_eq!(tables.continuation(key_b, Piece::Knight, Square::new(5, 5)), 0);
    }

    #[test]
    fn bonus_scales_with_depth_and_caps() {
        assert!(history_bonus(2) < history_bonus(6));
        assert_eq!(history_bonus(40), 1600);
    }
}
