//! Zobrist keys for position hashing.
//!
//! Keys are generated once from a fixed PRNG seed, so every engine instance
//! in the same process (and across processes) agrees on hashes.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::types::{Color, Piece, Square};

const ZOBRIST_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

pub struct ZobristKeys {
    /// `pieces[color][piece][square]`
    pub pieces: [[[u64; 64]; 6]; 2],
    /// Indexed by the 4-bit castling rights mask.
    pub castling: [u64; 16],
    /// Indexed by en-passant file.
    pub en_passant_file: [u64; 8],
    pub side_to_move: u64,
}

pub static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
    let mut keys = ZobristKeys {
        pieces: [[[0; 64]; 6]; 2],
        castling: [0; 16],
        en_passant_file: [0; 8],
        side_to_move: 0,
    };
    for color in &mut keys.pieces {
        for piece in color.iter_mut() {
            for sq in piece.iter_mut() {
                *sq = rng.gen();
            }
        }
    }
    // Single-right keys; composite masks are the XOR of their components so
    // that incremental right removal composes.
    let mut single = [0u64; 4];
    for key in &mut single {
        *key = rng.gen();
    }
    for (mask, slot) in keys.castling.iter_mut().enumerate() {
        let mut key = 0u64;
        for (bit, single_key) in single.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                key ^= single_key;
            }
        }
        *slot = key;
    }
    for key in &mut keys.en_passant_file {
        *key = rng.gen();
    }
    keys.side_to_move = rng.gen();
    keys
});

#[inline]
#[must_use]
pub fn piece_key(color: Color, piece: Piece, sq: Square) -> u64 {
    ZOBRIST.pieces[color.index()][piece.index()][sq.index()]
}

#[inline]
#[must_use]
pub fn castling_key(rights: u8) -> u64 {
    ZOBRIST.castling[(rights & 0xF) as usize]
}

#[inline]
#[must_use]
pub fn en_passant_key(sq: Square) -> u64 {
    ZOBRIST.en_passant_file[sq.file()]
}

#[inline]
#[must_use]
pub fn side_key() -> u64 {
    ZOBRIST.side_to_move
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic() {
        let a = piece_key(Color::White, Piece::Knight, Square::new(0, 1));
        let b = piece_key(Color::White, Piece::Knight, Square::new(0, 1));
        assert_eq!(a, b);
        assert_ne!(a, 0);
    }

    #[test]
    fn castling_keys_compose() {
        use crate::board::types::{CASTLE_WHITE_K, CASTLE_WHITE_Q};
        let composite = castling_key(CASTLE_WHITE_K | CASTLE_WHITE_Q);
        assert_eq!(
            composite,
            castling_key(CASTLE_WHITE_K) ^ castling_key(CASTLE_WHITE_Q)
        );
        assert_eq!(castling_key(0), 0);
    }

    #[test]
    fn distinct_features_have_distinct_keys() {
        let a = piece_key(Color::White, Piece::Pawn, Square::new(1, 0));
        let b = piece_key(Color::Black, Piece::Pawn, Square::new(1, 0));
        let c = piece_key(Color::White, Piece::Pawn, Square::new(1, 1));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
