//! Board representation: bitboards, move generation, make/unmake with
//! incremental hashing, static exchange evaluation and the static
//! evaluator.

pub mod attacks;
pub mod error;
mod eval;
mod fen;
mod make_unmake;
mod movegen;
pub mod pawn_cache;
mod pst;
pub(crate) mod see;
mod state;
pub mod types;
pub mod zobrist;

#[cfg(test)]
mod tests;

pub use pawn_cache::PawnCache;
pub use state::{Board, NullMoveInfo, UnmakeInfo};
pub use types::{
    Bitboard, Color, Move, MoveList, Piece, ScoredMove, ScoredMoveList, Square, MAX_MOVES,
};
