//! Board state: piece placement, side to move, castling, hashes and the
//! incremental evaluation accumulators.

use super::attacks::{bishop_attacks, rook_attacks, KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};
use super::pst::{MATERIAL_EG, MATERIAL_MG, PHASE_WEIGHTS, PST_EG, PST_MG};
use super::types::{Bitboard, Color, Piece, Square};
use super::zobrist;

/// Reversible state saved by `make_move` and restored by `unmake_move`.
#[derive(Clone, Copy, Debug)]
pub struct UnmakeInfo {
    pub(crate) captured: Option<Piece>,
    pub(crate) prev_en_passant: Option<Square>,
    pub(crate) prev_castling: u8,
    pub(crate) prev_hash: u64,
    pub(crate) prev_pawn_key: u64,
    pub(crate) prev_halfmove: u32,
    pub(crate) prev_fullmove: u32,
    pub(crate) prev_eval_mg: [i32; 2],
    pub(crate) prev_eval_eg: [i32; 2],
    pub(crate) prev_phase: [i32; 2],
}

/// Reversible state for a null move.
#[derive(Clone, Copy, Debug)]
pub struct NullMoveInfo {
    pub(crate) prev_en_passant: Option<Square>,
    pub(crate) prev_hash: u64,
}

#[derive(Clone, Debug)]
pub struct Board {
    pub(crate) pieces: [[Bitboard; 6]; 2],
    pub(crate) occupied: [Bitboard; 2],
    pub(crate) all_occupied: Bitboard,
    pub(crate) white_to_move: bool,
    pub(crate) en_passant: Option<Square>,
    pub(crate) castling_rights: u8,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
    pub(crate) hash: u64,
    pub(crate) pawn_key: u64,
    pub(crate) eval_mg: [i32; 2],
    pub(crate) eval_eg: [i32; 2],
    pub(crate) game_phase: [i32; 2],
    /// Hashes of all prior positions, oldest first. Bounds repetition scans.
    pub(crate) key_history: Vec<u64>,
    pub(crate) chess960: bool,
}

pub(crate) const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    /// Standard starting position.
    #[must_use]
    pub fn new() -> Self {
        Board::try_from_fen(START_FEN).expect("start position FEN is valid")
    }

    pub(crate) fn empty() -> Self {
        Board {
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occupied: [Bitboard::EMPTY; 2],
            all_occupied: Bitboard::EMPTY,
            white_to_move: true,
            en_passant: None,
            castling_rights: 0,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
            pawn_key: 0,
            eval_mg: [0; 2],
            eval_eg: [0; 2],
            game_phase: [0; 2],
            key_history: Vec::with_capacity(256),
            chess960: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    #[must_use]
    pub fn pawn_key(&self) -> u64 {
        self.pawn_key
    }

    #[inline]
    #[must_use]
    pub fn white_to_move(&self) -> bool {
        self.white_to_move
    }

    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        if self.white_to_move {
            Color::White
        } else {
            Color::Black
        }
    }

    #[inline]
    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[inline]
    #[must_use]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    pub fn set_chess960(&mut self, enabled: bool) {
        self.chess960 = enabled;
    }

    #[inline]
    pub(crate) fn set_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        let bb = Bitboard::from_square(sq);
        self.pieces[color.index()][piece.index()] |= bb;
        self.occupied[color.index()] |= bb;
        self.all_occupied |= bb;
    }

    #[inline]
    pub(crate) fn remove_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        let bb = Bitboard::from_square(sq);
        self.pieces[color.index()][piece.index()] ^= bb;
        self.occupied[color.index()] ^= bb;
        self.all_occupied ^= bb;
    }

    /// Piece and owner on a square, if any.
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        if !self.all_occupied.contains(sq) {
            return None;
        }
        let color = if self.occupied[0].contains(sq) {
            Color::White
        } else {
            Color::Black
        };
        for p_idx in 0..6 {
            if self.pieces[color.index()][p_idx].contains(sq) {
                return Some((color, Piece::from_index(p_idx)));
            }
        }
        None
    }

    /// Piece kind on a square, ignoring the owner.
    #[inline]
    #[must_use]
    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.piece_at(sq).map(|(_, piece)| piece)
    }

    #[inline]
    #[must_use]
    pub(crate) fn is_empty_square(&self, sq: Square) -> bool {
        !self.all_occupied.contains(sq)
    }

    #[must_use]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces[color.index()][Piece::King.index()].lsb()
    }

    /// Is `sq` attacked by any piece of `by`?
    #[must_use]
    pub fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        let sq_idx = sq.index();
        let them = by.index();
        let occ = self.all_occupied.0;

        // A pawn of `by` attacks sq iff sq "attacks" it with the opposite
        // pawn pattern.
        if PAWN_ATTACKS[by.opponent().index()][sq_idx] & self.pieces[them][Piece::Pawn.index()].0
            != 0
        {
            return true;
        }
        if KNIGHT_ATTACKS[sq_idx] & self.pieces[them][Piece::Knight.index()].0 != 0 {
            return true;
        }
        if KING_ATTACKS[sq_idx] & self.pieces[them][Piece::King.index()].0 != 0 {
            return true;
        }
        let diag = self.pieces[them][Piece::Bishop.index()].0 | self.pieces[them][Piece::Queen.index()].0;
        if diag != 0 && bishop_attacks(sq_idx, occ) & diag != 0 {
            return true;
        }
        let straight =
            self.pieces[them][Piece::Rook.index()].0 | self.pieces[them][Piece::Queen.index()].0;
        straight != 0 && rook_attacks(sq_idx, occ) & straight != 0
    }

    /// All pieces of both colors attacking `sq` under the given occupancy.
    #[must_use]
    pub(crate) fn attackers_to(&self, sq: Square, occupancy: u64) -> Bitboard {
        let sq_idx = sq.index();
        let mut attackers = 0u64;

        attackers |= PAWN_ATTACKS[Color::Black.index()][sq_idx]
            & self.pieces[Color::White.index()][Piece::Pawn.index()].0;
        attackers |= PAWN_ATTACKS[Color::White.index()][sq_idx]
            & self.pieces[Color::Black.index()][Piece::Pawn.index()].0;
        attackers |= KNIGHT_ATTACKS[sq_idx]
            & (self.pieces[0][Piece::Knight.index()].0 | self.pieces[1][Piece::Knight.index()].0);
        attackers |= KING_ATTACKS[sq_idx]
            & (self.pieces[0][Piece::King.index()].0 | self.pieces[1][Piece::King.index()].0);
        attackers |= bishop_attacks(sq_idx, occupancy) & self.diagonal_sliders().0;
        attackers |= rook_attacks(sq_idx, occupancy) & self.straight_sliders().0;

        Bitboard(attackers & occupancy)
    }

    #[inline]
    #[must_use]
    pub(crate) fn diagonal_sliders(&self) -> Bitboard {
        Bitboard(
            self.pieces[0][Piece::Bishop.index()].0
                | self.pieces[0][Piece::Queen.index()].0
                | self.pieces[1][Piece::Bishop.index()].0
                | self.pieces[1][Piece::Queen.index()].0,
        )
    }

    #[inline]
    #[must_use]
    pub(crate) fn straight_sliders(&self) -> Bitboard {
        Bitboard(
            self.pieces[0][Piece::Rook.index()].0
                | self.pieces[0][Piece::Queen.index()].0
                | self.pieces[1][Piece::Rook.index()].0
                | self.pieces[1][Piece::Queen.index()].0,
        )
    }

    /// Is the given side's king currently attacked?
    #[must_use]
    pub fn in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .is_some_and(|sq| self.is_square_attacked(sq, color.opponent()))
    }

    /// Side to move has at least one piece besides pawns and the king.
    /// Gates null-move pruning against zugzwang positions.
    #[must_use]
    pub fn has_non_pawn_material(&self, color: Color) -> bool {
        let c = color.index();
        let pawns_and_king =
            self.pieces[c][Piece::Pawn.index()].0 | self.pieces[c][Piece::King.index()].0;
        self.occupied[c].0 & !pawns_and_king != 0
    }

    /// Threefold repetition: the current position already occurred twice
    /// within the 50-move window, so it now stands for the third time.
    #[must_use]
    pub fn is_repetition(&self) -> bool {
        let window = self.halfmove_clock as usize;
        self.key_history
            .iter()
            .rev()
            .take(window)
            .filter(|&&key| key == self.hash)
            .count()
            >= 2
    }

    /// Draw test: threefold repetition, 50-move rule, or insufficient
    /// material.
    #[must_use]
    pub fn is_draw(&self) -> bool {
        self.halfmove_clock >= 100 || self.is_insufficient_material() || self.is_repetition()
    }

    /// Neither side can force mate: K vs K, K+minor vs K, or same-colored
    /// bishops only.
    #[must_use]
    pub fn is_insufficient_material(&self) -> bool {
        let pawns = self.pieces[0][Piece::Pawn.index()].0 | self.pieces[1][Piece::Pawn.index()].0;
        let rooks = self.pieces[0][Piece::Rook.index()].0 | self.pieces[1][Piece::Rook.index()].0;
        let queens = self.pieces[0][Piece::Queen.index()].0 | self.pieces[1][Piece::Queen.index()].0;
        if pawns != 0 || rooks != 0 || queens != 0 {
            return false;
        }

        let knights = self.pieces[0][Piece::Knight.index()].0 | self.pieces[1][Piece::Knight.index()].0;
        let bishops = self.pieces[0][Piece::Bishop.index()].0 | self.pieces[1][Piece::Bishop.index()].0;
        let minors = (knights | bishops).count_ones();

        if minors <= 1 {
            return true;
        }

        if knights == 0 && minors == 2 {
            let light: u64 = 0x55AA_55AA_55AA_55AA;
            let dark: u64 = !light;
            return bishops & light == 0 || bishops & dark == 0;
        }

        false
    }

    /// Recompute hash, pawn key and evaluation accumulators from scratch.
    /// Used after FEN parsing; the make/unmake path maintains them
    /// incrementally.
    pub(crate) fn recalculate(&mut self) {
        let mut hash = 0u64;
        let mut pawn_key = 0u64;
        self.eval_mg = [0; 2];
        self.eval_eg = [0; 2];
        self.game_phase = [0; 2];

        for color in [Color::White, Color::Black] {
            let c = color.index();
            for p_idx in 0..6 {
                let piece = Piece::from_index(p_idx);
                for sq in self.pieces[c][p_idx].iter() {
                    hash ^= zobrist::piece_key(color, piece, sq);
                    if piece == Piece::Pawn {
                        pawn_key ^= zobrist::piece_key(color, piece, sq);
                    }
                    let pst_sq = if color == Color::White {
                        sq.index()
                    } else {
                        sq.flip_rank().index()
                    };
                    self.eval_mg[c] += MATERIAL_MG[p_idx] + PST_MG[p_idx][pst_sq];
                    self.eval_eg[c] += MATERIAL_EG[p_idx] + PST_EG[p_idx][pst_sq];
                    self.game_phase[c] += PHASE_WEIGHTS[p_idx];
                }
            }
        }

        if !self.white_to_move {
            hash ^= zobrist::side_key();
        }
        hash ^= zobrist::castling_key(self.castling_rights);
        if let Some(ep) = self.en_passant {
            hash ^= zobrist::en_passant_key(ep);
        }

        self.hash = hash;
        self.pawn_key = pawn_key;
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}
