//! Making and unmaking moves with incremental hash, pawn-key and
//! evaluation updates. `unmake_move` restores the board bitwise.

use super::pst::{MATERIAL_EG, MATERIAL_MG, PHASE_WEIGHTS, PST_EG, PST_MG};
use super::state::{Board, NullMoveInfo, UnmakeInfo};
use super::types::{
    Color, Move, Piece, Square, CASTLE_ALL, CASTLE_BLACK_K, CASTLE_BLACK_Q, CASTLE_WHITE_K,
    CASTLE_WHITE_Q,
};
use super::zobrist;

/// Per-square masks ANDed into the castling rights when a move touches the
/// square. Only the king and rook home squares strip rights.
const CASTLING_UPDATE: [u8; 64] = {
    let mut table = [CASTLE_ALL; 64];
    table[0] = CASTLE_ALL & !CASTLE_WHITE_Q; // a1
    table[4] = CASTLE_ALL & !(CASTLE_WHITE_K | CASTLE_WHITE_Q); // e1
    table[7] = CASTLE_ALL & !CASTLE_WHITE_K; // h1
    table[56] = CASTLE_ALL & !CASTLE_BLACK_Q; // a8
    table[60] = CASTLE_ALL & !(CASTLE_BLACK_K | CASTLE_BLACK_Q); // e8
    table[63] = CASTLE_ALL & !CASTLE_BLACK_K; // h8
    table
};

impl Board {
    /// Place a piece, updating bitboards, hash, pawn key and eval
    /// accumulators together.
    fn put_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        self.set_piece(sq, color, piece);
        let key = zobrist::piece_key(color, piece, sq);
        self.hash ^= key;
        if piece == Piece::Pawn {
            self.pawn_key ^= key;
        }
        let c = color.index();
        let p = piece.index();
        let pst_sq = if color == Color::White {
            sq.index()
        } else {
            sq.flip_rank().index()
        };
        self.eval_mg[c] += MATERIAL_MG[p] + PST_MG[p][pst_sq];
        self.eval_eg[c] += MATERIAL_EG[p] + PST_EG[p][pst_sq];
        self.game_phase[c] += PHASE_WEIGHTS[p];
    }

    /// Exact inverse of `put_piece`.
    fn lift_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        self.remove_piece(sq, color, piece);
        let key = zobrist::piece_key(color, piece, sq);
        self.hash ^= key;
        if piece == Piece::Pawn {
            self.pawn_key ^= key;
        }
        let c = color.index();
        let p = piece.index();
        let pst_sq = if color == Color::White {
            sq.index()
        } else {
            sq.flip_rank().index()
        };
        self.eval_mg[c] -= MATERIAL_MG[p] + PST_MG[p][pst_sq];
        self.eval_eg[c] -= MATERIAL_EG[p] + PST_EG[p][pst_sq];
        self.game_phase[c] -= PHASE_WEIGHTS[p];
    }

    /// Rook shuffle squares for a castling move, derived from the king's
    /// target file.
    fn castle_rook_squares(to: Square) -> (Square, Square) {
        let rank = to.rank();
        if to.file() == 6 {
            (Square::new(rank, 7), Square::new(rank, 5))
        } else {
            (Square::new(rank, 0), Square::new(rank, 3))
        }
    }

    /// Make a move. The returned `UnmakeInfo` must be passed to
    /// `unmake_move` to restore the position exactly.
    pub fn make_move(&mut self, mv: Move) -> UnmakeInfo {
        let color = self.side_to_move();
        let them = color.opponent();

        let info = UnmakeInfo {
            captured: None,
            prev_en_passant: self.en_passant,
            prev_castling: self.castling_rights,
            prev_hash: self.hash,
            prev_pawn_key: self.pawn_key,
            prev_halfmove: self.halfmove_clock,
            prev_fullmove: self.fullmove_number,
            prev_eval_mg: self.eval_mg,
            prev_eval_eg: self.eval_eg,
            prev_phase: self.game_phase,
        };
        self.key_history.push(self.hash);

        self.hash ^= zobrist::side_key();
        if let Some(old_ep) = self.en_passant.take() {
            self.hash ^= zobrist::en_passant_key(old_ep);
        }

        let from = mv.from();
        let to = mv.to();
        let piece = self
            .piece_on(from)
            .expect("make_move: from-square is empty");

        let mut captured = None;
        if mv.is_en_passant() {
            let cap_sq = Square::new(from.rank(), to.file());
            self.lift_piece(them, Piece::Pawn, cap_sq);
            captured = Some(Piece::Pawn);
        } else if mv.is_capture() {
            let victim = self
                .piece_on(to)
                .expect("make_move: capture on empty square");
            self.lift_piece(them, victim, to);
            captured = Some(victim);
        }

        self.lift_piece(color, piece, from);
        if mv.is_castling() {
            self.put_piece(color, Piece::King, to);
            let (rook_from, rook_to) = Self::castle_rook_squares(to);
            self.lift_piece(color, Piece::Rook, rook_from);
            self.put_piece(color, Piece::Rook, rook_to);
        } else {
            let placed = mv.promotion_piece().unwrap_or(piece);
            self.put_piece(color, placed, to);
        }

        if mv.is_double_pawn_push() {
            let ep_sq = Square::new((from.rank() + to.rank()) / 2, from.file());
            self.en_passant = Some(ep_sq);
            self.hash ^= zobrist::en_passant_key(ep_sq);
        }

        if piece == Piece::Pawn || mv.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if color == Color::Black {
            self.fullmove_number += 1;
        }

        let new_rights =
            self.castling_rights & CASTLING_UPDATE[from.index()] & CASTLING_UPDATE[to.index()];
        if new_rights != self.castling_rights {
            self.hash ^=
                zobrist::castling_key(self.castling_rights) ^ zobrist::castling_key(new_rights);
            self.castling_rights = new_rights;
        }

        self.white_to_move = !self.white_to_move;

        UnmakeInfo { captured, ..info }
    }

    /// Undo a move made with `make_move`.
    pub fn unmake_move(&mut self, mv: Move, info: UnmakeInfo) {
        self.white_to_move = !self.white_to_move;
        let color = self.side_to_move();
        let them = color.opponent();

        let from = mv.from();
        let to = mv.to();

        if mv.is_castling() {
            self.remove_piece(to, color, Piece::King);
            self.set_piece(from, color, Piece::King);
            let (rook_from, rook_to) = Self::castle_rook_squares(to);
            self.remove_piece(rook_to, color, Piece::Rook);
            self.set_piece(rook_from, color, Piece::Rook);
        } else {
            let placed = mv.promotion_piece().unwrap_or_else(|| {
                self.piece_on(to)
                    .expect("unmake_move: to-square is empty")
            });
            self.remove_piece(to, color, placed);
            let original = if mv.is_promotion() { Piece::Pawn } else { placed };
            self.set_piece(from, color, original);

            if mv.is_en_passant() {
                let cap_sq = Square::new(from.rank(), to.file());
                self.set_piece(cap_sq, them, Piece::Pawn);
            } else if let Some(victim) = info.captured {
                self.set_piece(to, them, victim);
            }
        }

        self.en_passant = info.prev_en_passant;
        self.castling_rights = info.prev_castling;
        self.hash = info.prev_hash;
        self.pawn_key = info.prev_pawn_key;
        self.halfmove_clock = info.prev_halfmove;
        self.fullmove_number = info.prev_fullmove;
        self.eval_mg = info.prev_eval_mg;
        self.eval_eg = info.prev_eval_eg;
        self.game_phase = info.prev_phase;
        self.key_history.pop();
    }

    /// Pass the turn without moving. Used by null-move pruning.
    pub fn make_null_move(&mut self) -> NullMoveInfo {
        let info = NullMoveInfo {
            prev_en_passant: self.en_passant,
            prev_hash: self.hash,
        };
        self.key_history.push(self.hash);
        self.hash ^= zobrist::side_key();
        if let Some(old_ep) = self.en_passant.take() {
            self.hash ^= zobrist::en_passant_key(old_ep);
        }
        self.white_to_move = !self.white_to_move;
        info
    }

    pub fn unmake_null_move(&mut self, info: NullMoveInfo) {
        self.white_to_move = !self.white_to_move;
        self.en_passant = info.prev_en_passant;
        self.hash = info.prev_hash;
        self.key_history.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_unmake_restores_start_position() {
        let mut board = Board::new();
        let before = board.clone();
        let mv = board.parse_move("e2e4").unwrap();
        let info = board.make_move(mv);
        assert_ne!(board.hash(), before.hash());
        board.unmake_move(mv, info);
        assert_eq!(board.hash(), before.hash());
        assert_eq!(board.pawn_key(), before.pawn_key());
        assert_eq!(board.eval_mg, before.eval_mg);
        assert_eq!(board.game_phase, before.game_phase);
        assert_eq!(board.to_fen(), before.to_fen());
    }

    #[test]
    fn capture_and_unmake_restores_victim() {
        let mut board =
            Board::try_from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2")
                .unwrap();
        let before_fen = board.to_fen();
        let mv = board.parse_move("e4d5").unwrap();
        assert!(mv.is_capture());
        let info = board.make_move(mv);
        board.unmake_move(mv, info);
        assert_eq!(board.to_fen(), before_fen);
    }

    #[test]
    fn en_passant_round_trip() {
        let mut board =
            Board::try_from_fen("rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 3")
                .unwrap();
        let before_fen = board.to_fen();
        let before_hash = board.hash();
        let mv = board.parse_move("d4e3").unwrap();
        assert!(mv.is_en_passant());
        let info = board.make_move(mv);
        board.unmake_move(mv, info);
        assert_eq!(board.to_fen(), before_fen);
        assert_eq!(board.hash(), before_hash);
    }

    #[test]
    fn castling_round_trip_moves_rook() {
        let mut board =
            Board::try_from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let before_fen = board.to_fen();
        let mv = board.parse_move("e1g1").unwrap();
        assert!(mv.is_castling());
        let info = board.make_move(mv);
        assert_eq!(board.piece_on(Square::new(0, 5)), Some(Piece::Rook));
        assert_eq!(board.piece_on(Square::new(0, 6)), Some(Piece::King));
        board.unmake_move(mv, info);
        assert_eq!(board.to_fen(), before_fen);
    }

    #[test]
    fn promotion_round_trip() {
        let mut board = Board::try_from_fen("8/P7/8/8/8/8/8/K1k5 w - - 0 1").unwrap();
        let before_fen = board.to_fen();
        let mv = board.parse_move("a7a8q").unwrap();
        let info = board.make_move(mv);
        assert_eq!(board.piece_on(Square::new(7, 0)), Some(Piece::Queen));
        board.unmake_move(mv, info);
        assert_eq!(board.to_fen(), before_fen);
    }

    #[test]
    fn incremental_hash_matches_recalculated_hash() {
        let mut board = Board::new();
        for uci in ["e2e4", "c7c5", "g1f3", "d7d6", "f1b5", "c8d7", "e1g1"] {
            let mv = board.parse_move(uci).unwrap();
            board.make_move(mv);
            let mut fresh = board.clone();
            fresh.recalculate();
            assert_eq!(board.hash(), fresh.hash(), "hash diverged after {uci}");
            assert_eq!(board.pawn_key(), fresh.pawn_key());
            assert_eq!(board.eval_mg, fresh.eval_mg);
        }
    }

    #[test]
    fn null_move_round_trip() {
        let mut board =
            Board::try_from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1")
                .unwrap();
        let before_hash = board.hash();
        let info = board.make_null_move();
        assert_ne!(board.hash(), before_hash);
        assert!(board.white_to_move());
        board.unmake_null_move(info);
        assert_eq!(board.hash(), before_hash);
        assert!(!board.white_to_move());
    }

    #[test]
    fn rook_capture_strips_castling_rights() {
        let mut board =
            Board::try_from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mv = board.parse_move("a1a8").unwrap();
        board.make_move(mv);
        // Both queenside rights are gone: ours moved, theirs was captured.
        assert_eq!(board.castling_rights & CASTLE_WHITE_Q, 0);
        assert_eq!(board.castling_rights & CASTLE_BLACK_Q, 0);
        assert_ne!(board.castling_rights & CASTLE_BLACK_K, 0);
    }
}
