//! Quiescence search: resolve captures (and check evasions) until the
//! position is quiet enough for the static evaluation to stand.

use crate::board::{Move, Piece};
use crate::board::see::SEE_VALUES;
use crate::tt::Bound;

use super::movepick::MovePicker;
use super::{Worker, INFINITE, MATE, MAX_PLY};

/// Stand-pat margin: a capture must be able to lift the eval within this
/// slack of alpha to be worth searching.
const DELTA_MARGIN: i32 = 200;

impl Worker<'_> {
    pub(crate) fn qsearch(&mut self, mut alpha: i32, beta: i32, ply: usize) -> i32 {
        let is_pv = beta - alpha > 1;

        self.register_node();
        if self.stopped {
            return 0;
        }
        self.seldepth = self.seldepth.max(ply as u32);

        if self.board.is_repetition()
            || self.board.halfmove_clock() >= 100
            || self.board.is_insufficient_material()
        {
            return self.draw_score();
        }
        if ply >= MAX_PLY - 1 {
            return self.evaluate();
        }

        let stm = self.board.side_to_move();
        let in_check = self.board.in_check(stm);
        let key = self.board.hash();

        // Quiescence entries are stored with depth 0, so any hit has
        // sufficient depth here.
        let tt_hit = self.tt.probe(key, ply);
        let tt_move = tt_hit.map_or(Move::NULL, |hit| hit.mv);
        if let Some(hit) = tt_hit {
            if !is_pv {
                let cutoff = match hit.bound {
                    Bound::Exact => true,
                    Bound::Lower => hit.score >= beta,
                    Bound::Upper => hit.score <= alpha,
                };
                if cutoff {
                    return hit.score;
                }
            }
        }

        let stand_pat = if in_check {
            -INFINITE
        } else {
            match tt_hit {
                Some(hit) if hit.eval > -30000 => hit.eval,
                _ => self.evaluate(),
            }
        };

        let mut best_score = stand_pat;
        if !in_check {
            if stand_pat >= beta {
                return stand_pat;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
        }

        let cont = self.cont_keys(ply);
        let mut picker = MovePicker::new_qsearch(tt_move, cont, in_check);

        let mut best_move = Move::NULL;
        let mut move_count = 0;

        while let Some(mv) = picker.next(&mut self.board, &*self.history) {
            move_count += 1;

            if !in_check {
                // Delta pruning: even capturing the victim outright cannot
                // bring the score back to alpha.
                if mv.is_capture() && !mv.is_promotion() {
                    let victim = if mv.is_en_passant() {
                        Piece::Pawn
                    } else {
                        self.board.piece_on(mv.to()).unwrap_or(Piece::Pawn)
                    };
                    if stand_pat + SEE_VALUES[victim.index()] + DELTA_MARGIN <= alpha {
                        continue;
                    }
                }
                if !self.board.see_ge(mv, 0) {
                    continue;
                }
            }

            let moved_piece = self.board.piece_on(mv.from());
            let info = self.board.make_move(mv);
            self.frames[ply].current_move = mv;
            self.frames[ply].moved_piece = moved_piece;
            let score = -self.qsearch(-beta, -alpha, ply + 1);
            self.board.unmake_move(mv, info);

            if self.stopped {
                return 0;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    best_move = mv;
                    alpha = score;
                    if score >= beta {
                        break;
                    }
                }
            }
        }

        if in_check && move_count == 0 {
            return -MATE + ply as i32;
        }

        if !self.stopped {
            let bound = if best_score >= beta {
                Bound::Lower
            } else {
                Bound::Upper
            };
            self.tt.store(key, best_move, best_score, stand_pat, 0, bound, ply);
        }

        best_score
    }
}
