//! The negamax alpha-beta node: transposition probing, whole-node pruning,
//! singular extensions, late-move reductions and the PVS move loop.

use crate::board::Move;
use crate::tt::Bound;

use super::history::history_bonus;
use super::movepick::{ContHistKeys, MovePicker};
use super::{Worker, DRAW, INFINITE, MATE, MATE_IN_MAX, MAX_PLY};

/// Depth ceilings / margins for the shallow pruning rules.
const RFP_MAX_DEPTH: i32 = 8;
const NMP_VERIFY_DEPTH: i32 = 10;
const PROBCUT_MIN_DEPTH: i32 = 6;
const PROBCUT_BETA_MARGIN: i32 = 200;
const IIR_MIN_DEPTH: i32 = 4;
const FUTILITY_MAX_DEPTH: i32 = 8;
const FUTILITY_MARGIN: i32 = 90;
const LMP_MAX_DEPTH: i32 = 8;
const SEE_PRUNE_MAX_DEPTH: i32 = 8;
const SEE_QUIET_MARGIN: i32 = -90;
const SEE_TACTICAL_MARGIN: i32 = -30;
const SINGULAR_MIN_DEPTH: i32 = 8;
const SINGULAR_MARGIN: i32 = 3;
const DOUBLE_EXT_MARGIN: i32 = 20;
const DOUBLE_EXT_BUDGET: u8 = 6;

/// Moves remembered per node for the cutoff history malus.
const TRIED_CAP: usize = 32;

impl Worker<'_> {
    /// Continuation-history keys addressing the moves made one and two
    /// plies above `ply`.
    pub(crate) fn cont_keys(&self, ply: usize) -> ContHistKeys {
        let key_at = |p: usize| {
            let frame = &self.frames[p];
            if frame.current_move.is_null() {
                None
            } else {
                frame.moved_piece.map(|piece| (piece, frame.current_move.to()))
            }
        };
        ContHistKeys {
            prev1: if ply >= 1 { key_at(ply - 1) } else { None },
            prev2: if ply >= 2 { key_at(ply - 2) } else { None },
        }
    }

    /// Negamax alpha-beta. `cut_node` marks nodes whose parent expects a
    /// fail-high. The return value is meaningless once `self.stopped` is
    /// set; callers must check before using it.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn search(
        &mut self,
        mut alpha: i32,
        mut beta: i32,
        mut depth: i32,
        cut_node: bool,
        ply: usize,
    ) -> i32 {
        debug_assert!(alpha < beta);
        let is_pv = beta - alpha > 1;

        self.frames[ply].pv.clear();

        if depth <= 0 {
            return self.qsearch(alpha, beta, ply);
        }

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

        // Mate distance pruning: neither bound can be beaten by any mate
        // reachable from here.
        alpha = alpha.max(-MATE + ply as i32);
        beta = beta.min(MATE - ply as i32 - 1);
        if alpha >= beta {
            return alpha;
        }

        let stm = self.board.side_to_move();
        let in_check = self.board.in_check(stm);
        let excluded = self.frames[ply].excluded;
        self.frames[ply].in_check = in_check;
        self.frames[ply].double_exts = if ply >= 1 {
            self.frames[ply - 1].double_exts
        } else {
            0
        };
        self.frames[ply + 2].killers = [Move::NULL; 2];

        let key = self.board.hash();
        let tt_hit = if excluded.is_null() {
            self.tt.probe(key, ply)
        } else {
            None
        };
        let tt_move = tt_hit.map_or(Move::NULL, |hit| hit.mv);

        if let Some(hit) = tt_hit {
            if !is_pv && hit.depth >= depth {
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

        let raw_eval = if in_check {
            -INFINITE
        } else {
            match tt_hit {
                Some(hit) if hit.eval > -30000 => hit.eval,
                _ => self.evaluate(),
            }
        };
        self.frames[ply].static_eval = raw_eval;
        let improving = !in_check && ply >= 2 && raw_eval > self.frames[ply - 2].static_eval;

        // ====================================================================
        // Whole-node pruning
        // ====================================================================
        if !is_pv && !in_check && excluded.is_null() {
            // Reverse futility: already so far above beta that a reduced
            // margin cannot bring the score back down.
            if depth <= RFP_MAX_DEPTH
                && raw_eval.abs() < MATE_IN_MAX
                && raw_eval - self.tunables.rfp_margin * (depth - i32::from(improving)) >= beta
            {
                return raw_eval;
            }

            // Null move: hand the opponent a free tempo; a fail-high on the
            // reduced search means the position is won outright.
            if depth >= self.tunables.nmp_min_depth
                && raw_eval >= beta
                && !self.nmp_verifying
                && !self.frames[ply - 1].current_move.is_null()
                && self.board.has_non_pawn_material(stm)
            {
                let r = 3 + depth / 4 + ((raw_eval - beta) / 200).min(3);
                let info = self.board.make_null_move();
                self.frames[ply].current_move = Move::NULL;
                self.frames[ply].moved_piece = None;
                let score = -self.search(-beta, -beta + 1, depth - r, !cut_node, ply + 1);
                self.board.unmake_null_move(info);
                if self.stopped {
                    return 0;
                }
                if score >= beta && score < MATE_IN_MAX {
                    if depth < NMP_VERIFY_DEPTH {
                        return score;
                    }
                    // At high depth, verify with null moves disabled to
                    // catch zugzwang.
                    self.nmp_verifying = true;
                    let verified = self.search(beta - 1, beta, depth - r, false, ply);
                    self.nmp_verifying = false;
                    if self.stopped {
                        return 0;
                    }
                    if verified >= beta {
                        return score;
                    }
                }
            }

            // ProbCut: a good capture that beats beta by a margin at
            // reduced depth will usually hold at full depth.
            if depth >= PROBCUT_MIN_DEPTH && beta.abs() < MATE_IN_MAX {
                let pc_beta = beta + PROBCUT_BETA_MARGIN;
                let pc_depth = depth - 4;
                let captures = self.board.generate_tactical_moves();
                for &mv in &captures {
                    if !self.board.see_ge(mv, 0) {
                        continue;
                    }
                    let moved_piece = self.board.piece_on(mv.from());
                    let info = self.board.make_move(mv);
                    self.frames[ply].current_move = mv;
                    self.frames[ply].moved_piece = moved_piece;
                    let score = -self.search(-pc_beta, -pc_beta + 1, pc_depth, !cut_node, ply + 1);
                    self.board.unmake_move(mv, info);
                    if self.stopped {
                        return 0;
                    }
                    if score >= pc_beta {
                        return score;
                    }
                }
            }

            // Internal iterative reduction: without a hash move this node
            // will order badly, so spend less on it and let the re-visit
            // be cheap.
            if tt_move.is_null() && depth >= IIR_MIN_DEPTH {
                depth -= 1;
            }
        }

        // ====================================================================
        // Singular extension
        // ====================================================================
        let mut singular_ext = 0i32;
        if let Some(hit) = tt_hit {
            if excluded.is_null()
                && self.limits.multipv == 1
                && depth >= SINGULAR_MIN_DEPTH
                && !tt_move.is_null()
                && hit.score.abs() < MATE_IN_MAX
                && matches!(hit.bound, Bound::Lower | Bound::Exact)
                && hit.depth >= depth - 3
            {
                let s_beta = hit.score - SINGULAR_MARGIN * depth;
                let s_depth = (depth - 1) / 2;
                self.frames[ply].excluded = tt_move;
                let value = self.search(s_beta - 1, s_beta, s_depth, cut_node, ply);
                self.frames[ply].excluded = Move::NULL;
                if self.stopped {
                    return 0;
                }
                if value < s_beta {
                    // No other move comes close: the hash move is singular.
                    singular_ext = 1;
                    if !is_pv
                        && value < s_beta - DOUBLE_EXT_MARGIN
                        && self.frames[ply].double_exts < DOUBLE_EXT_BUDGET
                    {
                        singular_ext = 2;
                        self.frames[ply].double_exts += 1;
                    }
                } else if s_beta >= beta {
                    // Multi-cut: even with the best move excluded we beat
                    // beta, so at least two moves fail high.
                    return s_beta;
                }
            }
        }

        // ====================================================================
        // Move loop
        // ====================================================================
        let cont = self.cont_keys(ply);
        let counter = cont
            .prev1
            .map_or(Move::NULL, |key| self.history.counter(key));
        let killers = self.frames[ply].killers;
        let mut picker = MovePicker::new(tt_move, killers, counter, cont, in_check);

        let mut best_score = -INFINITE;
        let mut best_move = Move::NULL;
        let mut move_count = 0i32;
        let mut quiets_tried = [Move::NULL; TRIED_CAP];
        let mut quiets_count = 0usize;
        let mut tacticals_tried = [Move::NULL; TRIED_CAP];
        let mut tacticals_count = 0usize;

        while let Some(mv) = picker.next(&mut self.board, &*self.history) {
            if mv == excluded {
                continue;
            }
            let is_quiet = !mv.is_tactical();
            move_count += 1;

            // Shallow per-move pruning. Disabled while a mate threat is
            // unresolved (best_score still a mated score).
            if !is_pv && !in_check && best_score > -MATE_IN_MAX {
                if is_quiet {
                    let lmp_limit = (3 + depth * depth) / (2 - i32::from(improving));
                    if depth <= LMP_MAX_DEPTH && move_count > lmp_limit {
                        picker.set_skip_quiets();
                        continue;
                    }
                    if depth <= FUTILITY_MAX_DEPTH
                        && raw_eval + FUTILITY_MARGIN * depth <= alpha
                    {
                        picker.set_skip_quiets();
                        continue;
                    }
                    if depth <= SEE_PRUNE_MAX_DEPTH
                        && !self.board.see_ge(mv, SEE_QUIET_MARGIN * depth)
                    {
                        continue;
                    }
                } else if depth <= SEE_PRUNE_MAX_DEPTH
                    && !self.board.see_ge(mv, SEE_TACTICAL_MARGIN * depth * depth)
                {
                    continue;
                }
            }

            // History score feeds the LMR adjustment; read it before the
            // move is made.
            let hist_score = if is_quiet {
                let mut score = self.history.butterfly(stm, mv);
                if let Some(piece) = self.board.piece_on(mv.from()) {
                    if let Some(key) = cont.prev1 {
                        score += self.history.continuation(key, piece, mv.to());
                    }
                }
                score
            } else {
                0
            };

            let mut extension = if mv == tt_move { singular_ext } else { 0 };

            let moved_piece = self.board.piece_on(mv.from());
            let info = self.board.make_move(mv);
            let gives_check = self.board.in_check(self.board.side_to_move());
            self.frames[ply].current_move = mv;
            self.frames[ply].moved_piece = moved_piece;

            if gives_check {
                extension = extension.max(1);
            }
            let new_depth = depth - 1 + extension;

            let mut score;
            if move_count == 1 {
                score = -self.search(-beta, -alpha, new_depth, false, ply + 1);
            } else {
                let mut r = 0;
                if depth >= 3 && move_count >= 3 && is_quiet && !gives_check {
                    r = self.lmr_base(depth, move_count as usize);
                    if cut_node {
                        r += 1;
                    }
                    if tt_move.is_capture() {
                        r += 1;
                    }
                    if is_pv {
                        r -= 1;
                    }
                    if improving {
                        r -= 1;
                    }
                    if in_check {
                        r -= 1;
                    }
                    r -= (hist_score / 8192).clamp(-2, 2);
                    r = r.clamp(0, (new_depth - 1).max(0));
                }

                score = -self.search(-alpha - 1, -alpha, new_depth - r, true, ply + 1);
                if score > alpha && r > 0 {
                    score = -self.search(-alpha - 1, -alpha, new_depth, !cut_node, ply + 1);
                }
                if score > alpha && is_pv && score < beta {
                    score = -self.search(-beta, -alpha, new_depth, false, ply + 1);
                }
            }

            self.board.unmake_move(mv, info);
            if self.stopped {
                return 0;
            }

            if is_quiet {
                if quiets_count < TRIED_CAP {
                    quiets_tried[quiets_count] = mv;
                    quiets_count += 1;
                }
            } else if tacticals_count < TRIED_CAP {
                tacticals_tried[tacticals_count] = mv;
                tacticals_count += 1;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    best_move = mv;
                    if is_pv {
                        let (head, tail) = self.frames.split_at_mut(ply + 1);
                        head[ply].pv.load(mv, &tail[0].pv);
                    }
                    if score >= beta {
                        self.record_cutoff(
                            mv,
                            ply,
                            depth,
                            cont,
                            &quiets_tried[..quiets_count],
                            &tacticals_tried[..tacticals_count],
                        );
                        break;
                    }
                    alpha = score;
                }
            }
        }

        if move_count == 0 {
            if !excluded.is_null() {
                // Everything was excluded: report a fail-low for the
                // singular probe rather than a mate.
                return alpha;
            }
            return if in_check { -MATE + ply as i32 } else { DRAW };
        }

        if excluded.is_null() && !self.stopped {
            let bound = if best_score >= beta {
                Bound::Lower
            } else if best_move.is_null() {
                Bound::Upper
            } else {
                Bound::Exact
            };
            self.tt
                .store(key, best_move, best_score, raw_eval, depth, bound, ply);
        }

        best_score
    }

    /// Beta-cutoff bookkeeping: killers, countermove, butterfly and
    /// continuation bonuses for the cutoff move, maluses for the moves
    /// tried before it, and capture history for tacticals.
    fn record_cutoff(
        &mut self,
        mv: Move,
        ply: usize,
        depth: i32,
        cont: ContHistKeys,
        quiets_tried: &[Move],
        tacticals_tried: &[Move],
    ) {
        let bonus = history_bonus(depth);
        let stm = self.board.side_to_move();

        if !mv.is_tactical() {
            let frame = &mut self.frames[ply];
            if frame.killers[0] != mv {
                frame.killers[1] = frame.killers[0];
                frame.killers[0] = mv;
            }
            if let Some(key) = cont.prev1 {
                self.history.set_counter(key, mv);
            }

            self.history.update_butterfly(stm, mv, bonus);
            if let Some(piece) = self.board.piece_on(mv.from()) {
                if let Some(key) = cont.prev1 {
                    self.history.update_continuation(key, piece, mv.to(), bonus);
                }
                if let Some(key) = cont.prev2 {
                    self.history.update_continuation(key, piece, mv.to(), bonus);
                }
            }

            for &quiet in quiets_tried {
                if quiet == mv {
                    continue;
                }
                self.history.update_butterfly(stm, quiet, -bonus);
                if let Some(piece) = self.board.piece_on(quiet.from()) {
                    if let Some(key) = cont.prev1 {
                        self.history.update_continuation(key, piece, quiet.to(), -bonus);
                    }
                    if let Some(key) = cont.prev2 {
                        self.history.update_continuation(key, piece, quiet.to(), -bonus);
                    }
                }
            }
        } else if mv.is_capture() {
            if let Some(attacker) = self.board.piece_on(mv.from()) {
                let victim = if mv.is_en_passant() {
                    crate::board::Piece::Pawn
                } else {
                    self.board.piece_on(mv.to()).unwrap_or(crate::board::Piece::Pawn)
                };
                self.history.update_capture(attacker, mv.to(), victim, bonus);
            }
        }

        for &tactical in tacticals_tried {
            if tactical == mv || !tactical.is_capture() {
                continue;
            }
            if let Some(attacker) = self.board.piece_on(tactical.from()) {
                let victim = if tactical.is_en_passant() {
                    crate::board::Piece::Pawn
                } else {
                    self.board
                        .piece_on(tactical.to())
                        .unwrap_or(crate::board::Piece::Pawn)
                };
                self.history.update_capture(attacker, tactical.to(), victim, -bonus);
            }
        }
    }
}
