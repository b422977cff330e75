//! Root coordinator: iterative deepening, aspiration windows and MultiPV.

use std::cmp::Reverse;

use crate::board::Move;
use crate::uci::report;

use super::{format_score, RootMove, Worker, INFINITE, MATE_IN_MAX, MAX_PLY};

const ASPIRATION_MIN_DEPTH: i32 = 5;
const ASPIRATION_MAX_FAILS: u32 = 4;

impl Worker<'_> {
    /// Iterative deepening loop. Helpers start one ply deeper on odd ids
    /// to diversify the shared transposition table.
    pub fn run(&mut self) {
        let moves = self.board.generate_moves();
        self.root_moves = moves.iter().map(|&mv| RootMove::new(mv)).collect();
        if self.root_moves.is_empty() {
            return;
        }

        let multipv = self.limits.multipv.clamp(1, self.root_moves.len());
        let max_depth = self.limits.max_depth.clamp(1, (MAX_PLY - 2) as u32);
        let start_depth = (1 + (self.id as u32 & 1)).min(max_depth);

        let mut prev_best = Move::NULL;
        let mut stability = 0u32;

        for depth in start_depth..=max_depth {
            for rm in &mut self.root_moves {
                rm.previous_score = rm.score;
            }
            self.seldepth = 0;

            for pv_idx in 0..multipv {
                if self.stopped {
                    break;
                }
                self.aspiration(depth as i32, pv_idx);
                if self.stopped {
                    break;
                }
                // Float the best remaining line to slot `pv_idx`.
                self.root_moves[pv_idx..]
                    .sort_by_key(|rm| Reverse((rm.score, rm.previous_score)));
            }

            if self.stopped {
                break;
            }
            self.completed_depth = depth;

            let best = self.root_moves[0].mv;
            if best == prev_best {
                stability += 1;
            } else {
                stability = 0;
                prev_best = best;
            }

            if self.id == 0 {
                self.report_iteration(depth, multipv);
                if self.time.soft_exceeded(stability) {
                    self.signals.request_stop();
                    break;
                }
                // With a forced move there is nothing to think about.
                if self.root_moves.len() == 1 && self.time.has_deadline() {
                    break;
                }
            }
        }

        // The main worker going home ends the whole search; helpers have
        // no deadline of their own.
        if self.id == 0 {
            self.signals.request_stop();
        }
        self.flush_nodes();
    }

    /// Search one PV slot at `depth`, starting from a window around the
    /// previous score and widening on failure.
    fn aspiration(&mut self, depth: i32, pv_idx: usize) -> i32 {
        let prev = self.root_moves[pv_idx].average_score;
        if depth < ASPIRATION_MIN_DEPTH || prev.abs() >= MATE_IN_MAX {
            return self.search_root(-INFINITE, INFINITE, depth, pv_idx);
        }

        let mut delta = self.tunables.aspiration_delta;
        let mut alpha = (prev - delta).max(-INFINITE);
        let mut beta = (prev + delta).min(INFINITE);
        let mut search_depth = depth;
        let mut fails = 0u32;

        loop {
            let score = self.search_root(alpha, beta, search_depth, pv_idx);
            if self.stopped {
                return score;
            }

            if score <= alpha {
                // Fail low: pull beta in, widen alpha, restore full depth.
                beta = (alpha + beta) / 2;
                alpha = (score - delta).max(-INFINITE);
                search_depth = depth;
            } else if score >= beta {
                beta = (score + delta).min(INFINITE);
                search_depth = (search_depth - 1).max(1);
            } else {
                return score;
            }

            delta = delta.saturating_mul(2);
            fails += 1;
            if fails >= ASPIRATION_MAX_FAILS {
                alpha = -INFINITE;
                beta = INFINITE;
            }
        }
    }

    /// PVS over the root moves from slot `pv_idx` onward. Slots before
    /// `pv_idx` hold already-settled MultiPV lines and are excluded.
    fn search_root(&mut self, mut alpha: i32, beta: i32, depth: i32, pv_idx: usize) -> i32 {
        self.register_node();

        let stm = self.board.side_to_move();
        let root_in_check = self.board.in_check(stm);
        self.frames[0].in_check = root_in_check;
        self.frames[0].static_eval = if root_in_check { -INFINITE } else { self.evaluate() };
        self.frames[0].excluded = Move::NULL;
        self.frames[0].double_exts = 0;
        self.frames[0].pv.clear();

        let mut best_score = -INFINITE;

        for i in pv_idx..self.root_moves.len() {
            let mv = self.root_moves[i].mv;
            let move_num = (i - pv_idx + 1) as i32;

            let moved_piece = self.board.piece_on(mv.from());
            let info = self.board.make_move(mv);
            self.frames[0].current_move = mv;
            self.frames[0].moved_piece = moved_piece;

            let mut score;
            if move_num == 1 {
                score = -self.search(-beta, -alpha, depth - 1, false, 1);
            } else {
                let mut r = 0;
                if depth >= 3 && move_num >= 4 && !mv.is_tactical() {
                    r = self.lmr_base(depth, move_num as usize).min(depth - 2).max(0);
                }
                score = -self.search(-alpha - 1, -alpha, depth - 1 - r, true, 1);
                if score > alpha && r > 0 {
                    score = -self.search(-alpha - 1, -alpha, depth - 1, true, 1);
                }
                if score > alpha && score < beta {
                    score = -self.search(-beta, -alpha, depth - 1, false, 1);
                }
            }

            self.board.unmake_move(mv, info);
            if self.stopped {
                return best_score;
            }

            if move_num == 1 || score > alpha {
                let seldepth = self.seldepth;
                let child_pv: Vec<Move> = self.frames[1].pv.as_slice().to_vec();
                let rm = &mut self.root_moves[i];
                rm.score = score;
                rm.sel_depth = seldepth;
                rm.average_score = if rm.average_score == -INFINITE {
                    score
                } else {
                    (rm.average_score + score) / 2
                };
                rm.pv.clear();
                rm.pv.push(mv);
                // A zero-window fail-high has no trustworthy child line;
                // the aspiration retry will rebuild it.
                if move_num == 1 || score < beta {
                    rm.pv.extend_from_slice(&child_pv);
                }
            } else {
                self.root_moves[i].score = -INFINITE;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        best_score
    }

    fn report_iteration(&mut self, depth: u32, multipv: usize) {
        self.flush_nodes();
        let nodes = self.signals.nodes();
        let elapsed = self.time.elapsed_ms().max(1);
        let nps = nodes * 1000 / elapsed;
        let hashfull = self.tt.hashfull();

        for (k, rm) in self.root_moves.iter().take(multipv).enumerate() {
            if rm.score == -INFINITE && rm.previous_score == -INFINITE {
                continue;
            }
            let score = if rm.score == -INFINITE {
                rm.previous_score
            } else {
                rm.score
            };
            let pv: Vec<String> = rm.pv.iter().map(|&m| self.board.format_move(m)).collect();
            report::print_info(
                depth,
                rm.sel_depth.max(depth),
                k + 1,
                &format_score(score),
                nodes,
                nps,
                hashfull,
                elapsed,
                &pv.join(" "),
            );
        }
    }
}
