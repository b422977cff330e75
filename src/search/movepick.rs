//! Staged, lazily-ordered move picking.
//!
//! Stages emit in the order: TT move, winning tacticals, killers,
//! countermove, remaining quiets, losing tacticals. Within a scored stage
//! the best remaining move is selected per call, which costs nothing at
//! nodes that cut off early. Quiet stages can be switched off mid-node
//! once a pruning rule decides quiets are hopeless.

use crate::board::{Board, Move, Piece, ScoredMoveList};

use super::history::{ContKey, HistoryTables};
use crate::board::see::SEE_VALUES;

/// Ordering bonus that puts queen promotions with the winning captures.
const QUEEN_PROMO_BONUS: i32 = 1 << 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    TtMove,
    GenTacticals,
    GoodTacticals,
    Killer1,
    Killer2,
    Counter,
    GenQuiets,
    Quiets,
    BadTacticals,
    Done,
}

/// Continuation-history context for quiet scoring: the (piece, to) keys of
/// the moves played one and two plies above this node.
#[derive(Clone, Copy, Default)]
pub struct ContHistKeys {
    pub prev1: Option<ContKey>,
    pub prev2: Option<ContKey>,
}

pub struct MovePicker {
    stage: Stage,
    tt_move: Move,
    killers: [Move; 2],
    counter: Move,
    cont: ContHistKeys,
    tacticals: ScoredMoveList,
    bad_tacticals: ScoredMoveList,
    quiets: ScoredMoveList,
    tactical_idx: usize,
    bad_idx: usize,
    quiet_idx: usize,
    skip_quiets: bool,
    qsearch: bool,
    in_check: bool,
}

impl MovePicker {
    /// Picker for a main-search node.
    #[must_use]
    pub fn new(
        tt_move: Move,
        killers: [Move; 2],
        counter: Move,
        cont: ContHistKeys,
        in_check: bool,
    ) -> Self {
        MovePicker {
            stage: Stage::TtMove,
            tt_move,
            killers,
            counter,
            cont,
            tacticals: ScoredMoveList::new(),
            bad_tacticals: ScoredMoveList::new(),
            quiets: ScoredMoveList::new(),
            tactical_idx: 0,
            bad_idx: 0,
            quiet_idx: 0,
            skip_quiets: false,
            qsearch: false,
            in_check,
        }
    }

    /// Picker for quiescence: tacticals only, or all evasions in check.
    #[must_use]
    pub fn new_qsearch(tt_move: Move, cont: ContHistKeys, in_check: bool) -> Self {
        MovePicker {
            stage: Stage::TtMove,
            tt_move,
            killers: [Move::NULL; 2],
            counter: Move::NULL,
            cont,
            tacticals: ScoredMoveList::new(),
            bad_tacticals: ScoredMoveList::new(),
            quiets: ScoredMoveList::new(),
            tactical_idx: 0,
            bad_idx: 0,
            quiet_idx: 0,
            skip_quiets: false,
            qsearch: true,
            in_check,
        }
    }

    /// Stop emitting killers, the countermove and remaining quiets.
    pub fn set_skip_quiets(&mut self) {
        self.skip_quiets = true;
    }

    fn tactical_score(board: &Board, history: &HistoryTables, mv: Move) -> i32 {
        let promo_bonus = if mv.promotion_piece() == Some(Piece::Queen) {
            QUEEN_PROMO_BONUS
        } else {
            0
        };
        let Some(attacker) = board.piece_on(mv.from()) else {
            return promo_bonus;
        };
        let victim = if mv.is_en_passant() {
            Some(Piece::Pawn)
        } else {
            board.piece_on(mv.to())
        };
        match victim {
            Some(victim) => {
                promo_bonus
                    + 16 * SEE_VALUES[victim.index()]
                    + history.capture(attacker, mv.to(), victim)
            }
            None => promo_bonus,
        }
    }

    fn quiet_score(&self, board: &Board, history: &HistoryTables, mv: Move) -> i32 {
        let mut score = history.butterfly(board.side_to_move(), mv);
        if let Some(piece) = board.piece_on(mv.from()) {
            if let Some(key) = self.cont.prev1 {
                score += history.continuation(key, piece, mv.to());
            }
            if let Some(key) = self.cont.prev2 {
                score += history.continuation(key, piece, mv.to());
            }
        }
        score
    }

    fn generate_tacticals(&mut self, board: &mut Board, history: &HistoryTables) {
        if self.qsearch && self.in_check {
            // One ply of evasions: every legal move, tacticals first.
            let moves = board.generate_moves();
            for &mv in &moves {
                if mv == self.tt_move {
                    continue;
                }
                let score = if mv.is_tactical() {
                    (1 << 16) + Self::tactical_score(board, history, mv)
                } else {
                    self.quiet_score(board, history, mv)
                };
                self.tacticals.push(mv, score);
            }
            return;
        }

        let moves = board.generate_tactical_moves();
        for &mv in &moves {
            if mv == self.tt_move {
                continue;
            }
            self.tacticals
                .push(mv, Self::tactical_score(board, history, mv));
        }
    }

    fn generate_quiets(&mut self, board: &mut Board, history: &HistoryTables) {
        let moves = board.generate_moves();
        for &mv in &moves {
            if mv.is_tactical()
                || mv == self.tt_move
                || mv == self.killers[0]
                || mv == self.killers[1]
                || mv == self.counter
            {
                continue;
            }
            let score = self.quiet_score(board, history, mv);
            self.quiets.push(mv, score);
        }
    }

    /// Emit the next move, or `None` when the node is exhausted. All moves
    /// returned are legal.
    pub fn next(&mut self, board: &mut Board, history: &HistoryTables) -> Option<Move> {
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.stage = Stage::GenTacticals;
                    if self.tt_move.is_null() {
                        continue;
                    }
                    // In quiescence only tactical TT moves apply, unless we
                    // are evading check.
                    if self.qsearch && !self.in_check && !self.tt_move.is_tactical() {
                        continue;
                    }
                    if board.is_legal_move(self.tt_move) {
                        return Some(self.tt_move);
                    }
                }
                Stage::GenTacticals => {
                    self.generate_tacticals(board, history);
                    self.stage = Stage::GoodTacticals;
                }
                Stage::GoodTacticals => {
                    if let Some(scored) = self.tacticals.pick_best(self.tactical_idx) {
                        self.tactical_idx += 1;
                        // In the main search, losing captures wait until the
                        // end. Queen promotions never count as losing.
                        if !self.qsearch
                            && scored.score < QUEEN_PROMO_BONUS
                            && !board.see_ge(scored.mv, 0)
                        {
                            self.bad_tacticals.push(scored.mv, scored.score);
                            continue;
                        }
                        return Some(scored.mv);
                    }
                    if self.qsearch {
                        self.stage = Stage::Done;
                        return None;
                    }
                    self.stage = Stage::Killer1;
                }
                Stage::Killer1 => {
                    self.stage = Stage::Killer2;
                    let killer = self.killers[0];
                    if !self.skip_quiets
                        && !killer.is_null()
                        && killer != self.tt_move
                        && !killer.is_tactical()
                        && board.is_legal_move(killer)
                    {
                        return Some(killer);
                    }
                }
                Stage::Killer2 => {
                    self.stage = Stage::Counter;
                    let killer = self.killers[1];
                    if !self.skip_quiets
                        && !killer.is_null()
                        && killer != self.tt_move
                        && killer != self.killers[0]
                        && !killer.is_tactical()
                        && board.is_legal_move(killer)
                    {
                        return Some(killer);
                    }
                }
                Stage::Counter => {
                    self.stage = Stage::GenQuiets;
                    let counter = self.counter;
                    if !self.skip_quiets
                        && !counter.is_null()
                        && counter != self.tt_move
                        && counter != self.killers[0]
                        && counter != self.killers[1]
                        && !counter.is_tactical()
                        && board.is_legal_move(counter)
                    {
                        return Some(counter);
                    }
                }
                Stage::GenQuiets => {
                    if !self.skip_quiets {
                        self.generate_quiets(board, history);
                    }
                    self.stage = Stage::Quiets;
                }
                Stage::Quiets => {
                    if !self.skip_quiets {
                        if let Some(scored) = self.quiets.pick_best(self.quiet_idx) {
                            self.quiet_idx += 1;
                            return Some(scored.mv);
                        }
                    }
                    self.stage = Stage::BadTacticals;
                }
                Stage::BadTacticals => {
                    if let Some(scored) = self.bad_tacticals.pick_best(self.bad_idx) {
                        self.bad_idx += 1;
                        return Some(scored.mv);
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return None,
            }
        }
    }
}
