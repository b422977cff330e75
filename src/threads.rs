//! Lazy-SMP worker pool.
//!
//! Every worker runs a full iterative-deepening search over its own board
//! clone and history tables; coordination happens through the shared
//! transposition table and the `SearchSignals` block. After the workers
//! join, the report comes from the thread whose result dominates.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::board::{Board, Move, PawnCache};
use crate::search::history::HistoryTables;
use crate::search::{SearchLimits, Tunables, Worker, WorkerResult, INFINITE, MATE_IN_MAX};
use crate::timeman::TimeManager;
use crate::tt::TranspositionTable;

/// Deep PVS recursion wants room; matches the reference engines' choice.
pub const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Shared control block for one search: the cooperative stop request and
/// the pooled node counter. Workers poll the flag on node-count
/// boundaries and flush their local node deltas here; the UCI loop and
/// the watchdog timer hold clones of the same `Arc`.
///
/// The stop flag uses release/acquire ordering so that whatever a stopper
/// observed happens-before a worker seeing the request; the node counter
/// is a plain relaxed tally.
#[derive(Debug, Default)]
pub struct SearchSignals {
    stop: AtomicBool,
    nodes: AtomicU64,
}

impl SearchSignals {
    #[must_use]
    pub fn new() -> Arc<SearchSignals> {
        Arc::new(SearchSignals::default())
    }

    #[inline]
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    #[inline]
    pub fn add_nodes(&self, delta: u64) {
        self.nodes.fetch_add(delta, Ordering::Relaxed);
    }

    /// Total nodes flushed by all workers so far.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }
}

/// Outcome of one `go`, from the winning worker.
#[derive(Clone, Debug)]
pub struct SearchReport {
    pub best_move: Move,
    pub ponder_move: Option<Move>,
    pub score: i32,
    pub depth: u32,
    pub nodes: u64,
}

/// Fan a search out over `histories.len()` workers and gather the best
/// result. Blocks until every worker has joined.
#[allow(clippy::too_many_arguments)]
pub fn run_search(
    board: &Board,
    tt: &TranspositionTable,
    pawn_cache: &PawnCache,
    signals: &SearchSignals,
    histories: &mut [HistoryTables],
    time: &TimeManager,
    limits: SearchLimits,
    tunables: &Tunables,
) -> SearchReport {
    tt.new_generation();

    let results: Vec<WorkerResult> = thread::scope(|scope| {
        let mut handles = Vec::new();
        for (id, history) in histories.iter_mut().enumerate() {
            let board = board.clone();
            let tunables = tunables.clone();
            let handle = thread::Builder::new()
                .name(format!("search-{id}"))
                .stack_size(SEARCH_STACK_SIZE)
                .spawn_scoped(scope, move || {
                    let mut worker = Worker::new(
                        id, board, tt, pawn_cache, signals, history, time, limits, tunables,
                    );
                    worker.run();
                    worker.result()
                })
                .expect("failed to spawn search worker");
            handles.push(handle);
        }
        handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .collect()
    });

    select_best_thread(&results, signals.nodes())
}

/// Rank worker results: a proven mate wins outright (shortest first);
/// otherwise the largest score-depth product, then depth, then nodes.
fn dominates(a: &WorkerResult, b: &WorkerResult) -> bool {
    let a_mate = a.score.abs() >= MATE_IN_MAX;
    let b_mate = b.score.abs() >= MATE_IN_MAX;
    if a_mate || b_mate {
        return (a.score, a.depth, a.nodes) > (b.score, b.depth, b.nodes);
    }
    let a_product = i64::from(a.score) * i64::from(a.depth);
    let b_product = i64::from(b.score) * i64::from(b.depth);
    (a_product, a.depth, a.nodes) > (b_product, b.depth, b.nodes)
}

fn select_best_thread(results: &[WorkerResult], total_nodes: u64) -> SearchReport {
    let mut best: Option<&WorkerResult> = None;
    for result in results {
        if result.best_move.is_null() || result.depth == 0 || result.score == -INFINITE {
            continue;
        }
        best = match best {
            Some(current) if !dominates(result, current) => Some(current),
            _ => Some(result),
        };
    }
    // A stop before any worker finished depth 1 still needs a legal move.
    if best.is_none() {
        best = results.iter().find(|r| !r.best_move.is_null());
    }

    match best {
        Some(winner) => SearchReport {
            best_move: winner.best_move,
            ponder_move: winner.ponder_move,
            score: winner.score,
            depth: winner.depth,
            nodes: total_nodes,
        },
        None => SearchReport {
            best_move: Move::NULL,
            ponder_move: None,
            score: -INFINITE,
            depth: 0,
            nodes: total_nodes,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_stop_is_shared() {
        let signals = SearchSignals::new();
        let clone = Arc::clone(&signals);
        assert!(!clone.stop_requested());
        signals.request_stop();
        assert!(clone.stop_requested());
    }

    #[test]
    fn signals_accumulate_nodes() {
        let signals = SearchSignals::new();
        signals.add_nodes(1_000);
        signals.add_nodes(234);
        assert_eq!(signals.nodes(), 1_234);
    }

    fn result(id: usize, score: i32, depth: u32, nodes: u64) -> WorkerResult {
        WorkerResult {
            id,
            best_move: Move::from_u16(0x0100 | id as u16),
            ponder_move: None,
            score,
            depth,
            nodes,
        }
    }

    #[test]
    fn deeper_equal_score_wins() {
        let a = result(0, 50, 10, 1000);
        let b = result(1, 50, 12, 900);
        let report = select_best_thread(&[a, b.clone()], 1900);
        assert_eq!(report.best_move, b.best_move);
        assert_eq!(report.nodes, 1900);
    }

    #[test]
    fn mate_beats_any_product() {
        let a = result(0, 900, 30, 5000);
        let b = result(1, MATE_IN_MAX + 10, 8, 100);
        let report = select_best_thread(&[a, b.clone()], 5100);
        assert_eq!(report.best_move, b.best_move);
    }

    #[test]
    fn shorter_mate_preferred() {
        let a = result(0, crate::search::MATE - 9, 20, 100);
        let b = result(1, crate::search::MATE - 5, 18, 100);
        let report = select_best_thread(&[a, b.clone()], 200);
        assert_eq!(report.best_move, b.best_move);
    }

    #[test]
    fn empty_results_fall_back_to_null_move() {
        let report = select_best_thread(&[], 0);
        assert!(report.best_move.is_null());
    }
}
