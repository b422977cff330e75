//! Engine controller: owns the game state, the shared tables and the
//! active search job, and translates `go` parameters into a search.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::board::Board;
use crate::board::PawnCache;
use crate::search::history::HistoryTables;
use crate::search::{SearchLimits, Tunables, MAX_PLY};
use crate::threads::{self, SearchSignals, SEARCH_STACK_SIZE};
use crate::timeman::{TimeControl, TimeManager};
use crate::tt::TranspositionTable;
use crate::uci::command::GoParams;
use crate::uci::report;

/// Watchdog poll granularity.
const WATCHDOG_SLEEP: Duration = Duration::from_millis(2);

pub const DEFAULT_HASH_MB: usize = 32;

/// Values behind the UCI option registry.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub threads: usize,
    pub hash_mb: usize,
    pub multipv: usize,
    pub chess960: bool,
    pub move_overhead_ms: u64,
    pub tunables: Tunables,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            threads: 1,
            hash_mb: DEFAULT_HASH_MB,
            multipv: 1,
            chess960: false,
            move_overhead_ms: 10,
            tunables: Tunables::default(),
        }
    }
}

struct SearchJob {
    signals: Arc<SearchSignals>,
    handle: JoinHandle<()>,
}

pub struct Engine {
    board: Board,
    tt: Arc<TranspositionTable>,
    pawn_cache: Arc<PawnCache>,
    /// Per-worker history tables, persisted and aged across searches.
    memory: Arc<Mutex<Vec<HistoryTables>>>,
    pub options: EngineOptions,
    job: Option<SearchJob>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Engine {
            board: Board::new(),
            tt: Arc::new(TranspositionTable::new(DEFAULT_HASH_MB)),
            pawn_cache: Arc::new(PawnCache::default()),
            memory: Arc::new(Mutex::new(vec![HistoryTables::new()])),
            options: EngineOptions::default(),
            job: None,
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Install a new root position, stopping any active search first.
    pub fn set_position(&mut self, mut board: Board) {
        self.stop_search();
        board.set_chess960(self.options.chess960);
        self.board = board;
    }

    /// `ucinewgame`: wipe the transposition table, pawn cache and history.
    pub fn new_game(&mut self) {
        self.stop_search();
        self.tt.clear();
        self.pawn_cache.clear();
        for history in self.memory.lock().iter_mut() {
            history.clear();
        }
        let mut board = Board::new();
        board.set_chess960(self.options.chess960);
        self.board = board;
    }

    /// Replace the transposition table. On allocation failure the old
    /// table stays in service.
    pub fn resize_hash(&mut self, size_mb: usize) {
        self.stop_search();
        match TranspositionTable::try_new(size_mb) {
            Some(table) => {
                self.tt = Arc::new(table);
                self.options.hash_mb = size_mb;
            }
            None => {
                println!(
                    "info string hash allocation of {size_mb} MB failed, keeping {} MB",
                    self.options.hash_mb
                );
            }
        }
    }

    pub fn clear_hash(&mut self) {
        self.stop_search();
        self.tt.clear();
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.stop_search();
        self.options.threads = threads.clamp(1, 1024);
    }

    pub fn set_chess960(&mut self, enabled: bool) {
        self.options.chess960 = enabled;
        self.board.set_chess960(enabled);
    }

    /// Kick off an asynchronous search; `bestmove` is printed by the
    /// search thread when it finishes or is stopped.
    pub fn go(&mut self, params: &GoParams) {
        self.stop_search();

        let mut limits = SearchLimits {
            max_depth: params.depth.unwrap_or(MAX_PLY as u32 - 2),
            node_limit: params.nodes.unwrap_or(0),
            multipv: self.options.multipv,
        };
        if let Some(mate) = params.mate {
            limits.max_depth = limits.max_depth.min(2 * mate + 1);
        }

        let (remaining, increment) = if self.board.white_to_move() {
            (params.wtime, params.winc)
        } else {
            (params.btime, params.binc)
        };
        let tc = if params.infinite || params.ponder {
            TimeControl::Infinite
        } else if let Some(ms) = params.movetime {
            TimeControl::MoveTime(ms)
        } else if let Some(remaining_ms) = remaining {
            TimeControl::Fischer {
                remaining_ms,
                increment_ms: increment.unwrap_or(0),
                movestogo: params.movestogo,
            }
        } else if params.depth.is_some() || params.nodes.is_some() || params.mate.is_some() {
            TimeControl::FixedLimit
        } else {
            TimeControl::Infinite
        };
        let time = TimeManager::new(tc, self.options.move_overhead_ms);

        let signals = SearchSignals::new();

        // Watchdog: trips the stop request at the hard deadline even if
        // every worker is stuck deep in a subtree.
        if let Some(hard_ms) = time.hard_deadline_ms() {
            let watchdog = Arc::clone(&signals);
            let started = Instant::now();
            thread::spawn(move || {
                let deadline = Duration::from_millis(hard_ms);
                while !watchdog.stop_requested() {
                    if started.elapsed() >= deadline {
                        watchdog.request_stop();
                        break;
                    }
                    thread::sleep(WATCHDOG_SLEEP.min(deadline));
                }
            });
        }

        {
            let mut memory = self.memory.lock();
            memory.resize_with(self.options.threads, HistoryTables::new);
            for history in memory.iter_mut() {
                history.age();
            }
        }

        let board = self.board.clone();
        let tt = Arc::clone(&self.tt);
        let pawn_cache = Arc::clone(&self.pawn_cache);
        let memory = Arc::clone(&self.memory);
        let tunables = self.options.tunables.clone();
        let search_signals = Arc::clone(&signals);

        let handle = thread::Builder::new()
            .name("search-main".to_string())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                let mut histories = memory.lock();
                let outcome = threads::run_search(
                    &board,
                    &tt,
                    &pawn_cache,
                    &search_signals,
                    &mut histories,
                    &time,
                    limits,
                    &tunables,
                );
                let best = if outcome.best_move.is_null() {
                    None
                } else {
                    Some(board.format_move(outcome.best_move))
                };
                let ponder = outcome.ponder_move.map(|mv| board.format_move(mv));
                report::print_bestmove(best.as_deref(), ponder.as_deref());
            })
            .expect("failed to spawn search thread");

        self.job = Some(SearchJob { signals, handle });
    }

    /// Signal the active search to stop without waiting for it.
    pub fn signal_stop(&self) {
        if let Some(job) = &self.job {
            job.signals.request_stop();
        }
    }

    /// Stop the active search and wait for `bestmove` to be printed.
    pub fn stop_search(&mut self) {
        if let Some(job) = self.job.take() {
            job.signals.request_stop();
            let _ = job.handle.join();
        }
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.job
            .as_ref()
            .is_some_and(|job| !job.handle.is_finished())
    }

    /// Movegen node count, for the `perft` debug command.
    pub fn perft(&mut self, depth: usize) -> u64 {
        self.board.perft(depth)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop_search();
    }
}
