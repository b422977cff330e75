//! Shared transposition table.
//!
//! Entries are 10 logical bytes packed into an atomic data word and an
//! atomic meta word, three to a 32-byte cluster. Writes are racy by design:
//! a torn entry either fails the key16 check or surfaces a move that the
//! caller's legality check rejects, so no locking is needed (the same
//! scheme as the pawn cache, without the XOR because the move is
//! revalidated anyway).
//!
//! Mate scores are stored distance-from-node and rebased to
//! distance-from-root on probe.

use std::sync::atomic::{AtomicU16, AtomicU64, AtomicU8, Ordering};

use crate::board::Move;
use crate::search::{INFINITE, MATE_IN_MAX};

/// Bound kind carried in the top two bits of `gen_bound`.
/// Zero marks a vacant slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// Score is at most the true value (fail low).
    Upper = 1,
    /// Score is at least the true value (fail high / beta cutoff).
    Lower = 2,
    Exact = 3,
}

impl Bound {
    fn from_bits(bits: u16) -> Option<Bound> {
        match bits {
            1 => Some(Bound::Upper),
            2 => Some(Bound::Lower),
            3 => Some(Bound::Exact),
            _ => None,
        }
    }
}

/// A successful probe.
#[derive(Clone, Copy, Debug)]
pub struct TtHit {
    pub mv: Move,
    /// Score rebased to the probing node's ply.
    pub score: i32,
    /// Static eval recorded by the storing node.
    pub eval: i32,
    pub depth: i32,
    pub bound: Bound,
}

pub const CLUSTER_SIZE: usize = 3;
const GEN_MASK: u8 = 0x3F;

/// Three entries sharing a cache line: `data[i]` holds
/// key16 | move16 | score16 | eval16, `meta[i]` holds depth8 | gen_bound8.
#[repr(align(32))]
struct Cluster {
    data: [AtomicU64; CLUSTER_SIZE],
    meta: [AtomicU16; CLUSTER_SIZE],
}

impl Cluster {
    fn new() -> Self {
        Cluster {
            data: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
            meta: [AtomicU16::new(0), AtomicU16::new(0), AtomicU16::new(0)],
        }
    }
}

#[inline]
fn key16(key: u64) -> u16 {
    (key >> 48) as u16
}

#[inline]
fn pack_data(key: u64, mv: Move, score: i16, eval: i16) -> u64 {
    u64::from(key16(key))
        | (u64::from(mv.as_u16()) << 16)
        | (u64::from(score as u16) << 32)
        | (u64::from(eval as u16) << 48)
}

#[inline]
fn pack_meta(depth: i8, bound: Bound, generation: u8) -> u16 {
    u16::from(depth as u8) | (u16::from(generation) | ((bound as u16) << 6)) << 8
}

#[inline]
fn meta_depth(meta: u16) -> i32 {
    i32::from(meta as u8 as i8)
}

#[inline]
fn meta_generation(meta: u16) -> u8 {
    (meta >> 8) as u8 & GEN_MASK
}

#[inline]
fn meta_bound_bits(meta: u16) -> u16 {
    meta >> 14
}

/// Convert a search score to its stored form: mate scores become "mate in N
/// from this node" rather than from the root.
#[inline]
#[must_use]
pub fn value_to_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_IN_MAX {
        score + ply as i32
    } else if score <= -MATE_IN_MAX {
        score - ply as i32
    } else {
        score
    }
}

/// Inverse of `value_to_tt` at the probing node's ply.
#[inline]
#[must_use]
pub fn value_from_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_IN_MAX {
        score - ply as i32
    } else if score <= -MATE_IN_MAX {
        score + ply as i32
    } else {
        score
    }
}

pub struct TranspositionTable {
    clusters: Vec<Cluster>,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Allocate a table of at most `size_mb` megabytes (power-of-two
    /// cluster count). Returns `None` if the allocation fails, letting the
    /// caller keep its previous table.
    #[must_use]
    pub fn try_new(size_mb: usize) -> Option<Self> {
        let bytes = size_mb.max(1) << 20;
        let mut count = (bytes / std::mem::size_of::<Cluster>()).next_power_of_two();
        if count * std::mem::size_of::<Cluster>() > bytes {
            count /= 2;
        }
        let count = count.max(1024);

        let mut clusters = Vec::new();
        clusters.try_reserve_exact(count).ok()?;
        for _ in 0..count {
            clusters.push(Cluster::new());
        }

        Some(TranspositionTable {
            clusters,
            generation: AtomicU8::new(0),
        })
    }

    /// Allocate a table, falling back to the minimum size on failure.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        TranspositionTable::try_new(size_mb)
            .or_else(|| TranspositionTable::try_new(1))
            .expect("minimum transposition table allocation failed")
    }

    /// Multiplicative index: maps the full key range onto the cluster
    /// count without bias.
    #[inline]
    fn index(&self, key: u64) -> usize {
        ((u128::from(key) * self.clusters.len() as u128) >> 64) as usize
    }

    #[inline]
    fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Advance the age generation. Called once per `go`.
    pub fn new_generation(&self) {
        let next = (self.generation().wrapping_add(1)) & GEN_MASK;
        self.generation.store(next, Ordering::Relaxed);
    }

    /// Age distance from the current generation, in [0, 63].
    #[inline]
    fn age_delta(&self, entry_gen: u8) -> i32 {
        i32::from((64 + self.generation() - entry_gen) & GEN_MASK)
    }

    /// Look up a position. `ply` rebases mate scores to the probing node.
    #[must_use]
    pub fn probe(&self, key: u64, ply: usize) -> Option<TtHit> {
        let cluster = &self.clusters[self.index(key)];
        let wanted = key16(key);

        for i in 0..CLUSTER_SIZE {
            let data = cluster.data[i].load(Ordering::Relaxed);
            if data as u16 != wanted {
                continue;
            }
            let meta = cluster.meta[i].load(Ordering::Relaxed);
            let Some(bound) = Bound::from_bits(meta_bound_bits(meta)) else {
                continue;
            };

            // Refresh the age so hot entries survive replacement.
            let refreshed = pack_meta(meta as u8 as i8, bound, self.generation());
            cluster.meta[i].store(refreshed, Ordering::Relaxed);

            let score = (data >> 32) as u16 as i16;
            let eval = (data >> 48) as u16 as i16;
            return Some(TtHit {
                mv: Move::from_u16((data >> 16) as u16),
                score: value_from_tt(i32::from(score), ply),
                eval: i32::from(eval),
                depth: meta_depth(meta),
                bound,
            });
        }
        None
    }

    /// Record a search result. The victim slot is the one minimizing
    /// `depth - 8 * age`, so stale shallow entries go first.
    pub fn store(
        &self,
        key: u64,
        mv: Move,
        score: i32,
        eval: i32,
        depth: i32,
        bound: Bound,
        ply: usize,
    ) {
        let cluster = &self.clusters[self.index(key)];
        let wanted = key16(key);

        let mut slot = 0;
        let mut best_metric = i32::MAX;
        let mut matched = false;
        for i in 0..CLUSTER_SIZE {
            let meta = cluster.meta[i].load(Ordering::Relaxed);
            if meta_bound_bits(meta) == 0 {
                // Vacant slot; take it unless the key is found later.
                if best_metric > i32::MIN {
                    slot = i;
                    best_metric = i32::MIN;
                }
                continue;
            }
            let data = cluster.data[i].load(Ordering::Relaxed);
            if data as u16 == wanted {
                slot = i;
                matched = true;
                break;
            }
            let metric = meta_depth(meta) - 8 * self.age_delta(meta_generation(meta));
            if metric < best_metric {
                best_metric = metric;
                slot = i;
            }
        }

        // Keep the previously stored move when the new result has none.
        let stored_move = if mv.is_null() && matched {
            Move::from_u16((cluster.data[slot].load(Ordering::Relaxed) >> 16) as u16)
        } else {
            mv
        };

        let score16 = value_to_tt(score, ply).clamp(-INFINITE, INFINITE) as i16;
        let eval16 = eval.clamp(-30000, 30000) as i16;
        let depth8 = depth.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8;

        cluster.data[slot].store(pack_data(key, stored_move, score16, eval16), Ordering::Relaxed);
        cluster.meta[slot].store(pack_meta(depth8, bound, self.generation()), Ordering::Relaxed);
    }

    /// Occupancy of the current generation in permille, sampled from the
    /// first thousand clusters.
    #[must_use]
    pub fn hashfull(&self) -> u32 {
        let sample = self.clusters.len().min(1000);
        let generation = self.generation();
        let mut filled = 0u32;
        for cluster in &self.clusters[..sample] {
            for meta in &cluster.meta {
                let meta = meta.load(Ordering::Relaxed);
                if meta_bound_bits(meta) != 0 && meta_generation(meta) == generation {
                    filled += 1;
                }
            }
        }
        filled * 1000 / (sample as u32 * CLUSTER_SIZE as u32)
    }

    /// Wipe every entry. Called on `ucinewgame`.
    pub fn clear(&self) {
        for cluster in &self.clusters {
            for i in 0..CLUSTER_SIZE {
                cluster.data[i].store(0, Ordering::Relaxed);
                cluster.meta[i].store(0, Ordering::Relaxed);
            }
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Table capacity in entries; exposed for sizing tests.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.clusters.len() * CLUSTER_SIZE
    }
}
