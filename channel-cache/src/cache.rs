//! Process-wide snapshot of every record the server samples from.
//!
//! The cache follows a read-copy-update discipline: the refresh task builds a
//! complete [`Snapshot`] off to the side and swaps it in with a single pointer
//! store. Readers grab an `Arc` to whichever snapshot is current and keep it
//! for the whole sampling operation, so a concurrent refresh can never hand
//! them a mix of old and new records. No lock is held while sampling.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use arc_swap::ArcSwap;

use crate::record::Record;

/// An immutable, fully-formed copy of the dataset.
#[derive(Debug, Default)]
pub struct Snapshot {
    generation: u64,
    records: Vec<Record>,
}

impl Snapshot {
    /// Number of `load` calls that preceded this snapshot. The startup
    /// placeholder is generation 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

/// Swappable holder for the current [`Snapshot`].
///
/// Intended for a single writer (the refresh loop) and any number of
/// readers. With several concurrent writers the last store wins, but
/// generation numbers may then be installed out of order.
pub struct Cache {
    current: ArcSwap<Snapshot>,
    generations: AtomicU64,
}

impl Cache {
    /// Creates a cache holding an empty snapshot.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
            generations: AtomicU64::new(0),
        }
    }

    /// Replaces the whole dataset and returns the snapshot that was installed.
    pub fn load(&self, records: Vec<Record>) -> Arc<Snapshot> {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = Arc::new(Snapshot {
            generation,
            records,
        });
        self.current.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Returns the current snapshot. The handle stays valid after later loads.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
