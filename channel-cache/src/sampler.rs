//! Random, duplicate-free selection of records from a snapshot.
//!
//! Indices are always drawn from the full snapshot range `[0, len)`. How many
//! are drawn is a [`DrawCount`] decision: the service historically ignored the
//! client's limit and always drew a fixed number of records, which remains
//! the default. Selection goes through `rand::seq::index::sample`, so it
//! finishes in a bounded number of steps even when the draw covers the whole
//! range.

use rand::{Rng, seq::index};
use thiserror::Error;

use crate::{cache::Snapshot, record::Record};

/// Number of records drawn per request unless configured otherwise.
pub const DEFAULT_DRAW_COUNT: usize = 50;

/// How many records a single request draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCount {
    /// Always draw this many records; the client limit is ignored.
    Fixed(usize),
    /// Draw as many records as the client asked for.
    Requested,
}

/// What to do when the snapshot holds fewer records than the draw count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shortfall {
    /// Fail with [`SampleError::InvalidRange`].
    #[default]
    Reject,
    /// Return every record in the snapshot.
    Clamp,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("cannot draw {requested} distinct records from a range of {available}")]
    InvalidRange { requested: usize, available: usize },
}

/// Selected records as two parallel sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleResult {
    pub ids: Vec<i32>,
    pub serials: Vec<String>,
}

impl SampleResult {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            serials: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, record: &Record) {
        self.ids.push(record.id);
        self.serials.push(record.serial.clone());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    draw: DrawCount,
    shortfall: Shortfall,
}

impl Sampler {
    pub fn new(draw: DrawCount, shortfall: Shortfall) -> Self {
        Self { draw, shortfall }
    }

    /// Number of records a request with `limit` asks for, before any clamping.
    pub fn draw_count(&self, limit: u32) -> usize {
        match self.draw {
            DrawCount::Fixed(count) => count,
            DrawCount::Requested => usize::try_from(limit).unwrap_or(usize::MAX),
        }
    }

    /// Picks distinct indices in `[0, top)` for a request with `limit`.
    ///
    /// An empty range is always an error, even with [`Shortfall::Clamp`].
    pub fn select_indices<R>(
        &self,
        top: usize,
        limit: u32,
        rng: &mut R,
    ) -> Result<Vec<usize>, SampleError>
    where
        R: Rng + ?Sized,
    {
        let requested = self.draw_count(limit);
        if top == 0 {
            return Err(SampleError::InvalidRange {
                requested,
                available: top,
            });
        }

        let amount = match (requested > top, self.shortfall) {
            (false, _) => requested,
            (true, Shortfall::Clamp) => top,
            (true, Shortfall::Reject) => {
                return Err(SampleError::InvalidRange {
                    requested,
                    available: top,
                });
            }
        };

        Ok(index::sample(rng, top, amount).into_vec())
    }

    /// Draws records from `snapshot` and materializes them.
    pub fn sample<R>(
        &self,
        snapshot: &Snapshot,
        limit: u32,
        rng: &mut R,
    ) -> Result<SampleResult, SampleError>
    where
        R: Rng + ?Sized,
    {
        let records = snapshot.records();
        let indices = self.select_indices(records.len(), limit, rng)?;

        let mut result = SampleResult::with_capacity(indices.len());
        for index in indices {
            result.push(&records[index]);
        }
        Ok(result)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(DrawCount::Fixed(DEFAULT_DRAW_COUNT), Shortfall::Reject)
    }
}
