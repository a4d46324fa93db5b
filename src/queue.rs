//! The work queue of pending candidates.
//!
//! Seeded exactly once per run: newly discovered companies take
//! priority, in discovery order; when discovery produced nothing new,
//! the queue falls back to a uniform sample of already-stored companies.
//! After the seed the queue only ever shrinks — draining it is the
//! pipeline's termination condition.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::CandidateRef;

/// Maximum candidates seeded into the queue per run.
pub const SEED_LIMIT: usize = 10;

/// Ordered queue of pending candidates with pop-front semantics.
/// `refill` and `pop_next` are the only mutation entry points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentQueue {
    items: VecDeque<CandidateRef>,
}

impl EnrichmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the queue from an existing pending list (resume path).
    pub fn from_pending(pending: VecDeque<CandidateRef>) -> Self {
        Self { items: pending }
    }

    /// Seed the queue. Non-empty `newly_created` wins and is taken in
    /// discovery order; otherwise up to [`SEED_LIMIT`] names are sampled
    /// uniformly without replacement from the existing pool.
    pub fn refill<R: Rng>(&mut self, newly_created: &[String], mut existing_pool: Vec<String>, rng: &mut R) {
        self.items.clear();
        if !newly_created.is_empty() {
            self.items.extend(
                newly_created
                    .iter()
                    .take(SEED_LIMIT)
                    .map(|name| CandidateRef::new(name.clone())),
            );
            return;
        }

        let amount = SEED_LIMIT.min(existing_pool.len());
        let (sampled, _) = existing_pool.partial_shuffle(rng, amount);
        self.items
            .extend(sampled.iter().map(|name| CandidateRef::new(name.clone())));
    }

    /// Remove and return the head of the queue.
    pub fn pop_next(&mut self) -> Option<CandidateRef> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snapshot of the pending candidates, front first.
    pub fn pending(&self) -> VecDeque<CandidateRef> {
        self.items.clone()
    }
}
