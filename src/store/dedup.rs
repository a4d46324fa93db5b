//! Fuzzy-dedup policy on top of the profile store.
//!
//! `resolve` decides, before any expensive enrichment runs, whether a
//! candidate name already has a profile. Exact key checks always run
//! first and short-circuit — embeddings alone are unreliable for short
//! entity names (homonyms, truncation) — and only then does the
//! similarity pass get a say. The threshold is deliberately
//! conservative: a false "exists" costs one skipped enrichment, a false
//! "new" creates a duplicate record forever.
//!
//! Store failures propagate as `StoreUnavailable`; they are never folded
//! into a "no match" answer.

use crate::domain::{ProfileKind, normalize_name, slugify};
use crate::embed::Embedder;
use crate::error::Result;
use crate::store::ProfileStore;

/// Maximum similarity distance (0–1 scale, smaller = more similar) for
/// treating two names as the same entity.
pub const SIMILARITY_THRESHOLD: f32 = 0.18;

/// Neighbours examined in the similarity pass.
const SIMILARITY_K: usize = 3;

/// Outcome of a dedup resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// A semantically equivalent record already exists.
    Exists { id: String, distance: Option<f32> },
    /// No existing record matches; safe to create one.
    New,
}

impl ResolveOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, ResolveOutcome::New)
    }
}

/// Two-phase resolver: exact normalized-key match, then embedding
/// similarity with a distance threshold.
pub struct Deduplicator<'a> {
    store: &'a ProfileStore,
    embedder: &'a dyn Embedder,
}

impl<'a> Deduplicator<'a> {
    pub fn new(store: &'a ProfileStore, embedder: &'a dyn Embedder) -> Self {
        Self { store, embedder }
    }

    pub async fn resolve(&self, candidate_name: &str) -> Result<ResolveOutcome> {
        let query = candidate_name.trim();
        if query.is_empty() {
            return Ok(ResolveOutcome::New);
        }

        // Phase 1: exact keys. get_exact already folds case and
        // whitespace; the slug probe covers records addressed by id.
        if let Some(id) = self.store.get_exact(query)? {
            return Ok(ResolveOutcome::Exists { id, distance: None });
        }
        if let Some(id) = self.store.get_exact(&slugify(query))? {
            return Ok(ResolveOutcome::Exists { id, distance: None });
        }

        // Phase 2: embedding similarity.
        let vector = self.embedder.embed(query).await?;
        let hits = self.store.find_similar(&vector, ProfileKind::Company, SIMILARITY_K)?;

        let norm = normalize_name(query);
        for (id, distance) in &hits {
            // name collision despite embedding drift
            if let Some(record) = self.store.get(id)? {
                if normalize_name(&record.name) == norm {
                    return Ok(ResolveOutcome::Exists {
                        id: id.clone(),
                        distance: Some(*distance),
                    });
                }
            }
        }

        if let Some((id, distance)) = hits.first() {
            if *distance <= SIMILARITY_THRESHOLD {
                return Ok(ResolveOutcome::Exists {
                    id: id.clone(),
                    distance: Some(*distance),
                });
            }
        }

        Ok(ResolveOutcome::New)
    }
}
