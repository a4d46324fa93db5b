//! Persistence layer: the profile store and the dedup policy on top.

pub mod dedup;
pub mod profile_store;

pub use dedup::{Deduplicator, ResolveOutcome, SIMILARITY_THRESHOLD};
pub use profile_store::{POOL_SCAN_CAP, ProfileStore, cosine_distance};
