//! The enrichment stages.
//!
//! Each stage is a free async function that takes the shared
//! [`StageContext`] plus the current `RunState` and returns the updated
//! state. Stages degrade on collaborator failure (placeholder text, logged
//! warning) instead of aborting the run; only a store outage is fatal,
//! and only discovery can hit one before any analysis text exists.

pub mod competitor;
pub mod decide;
pub mod discover;
pub mod market;
pub mod report;

use std::path::Path;

use crate::crawler::Crawler;
use crate::embed::Embedder;
use crate::error::DealflowError;
use crate::llm::LlmClient;
use crate::store::ProfileStore;

/// Character cap applied to each context block handed to the language
/// model.
pub const CONTEXT_CAP: usize = 3000;

/// Character cap for per-competitor excerpts.
pub const EXCERPT_CAP: usize = 500;

/// Separator between documents inside one context block.
pub const DOC_SEPARATOR: &str = "\n\n---\n\n";

/// Everything a stage needs, borrowed for the stage call.
pub struct StageContext<'a> {
    pub store: &'a ProfileStore,
    pub llm: &'a dyn LlmClient,
    pub embedder: &'a dyn Embedder,
    pub crawler: &'a dyn Crawler,
    pub discovery_limit: usize,
    pub report_dir: &'a Path,
}

/// Truncate on a char boundary; byte slicing would panic mid-glyph.
pub(crate) fn truncate_chars(text: &str, cap: usize) -> String {
    text.chars().take(cap).collect()
}

/// Join documents with the block separator, capping the whole block.
pub(crate) fn join_context(docs: &[String], cap: usize) -> String {
    let non_empty: Vec<&str> = docs
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .collect();
    truncate_chars(&non_empty.join(DOC_SEPARATOR), cap)
}

/// Placeholder text a degraded stage leaves in the state instead of null.
pub(crate) fn failure_note(what: &str, err: &DealflowError) -> String {
    format!("{what} unavailable: {err}")
}
