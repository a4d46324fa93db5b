//! The mutable run state threaded through the pipeline.
//!
//! `RunState` is a plain value: stages consume one and return an updated
//! one, nothing is shared by reference. That keeps every stage
//! unit-testable in isolation and makes a run deterministically
//! replayable from its inputs.

use crate::domain::Evaluation;
use crate::queue::EnrichmentQueue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Transient reference to a candidate company awaiting enrichment.
///
/// The store owns the persisted record; this is just the identity the
/// orchestrator carries between stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRef {
    pub name: String,
}

impl CandidateRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for CandidateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One row of the per-run decision log, kept so the terminal fallback
/// report can cover every candidate that was evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub name: String,
    pub approved: bool,
    pub final_score: i32,
}

/// The single state record threaded through the whole pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    /// FIFO of not-yet-processed candidates; mutated only through the
    /// queue's own dequeue and refill operations.
    pub pending_candidates: EnrichmentQueue,

    /// Entity currently under analysis. Exactly one candidate is current
    /// at a time; set at dequeue, cleared when the queue drains.
    pub current_candidate: Option<CandidateRef>,

    /// Tags of the current candidate, fetched from the store at dequeue.
    pub current_tags: Vec<String>,

    /// Accumulated market evaluation text; only the market stage writes it.
    pub market_report: Option<String>,

    /// Accumulated competitor analysis text; only the competitor stage
    /// writes it.
    pub competitor_report: Option<String>,

    /// Structured scorecard from the decision stage.
    pub evaluation: Option<Evaluation>,

    /// Tri-state decision: unknown / approve / reject. Set exactly once
    /// per candidate.
    pub decision_outcome: Option<bool>,

    /// Sticky: true once any report has been produced this run.
    pub report_emitted_ever: bool,

    pub last_report_path: Option<PathBuf>,

    /// Outcome per fully-processed candidate, in processing order.
    pub decision_log: Vec<DecisionEntry>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start analysis of a freshly dequeued candidate: set it current and
    /// clear every per-candidate field from the previous iteration.
    pub fn begin_candidate(&mut self, candidate: CandidateRef, tags: Vec<String>) {
        self.current_candidate = Some(candidate);
        self.current_tags = tags;
        self.market_report = None;
        self.competitor_report = None;
        self.evaluation = None;
        self.decision_outcome = None;
    }

    /// Queue has drained: no candidate is current any more.
    pub fn clear_candidate(&mut self) {
        self.current_candidate = None;
        self.current_tags.clear();
    }

    /// Display name of the current candidate, or "" when none is set.
    pub fn current_name(&self) -> &str {
        self.current_candidate.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }

    /// Record the decision for the current candidate in the log.
    pub fn log_decision(&mut self, approved: bool, final_score: i32) {
        if let Some(candidate) = &self.current_candidate {
            self.decision_log.push(DecisionEntry {
                name: candidate.name.clone(),
                approved,
                final_score,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = RunState::new();
        assert!(state.pending_candidates.is_empty());
        assert!(state.current_candidate.is_none());
        assert!(!state.report_emitted_ever);
        assert!(state.decision_outcome.is_none());
    }

    #[test]
    fn test_begin_candidate_resets_per_candidate_fields() {
        let mut state = RunState::new();
        state.market_report = Some("old market text".to_string());
        state.competitor_report = Some("old competitor text".to_string());
        state.decision_outcome = Some(false);
        state.report_emitted_ever = true;

        state.begin_candidate(CandidateRef::new("Acme"), vec!["fintech".to_string()]);

        assert_eq!(state.current_name(), "Acme");
        assert_eq!(state.current_tags, vec!["fintech"]);
        assert!(state.market_report.is_none());
        assert!(state.competitor_report.is_none());
        assert!(state.decision_outcome.is_none());
        // sticky across candidates
        assert!(state.report_emitted_ever);
    }

    #[test]
    fn test_clear_candidate() {
        let mut state = RunState::new();
        state.begin_candidate(CandidateRef::new("Acme"), vec!["fintech".to_string()]);
        state.clear_candidate();
        assert!(state.current_candidate.is_none());
        assert!(state.current_tags.is_empty());
        assert_eq!(state.current_name(), "");
    }

    #[test]
    fn test_log_decision_requires_current_candidate() {
        let mut state = RunState::new();
        state.log_decision(true, 25);
        assert!(state.decision_log.is_empty());

        state.begin_candidate(CandidateRef::new("Acme"), vec![]);
        state.log_decision(false, 12);
        assert_eq!(state.decision_log.len(), 1);
        assert_eq!(state.decision_log[0].name, "Acme");
        assert!(!state.decision_log[0].approved);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut state = RunState::new();
        state.pending_candidates = EnrichmentQueue::from_pending(vec![CandidateRef::new("A")].into());
        state.begin_candidate(CandidateRef::new("B"), vec!["tag".to_string()]);

        let json = serde_json::to_string(&state).unwrap();
        let restored: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.pending_candidates.len(), 1);
        assert_eq!(restored.current_name(), "B");
    }
}
