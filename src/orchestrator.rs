//! The pipeline state machine.
//!
//! Routing is a pure function of the current node and the run state, so
//! every path through the graph is unit-testable without collaborators.
//! The loop itself dequeues candidates, resolves their tags, and hands
//! the state to the stages in turn.

use std::path::PathBuf;
use std::sync::Arc;

use crate::crawler::Crawler;
use crate::domain::{ProfileKind, RunState};
use crate::embed::Embedder;
use crate::error::Result;
use crate::llm::LlmClient;
use crate::stages::{self, StageContext};
use crate::store::ProfileStore;

/// Nodes of the pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Discover,
    ResumeOrExit,
    MarketEval,
    CompetitorEval,
    Decide,
    ReportWriter,
    Terminal,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Discover => "discover",
            PipelineState::ResumeOrExit => "resume_or_exit",
            PipelineState::MarketEval => "market_eval",
            PipelineState::CompetitorEval => "competitor_eval",
            PipelineState::Decide => "decide",
            PipelineState::ReportWriter => "report_writer",
            PipelineState::Terminal => "terminal",
        }
    }
}

/// Pure routing: where the pipeline goes next, given where it is and
/// what the state looks like.
pub fn next_state(current: PipelineState, state: &RunState) -> PipelineState {
    match current {
        PipelineState::Discover => PipelineState::ResumeOrExit,
        PipelineState::ResumeOrExit => {
            if state.current_candidate.is_some() {
                PipelineState::MarketEval
            } else if state.report_emitted_ever {
                PipelineState::Terminal
            } else {
                PipelineState::ReportWriter
            }
        }
        PipelineState::MarketEval => PipelineState::CompetitorEval,
        PipelineState::CompetitorEval => PipelineState::Decide,
        PipelineState::Decide => {
            if state.decision_outcome == Some(true) {
                PipelineState::ReportWriter
            } else {
                PipelineState::ResumeOrExit
            }
        }
        PipelineState::ReportWriter => PipelineState::ResumeOrExit,
        PipelineState::Terminal => PipelineState::Terminal,
    }
}

/// Owns the store and the collaborators and drives the graph to
/// `Terminal`.
pub struct Orchestrator {
    store: ProfileStore,
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn Embedder>,
    crawler: Arc<dyn Crawler>,
    discovery_limit: usize,
    report_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(
        store: ProfileStore,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn Embedder>,
        crawler: Arc<dyn Crawler>,
        discovery_limit: usize,
        report_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            llm,
            embedder,
            crawler,
            discovery_limit,
            report_dir,
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Run the pipeline from discovery to termination.
    pub async fn run(&self) -> Result<RunState> {
        let ctx = StageContext {
            store: &self.store,
            llm: self.llm.as_ref(),
            embedder: self.embedder.as_ref(),
            crawler: self.crawler.as_ref(),
            discovery_limit: self.discovery_limit,
            report_dir: &self.report_dir,
        };

        let mut state = RunState::new();
        let mut node = PipelineState::Discover;

        while node != PipelineState::Terminal {
            log::debug!("entering {}", node.as_str());
            state = match node {
                PipelineState::Discover => stages::discover::run(&ctx, state).await?,
                PipelineState::ResumeOrExit => self.resume_or_exit(state),
                PipelineState::MarketEval => stages::market::run(&ctx, state).await,
                PipelineState::CompetitorEval => stages::competitor::run(&ctx, state).await,
                PipelineState::Decide => stages::decide::run(&ctx, state).await,
                PipelineState::ReportWriter => stages::report::run(&ctx, state).await,
                PipelineState::Terminal => unreachable!("loop exits before terminal"),
            };
            node = next_state(node, &state);
        }
        Ok(state)
    }

    /// Dequeue the next candidate and resolve its tags, or clear the
    /// current slot when the queue has drained.
    fn resume_or_exit(&self, mut state: RunState) -> RunState {
        match state.pending_candidates.pop_next() {
            Some(candidate) => {
                let tags = self.resolve_tags(&candidate.name);
                log::info!(
                    "analyzing {} ({} remaining)",
                    candidate,
                    state.pending_candidates.len()
                );
                state.begin_candidate(candidate, tags);
            }
            None => state.clear_candidate(),
        }
        state
    }

    fn resolve_tags(&self, name: &str) -> Vec<String> {
        match self.store.get_by_normalized_name(name, ProfileKind::Company) {
            Ok(Some(record)) => record.tags,
            Ok(None) => Vec::new(),
            Err(err) => {
                log::warn!("tag lookup failed for {name}: {err}");
                Vec::new()
            }
        }
    }
}
