//! Domain types for dealflow
//!
//! - RunState / CandidateRef: the value threaded through the pipeline
//! - ProfileRecord / ProfileKind: persisted entity profiles
//! - Evaluation: the structured investment scorecard

pub mod evaluation;
pub mod profile;
pub mod run_state;

pub use evaluation::{APPROVAL_SCORE, Evaluation, MIN_MARKET_SUBTOTAL, SectionScore};
pub use profile::{
    MAX_TAGS, ProfileKind, ProfileRecord, SECTION_CHAR_CAP, SECTION_ORDER, TAG_DELIMITER, normalize_name, slugify,
};
pub use run_state::{CandidateRef, DecisionEntry, RunState};
