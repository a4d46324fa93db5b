//! Dealflow - an investment screening pipeline
//!
//! Dealflow crawls a startup directory, deduplicates candidates against a
//! persistent profile store, enriches each one through market and
//! competitor analysis, scores it, and writes an investment report for
//! anything that clears the bar.

pub mod crawler;
pub mod domain;
pub mod embed;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod queue;
pub mod stages;
pub mod store;

pub use error::{DealflowError, Result};
