//! CLI module for dealflow - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for pipeline runs,
//! store inspection, and industry ingestion.

pub mod commands;

pub use commands::Cli;
