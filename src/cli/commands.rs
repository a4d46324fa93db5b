//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: execute the full analysis pipeline
//! - resolve: dedup-check a single candidate name
//! - peek: inspect stored profiles
//! - queue: preview what a run would enqueue
//! - ingest-industry: load an industry report into the store

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dealflow - an investment screening pipeline over a company profile store
#[derive(Parser, Debug)]
#[command(name = "dealflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline: discover, analyze, decide, report
    Run {
        /// Cap on candidates pulled from the discovery source
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Resolve a candidate name against the store without enriching it
    Resolve {
        /// Company name to check
        name: String,
    },

    /// Show stored profiles
    Peek {
        /// Restrict to one kind (company, industry)
        #[arg(short, long)]
        kind: Option<String>,

        /// Maximum profiles to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Preview the candidates a run would enqueue
    Queue,

    /// Ingest an industry report file into the store
    IngestIndustry {
        /// Sector label, e.g. fintech
        sector: String,

        /// Report title
        title: String,

        /// Path to the report text file
        file: PathBuf,

        /// Source URL to record
        #[arg(short, long)]
        source_url: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        // No args should result in None command (defaults to run)
        let cli = Cli::try_parse_from(["dealflow"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["dealflow", "-v"]).unwrap();
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["dealflow", "-c", "/path/to/dealflow.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/path/to/dealflow.yml")));
    }

    #[test]
    fn test_run_command_with_limit() {
        let cli = Cli::try_parse_from(["dealflow", "run", "--limit", "5"]).unwrap();
        match cli.command {
            Some(Commands::Run { limit }) => assert_eq!(limit, Some(5)),
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_resolve_command() {
        let cli = Cli::try_parse_from(["dealflow", "resolve", "Acme Pay"]).unwrap();
        match cli.command {
            Some(Commands::Resolve { name }) => assert_eq!(name, "Acme Pay"),
            _ => panic!("Expected resolve command"),
        }
    }

    #[test]
    fn test_peek_defaults() {
        let cli = Cli::try_parse_from(["dealflow", "peek"]).unwrap();
        match cli.command {
            Some(Commands::Peek { kind, limit }) => {
                assert!(kind.is_none());
                assert_eq!(limit, 20);
            }
            _ => panic!("Expected peek command"),
        }
    }

    #[test]
    fn test_peek_with_kind() {
        let cli = Cli::try_parse_from(["dealflow", "peek", "-k", "industry", "-l", "5"]).unwrap();
        match cli.command {
            Some(Commands::Peek { kind, limit }) => {
                assert_eq!(kind, Some("industry".to_string()));
                assert_eq!(limit, 5);
            }
            _ => panic!("Expected peek command"),
        }
    }

    #[test]
    fn test_queue_command() {
        let cli = Cli::try_parse_from(["dealflow", "queue"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Queue)));
    }

    #[test]
    fn test_ingest_industry_command() {
        let cli = Cli::try_parse_from([
            "dealflow",
            "ingest-industry",
            "fintech",
            "Payments Outlook 2026",
            "report.txt",
            "--source-url",
            "https://research.example.com/payments",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::IngestIndustry { sector, title, file, source_url }) => {
                assert_eq!(sector, "fintech");
                assert_eq!(title, "Payments Outlook 2026");
                assert_eq!(file, PathBuf::from("report.txt"));
                assert_eq!(source_url.as_deref(), Some("https://research.example.com/payments"));
            }
            _ => panic!("Expected ingest-industry command"),
        }
    }
}
