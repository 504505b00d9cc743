use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "license-curatr",
    about = "Classify license expressions against company policy and curate package licenses",
    version
)]
pub struct Cli {
    /// Policy file [default: ./.license-curatr/policy.toml, fallback ~/.config/license-curatr/policy.toml, then built-in]
    #[arg(long, global = true, value_name = "FILE")]
    pub policy: Option<PathBuf>,

    /// Report format
    #[arg(long, global = true, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Treat license pairs without a compatibility rule as incompatible
    #[arg(long, global = true)]
    pub strict_compat: bool,

    /// Show details for every entry and enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify one or more license expressions against the policy
    Classify {
        /// SPDX-style expressions, e.g. "MIT OR Apache-2.0"
        #[arg(required = true, value_name = "EXPRESSION")]
        expressions: Vec<String>,
    },

    /// Fuse a batch of detections and suggest a license per package
    Curate {
        /// JSON array, or JSON Lines for .jsonl / .ndjson
        #[arg(value_name = "EVIDENCE_FILE")]
        evidence: PathBuf,
    },

    /// Assess the severity of a package's license changing
    Diff {
        #[arg(value_name = "PREVIOUS")]
        previous: String,
        #[arg(value_name = "CURRENT")]
        current: String,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}
