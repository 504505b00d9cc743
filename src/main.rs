//! `license-curatr` — classify license expressions against a company policy and
//! curate package licenses from multi-source evidence.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and initialise `tracing` on stderr.
//! 2. Load the policy document ([`config::load_policy`]) and index it
//!    ([`policy::PolicyStore`]).
//! 3. Run the subcommand:
//!    - `classify`: [`license::ExpressionClassifier`] per expression.
//!    - `curate`: load detections ([`evidence::loader`]), aggregate them
//!      ([`evidence::EvidenceAggregator`]) and select a license per package
//!      ([`curation`]).
//!    - `diff`: [`license::change::assess_change`].
//! 4. Render the requested report ([`report`] or JSON).
//! 5. Exit `1` when something needs action: a rejected expression, a package
//!    needing an alternative, or a license change requiring action.

mod cli;
mod config;
mod curation;
mod error;
mod evidence;
mod license;
mod models;
mod policy;
mod report;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ReportFormat};
use config::{load_policy, UnlistedCombination};
use curation::summary::{ClassificationSummary, CurationSummary};
use curation::{CurationOutcome, CurationSelector};
use evidence::{EvidenceAggregator, Ingested};
use license::change::assess_change;
use license::ExpressionClassifier;
use models::{ClassificationResult, PolicyAction};
use policy::PolicyStore;

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "license_curatr=debug"
    } else if quiet {
        "license_curatr=warn"
    } else {
        "license_curatr=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let mut doc = load_policy(Path::new("."), cli.policy.as_deref())?;
    if cli.strict_compat {
        doc.special_rules.unlisted_combination = UnlistedCombination::AssumeIncompatible;
    }
    let store = Arc::new(PolicyStore::from_document(&doc)?);
    let classifier = ExpressionClassifier::new(Arc::clone(&store));

    let needs_action = match &cli.command {
        Command::Classify { expressions } => {
            let results: Vec<ClassificationResult> =
                expressions.iter().map(|e| classifier.classify(e)).collect();

            match cli.report {
                ReportFormat::Terminal => {
                    report::terminal::render_classifications(&results, &store, cli.verbose, cli.quiet)
                }
                ReportFormat::Json => {
                    let output = json!({
                        "summary": ClassificationSummary::from_results(&results),
                        "results": results,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }

            results.iter().any(|r| r.action == PolicyAction::Reject)
        }

        Command::Curate { evidence: evidence_file } => {
            let detections = evidence::loader::load_detections(evidence_file)?;

            let aggregator = Arc::new(EvidenceAggregator::new(doc.curation.weights.clone()));
            let mut discarded = 0usize;
            for detection in detections {
                if aggregator.ingest_detection(detection) == Ingested::BelowThreshold {
                    discarded += 1;
                }
            }
            tracing::info!(
                packages = aggregator.len(),
                discarded,
                "evidence aggregated"
            );

            let selector = Arc::new(CurationSelector::new(classifier, doc.curation.clone()));
            let show_progress = !cli.quiet && matches!(cli.report, ReportFormat::Terminal);
            let outcomes = curation::batch::curate_all(selector, aggregator, show_progress).await;

            match cli.report {
                ReportFormat::Terminal => {
                    report::terminal::render_curation(&outcomes, &store, cli.verbose, cli.quiet)
                }
                ReportFormat::Json => {
                    let output = json!({
                        "summary": CurationSummary::from_outcomes(&outcomes),
                        "outcomes": outcomes,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }

            outcomes
                .iter()
                .any(|o| matches!(o, CurationOutcome::NeedsAlternative { .. }))
        }

        Command::Diff { previous, current } => {
            let change = assess_change(
                previous,
                current,
                &store.special_rules().license_change_severity,
            );

            match cli.report {
                ReportFormat::Terminal => report::terminal::render_change(&change, cli.quiet),
                ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&change)?),
            }

            change.requires_action
        }
    };

    if needs_action {
        if !cli.quiet && matches!(cli.report, ReportFormat::Terminal) {
            eprintln!(" {}", "Policy action required.".red().bold());
        }
        std::process::exit(1);
    }

    Ok(())
}
