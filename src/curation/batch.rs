use std::sync::Arc;

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};

use crate::curation::{CurationOutcome, CurationSelector};
use crate::evidence::EvidenceAggregator;
use crate::models::PackageId;

/// Packages evaluated concurrently before the next batch is submitted.
pub const BATCH_SIZE: usize = 75;

/// Evaluate every package in the aggregator, in `PackageId` order.
///
/// Each package runs on tokio's blocking pool; a panic while evaluating one
/// package becomes [`CurationOutcome::Failed`] for that package only.
pub async fn curate_all(
    selector: Arc<CurationSelector>,
    aggregator: Arc<EvidenceAggregator>,
    show_progress: bool,
) -> Vec<CurationOutcome> {
    let ids = aggregator.package_ids();

    let pb = if show_progress {
        let pb = ProgressBar::new(ids.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    } else {
        None
    };

    let evaluate = Arc::new(move |id: &PackageId| selector.curate(&aggregator, id));
    let outcomes = run_batches(&ids, evaluate, pb.as_ref()).await;

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    outcomes
}

async fn run_batches<F>(
    ids: &[PackageId],
    evaluate: Arc<F>,
    pb: Option<&ProgressBar>,
) -> Vec<CurationOutcome>
where
    F: Fn(&PackageId) -> CurationOutcome + Send + Sync + 'static,
{
    let mut outcomes = Vec::with_capacity(ids.len());

    for batch in ids.chunks(BATCH_SIZE) {
        let tasks: Vec<_> = batch
            .iter()
            .map(|id| {
                let evaluate = Arc::clone(&evaluate);
                let id = id.clone();
                tokio::task::spawn_blocking(move || evaluate(&id))
            })
            .collect();

        let results = join_all(tasks).await;

        for (id, result) in batch.iter().zip(results) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(package = %id, error = %err, "package evaluation failed");
                    CurationOutcome::Failed {
                        package_id: id.clone(),
                        reason: err.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
            if let Some(pb) = pb {
                pb.inc(1);
            }
        }
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CurationConfig;
    use crate::license::ExpressionClassifier;
    use crate::models::{EvidenceRecord, SourceTag};
    use crate::policy::{store_from_toml, TEST_POLICY};

    fn record(id: &PackageId, expr: &str, source: SourceTag) -> EvidenceRecord {
        EvidenceRecord {
            package_id: id.clone(),
            license_expression: expr.to_string(),
            source_tag: source,
            raw_weight: 0.40,
        }
    }

    #[tokio::test]
    async fn test_curate_all_orders_and_isolates() {
        let selector = Arc::new(CurationSelector::new(
            ExpressionClassifier::new(store_from_toml(TEST_POLICY)),
            CurationConfig::default(),
        ));
        let aggregator = Arc::new(EvidenceAggregator::default());

        for i in (0..200).rev() {
            let id = PackageId::new("NPM", format!("pkg-{:03}", i), "1.0.0");
            let expr = match i % 4 {
                0 => "MIT",
                1 => "GPL-3.0-only",
                2 => "NOASSERTION",
                _ => "MPL-2.0",
            };
            aggregator.ingest(record(&id, expr, SourceTag::Manifest));
        }

        let outcomes = curate_all(selector, Arc::clone(&aggregator), false).await;
        assert_eq!(outcomes.len(), 200);
        assert!(outcomes
            .windows(2)
            .all(|w| w[0].package_id() < w[1].package_id()));

        let suggested = outcomes.iter().filter(|o| o.suggestion().is_some()).count();
        let alternatives = outcomes
            .iter()
            .filter(|o| matches!(o, CurationOutcome::NeedsAlternative { .. }))
            .count();
        let empty = outcomes
            .iter()
            .filter(|o| matches!(o, CurationOutcome::NoEvidence { .. }))
            .count();
        assert_eq!((suggested, alternatives, empty), (100, 50, 50));
        assert!(aggregator.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_package_fails_alone() {
        let selector = CurationSelector::new(
            ExpressionClassifier::new(store_from_toml(TEST_POLICY)),
            CurationConfig::default(),
        );
        let aggregator = EvidenceAggregator::default();
        let ids: Vec<PackageId> = (0..(BATCH_SIZE + 5))
            .map(|i| PackageId::new("NPM", format!("pkg-{:03}", i), "1.0.0"))
            .collect();
        for id in &ids {
            aggregator.ingest(record(id, "MIT", SourceTag::Manifest));
        }

        let broken = ids[BATCH_SIZE - 1].clone();
        let evaluate = Arc::new(move |id: &PackageId| {
            if *id == broken {
                panic!("corrupt evidence for {}", id);
            }
            selector.curate(&aggregator, id)
        });

        let outcomes = run_batches(&ids, evaluate, None).await;
        assert_eq!(outcomes.len(), ids.len());
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.package_id(), &ids[i]);
            if i == BATCH_SIZE - 1 {
                assert!(matches!(outcome, CurationOutcome::Failed { .. }));
            } else {
                assert!(outcome.suggestion().is_some(), "package {} not suggested", i);
            }
        }
    }
}
