//! Multi-source license evidence.
//!
//! - [`weights`] — [`SourceWeights`]: how much each source is trusted.
//! - [`loader`] — reads detection batches (JSON array or JSON Lines).
//!
//! [`EvidenceAggregator`] folds weighted records into per-package candidate
//! sets. It never clamps; that is the selector's job.

pub mod loader;
pub mod weights;

use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;

use crate::license::expression;
use crate::models::{Detection, EvidenceRecord, PackageId, SourceTag};

pub use weights::SourceWeights;

/// One candidate license for a package, built up from evidence records.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseCandidate {
    /// Normalized expression text; the candidate's identity.
    pub expression: String,
    pub sources: BTreeSet<SourceTag>,
    /// Records ingested per source, repeats included.
    pub hits: BTreeMap<SourceTag, u32>,
    /// Sum of weighted evidence. May exceed 1.0.
    pub accumulated_confidence: f64,
    deep_scan_contribution: f64,
}

impl LicenseCandidate {
    fn new(expression: String) -> Self {
        Self {
            expression,
            sources: BTreeSet::new(),
            hits: BTreeMap::new(),
            accumulated_confidence: 0.0,
            deep_scan_contribution: 0.0,
        }
    }
}

#[derive(Debug, Default)]
struct PackageEvidence {
    candidates: BTreeMap<String, LicenseCandidate>,
    placeholders: u32,
}

/// What [`EvidenceAggregator::ingest`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Recorded,
    /// NOASSERTION or similar; the package is known but gains no candidate.
    Placeholder,
    /// Deep-scan match below the minimum score, or a score outside 0–100.
    BelowThreshold,
}

/// Per-package candidate map.
///
/// Ingestion locks only the shard holding the package, so sources may be
/// ingested from several threads at once without lost updates.
#[derive(Debug)]
pub struct EvidenceAggregator {
    packages: DashMap<PackageId, PackageEvidence>,
    weights: SourceWeights,
}

impl EvidenceAggregator {
    pub fn new(weights: SourceWeights) -> Self {
        Self {
            packages: DashMap::new(),
            weights,
        }
    }

    /// Weigh a raw detection, then ingest it.
    pub fn ingest_detection(&self, detection: Detection) -> Ingested {
        match self.weights.weigh(detection) {
            Some(record) => self.ingest(record),
            None => Ingested::BelowThreshold,
        }
    }

    pub fn ingest(&self, record: EvidenceRecord) -> Ingested {
        let EvidenceRecord {
            package_id,
            license_expression,
            source_tag,
            raw_weight,
        } = record;

        let mut package = self.packages.entry(package_id).or_default();

        if expression::is_placeholder_only(&license_expression) {
            package.placeholders += 1;
            tracing::trace!(source = %source_tag, "placeholder license dropped");
            return Ingested::Placeholder;
        }

        let key = expression::normalize_expression(&license_expression);
        let candidate = package
            .candidates
            .entry(key.clone())
            .or_insert_with(|| LicenseCandidate::new(key));

        let seen = candidate.hits.get(&source_tag).copied().unwrap_or(0);
        let added = match source_tag {
            SourceTag::DeepScan => {
                let step = if seen == 0 {
                    raw_weight
                } else {
                    self.weights.deep_scan_repeat
                };
                let room = (self.weights.deep_scan_ceiling - candidate.deep_scan_contribution)
                    .max(0.0);
                let added = step.min(room);
                candidate.deep_scan_contribution += added;
                added
            }
            _ => raw_weight,
        };

        candidate.accumulated_confidence += added;
        candidate.sources.insert(source_tag);
        *candidate.hits.entry(source_tag).or_insert(0) += 1;

        tracing::trace!(
            expression = %candidate.expression,
            source = %source_tag,
            added,
            total = candidate.accumulated_confidence,
            "evidence recorded"
        );
        Ingested::Recorded
    }

    /// Current candidates for a package, ordered by expression. Empty when the
    /// package is unknown or only placeholders were seen.
    pub fn candidates_for(&self, package_id: &PackageId) -> Vec<LicenseCandidate> {
        self.packages
            .get(package_id)
            .map(|p| p.candidates.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a package's evidence and return its candidates.
    pub fn take(&self, package_id: &PackageId) -> Option<Vec<LicenseCandidate>> {
        self.packages
            .remove(package_id)
            .map(|(_, p)| p.candidates.into_values().collect())
    }

    /// Every package seen so far, placeholder-only ones included, sorted.
    pub fn package_ids(&self) -> Vec<PackageId> {
        let mut ids: Vec<PackageId> = self.packages.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Default for EvidenceAggregator {
    fn default() -> Self {
        Self::new(SourceWeights::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg() -> PackageId {
        PackageId::new("PyPI", "requests", "2.31.0")
    }

    fn record(expr: &str, source: SourceTag) -> EvidenceRecord {
        let weights = SourceWeights::default();
        EvidenceRecord {
            package_id: pkg(),
            license_expression: expr.to_string(),
            source_tag: source,
            raw_weight: weights.base(source),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sources_accumulate_per_expression() {
        let agg = EvidenceAggregator::default();
        agg.ingest(record("MIT", SourceTag::Manifest));
        agg.ingest(record("MIT License", SourceTag::RegistryApi));
        agg.ingest(record("Apache-2.0", SourceTag::DeepScan));

        let candidates = agg.candidates_for(&pkg());
        assert_eq!(candidates.len(), 2);
        let mit = candidates.iter().find(|c| c.expression == "MIT").unwrap();
        assert!(approx(mit.accumulated_confidence, 0.70));
        assert_eq!(mit.sources.len(), 2);
    }

    #[test]
    fn test_repeats_increment_without_clamp() {
        let agg = EvidenceAggregator::default();
        for _ in 0..4 {
            agg.ingest(record("MIT", SourceTag::Manifest));
        }
        let mit = &agg.candidates_for(&pkg())[0];
        assert!(approx(mit.accumulated_confidence, 1.60));
        assert_eq!(mit.hits[&SourceTag::Manifest], 4);
        assert_eq!(mit.sources.len(), 1);
    }

    #[test]
    fn test_deep_scan_repeats_stop_at_ceiling() {
        let agg = EvidenceAggregator::default();
        for _ in 0..10 {
            agg.ingest(record("BSD-3-Clause", SourceTag::DeepScan));
        }
        let bsd = &agg.candidates_for(&pkg())[0];
        assert!(approx(bsd.accumulated_confidence, 0.50));
        assert_eq!(bsd.hits[&SourceTag::DeepScan], 10);
    }

    #[test]
    fn test_placeholders_never_become_candidates() {
        let agg = EvidenceAggregator::default();
        assert_eq!(agg.ingest(record("NOASSERTION", SourceTag::Manifest)), Ingested::Placeholder);
        assert_eq!(agg.ingest(record("", SourceTag::RegistryApi)), Ingested::Placeholder);
        assert!(agg.candidates_for(&pkg()).is_empty());
        assert_eq!(agg.package_ids(), vec![pkg()]);
    }

    #[test]
    fn test_compound_placeholders_never_become_candidates() {
        let agg = EvidenceAggregator::default();
        assert_eq!(
            agg.ingest(record("NOASSERTION AND NONE", SourceTag::Manifest)),
            Ingested::Placeholder
        );
        assert_eq!(
            agg.ingest(record("NOASSERTION/NONE", SourceTag::RegistryApi)),
            Ingested::Placeholder
        );
        assert!(agg.candidates_for(&pkg()).is_empty());

        assert_eq!(
            agg.ingest(record("NOASSERTION OR MIT", SourceTag::DeepScan)),
            Ingested::Recorded
        );
        assert_eq!(agg.candidates_for(&pkg()).len(), 1);
    }

    #[test]
    fn test_low_score_detection_discarded() {
        let agg = EvidenceAggregator::default();
        let detection = Detection {
            package_id: pkg(),
            license_expression: "MIT".to_string(),
            source_tag: SourceTag::DeepScan,
            score: Some(30.0),
        };
        assert_eq!(agg.ingest_detection(detection), Ingested::BelowThreshold);
        assert!(agg.is_empty());

        let nan = Detection {
            package_id: pkg(),
            license_expression: "MIT".to_string(),
            source_tag: SourceTag::DeepScan,
            score: Some(f64::NAN),
        };
        assert_eq!(agg.ingest_detection(nan), Ingested::BelowThreshold);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_take_discards_state() {
        let agg = EvidenceAggregator::default();
        agg.ingest(record("MIT", SourceTag::Manifest));
        assert_eq!(agg.take(&pkg()).map(|c| c.len()), Some(1));
        assert!(agg.take(&pkg()).is_none());
        assert!(agg.candidates_for(&pkg()).is_empty());
    }

    #[test]
    fn test_concurrent_ingestion_loses_nothing() {
        let agg = EvidenceAggregator::default();
        let sources = [
            SourceTag::Manifest,
            SourceTag::RegistryApi,
            SourceTag::PriorCuration,
        ];

        std::thread::scope(|s| {
            for source in sources {
                let agg = &agg;
                s.spawn(move || {
                    for i in 0..50 {
                        let id = PackageId::new("NPM", format!("pkg-{}", i % 5), "1.0.0");
                        agg.ingest(EvidenceRecord {
                            package_id: id,
                            license_expression: "MIT".to_string(),
                            source_tag: source,
                            raw_weight: 0.01,
                        });
                    }
                });
            }
        });

        assert_eq!(agg.len(), 5);
        for id in agg.package_ids() {
            let mit = &agg.candidates_for(&id)[0];
            let total: u32 = mit.hits.values().sum();
            assert_eq!(total, 30);
            assert_eq!(mit.sources.len(), 3);
        }
    }
}
