use std::cmp::Ordering;

use crate::config::CurationConfig;
use crate::curation::CurationOutcome;
use crate::evidence::{EvidenceAggregator, LicenseCandidate};
use crate::license::ExpressionClassifier;
use crate::models::{ClassificationResult, CurationSuggestion, PackageId, PolicyStatus, SourceTag};

/// Picks the best-supported license for a package and scores it.
#[derive(Debug, Clone)]
pub struct CurationSelector {
    classifier: ExpressionClassifier,
    settings: CurationConfig,
}

struct Scored<'a> {
    candidate: &'a LicenseCandidate,
    classification: ClassificationResult,
    score: f64,
}

impl Scored<'_> {
    fn approved(&self) -> bool {
        self.classification.status == PolicyStatus::Approved
    }

    /// Higher score first, then approved first, then smaller expression.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.approved().cmp(&self.approved()))
            .then_with(|| self.candidate.expression.cmp(&other.candidate.expression))
    }
}

impl CurationSelector {
    pub fn new(classifier: ExpressionClassifier, settings: CurationConfig) -> Self {
        Self {
            classifier,
            settings,
        }
    }

    /// Take a package's candidates out of the aggregator and evaluate them.
    pub fn curate(&self, aggregator: &EvidenceAggregator, package_id: &PackageId) -> CurationOutcome {
        let candidates = aggregator.take(package_id).unwrap_or_default();
        self.evaluate(package_id, &candidates)
    }

    /// Suggestion for one package, or `None` when there is no evidence or the
    /// best candidate is forbidden.
    pub fn select(
        &self,
        aggregator: &EvidenceAggregator,
        package_id: &PackageId,
    ) -> Option<CurationSuggestion> {
        self.curate(aggregator, package_id).into_suggestion()
    }

    pub fn evaluate(&self, package_id: &PackageId, candidates: &[LicenseCandidate]) -> CurationOutcome {
        let best = candidates
            .iter()
            .map(|candidate| self.score(candidate))
            .min_by(|a, b| a.rank(b));

        let Some(best) = best else {
            tracing::info!(package = %package_id, "no license evidence");
            return CurationOutcome::NoEvidence {
                package_id: package_id.clone(),
            };
        };

        if best.classification.status == PolicyStatus::Forbidden {
            tracing::warn!(
                package = %package_id,
                license = %best.candidate.expression,
                "best candidate is forbidden; package needs an alternative"
            );
            return CurationOutcome::NeedsAlternative {
                package_id: package_id.clone(),
                license: best.candidate.expression.clone(),
                classification: best.classification,
            };
        }

        let requires_manual_review = best.score < self.settings.review_threshold;
        let sources: Vec<SourceTag> = best.candidate.sources.iter().copied().collect();
        let comment = comment(&sources, best.score, requires_manual_review, best.approved());

        tracing::debug!(
            package = %package_id,
            license = %best.candidate.expression,
            confidence = best.score,
            requires_manual_review,
            "curation suggested"
        );

        CurationOutcome::Suggested(CurationSuggestion {
            package_id: package_id.clone(),
            recommended_license: best.candidate.expression.clone(),
            policy_status: best.classification.status,
            final_confidence: best.score,
            contributing_sources: sources,
            requires_manual_review,
            comment,
        })
    }

    fn score<'a>(&self, candidate: &'a LicenseCandidate) -> Scored<'a> {
        let classification = self.classifier.classify(&candidate.expression);
        let approval = if classification.status == PolicyStatus::Approved {
            self.settings.approval_bonus
        } else {
            0.0
        };
        let extra_sources = candidate.sources.len().saturating_sub(1) as f64;
        let raw = candidate.accumulated_confidence
            + approval
            + self.settings.multi_source_bonus * extra_sources;

        Scored {
            candidate,
            classification,
            score: quantize(raw.clamp(0.0, 1.0)),
        }
    }
}

/// Round to six decimals so sums that are equal on paper compare equal.
fn quantize(score: f64) -> f64 {
    (score * 1e6).round() / 1e6
}

fn comment(sources: &[SourceTag], confidence: f64, review: bool, approved: bool) -> String {
    let names: Vec<String> = sources.iter().map(|s| s.to_string()).collect();
    let mut text = format!(
        "License detected from {}. Confidence: {:.0}%. ",
        names.join(", "),
        confidence * 100.0
    );
    if review {
        text.push_str("REQUIRES MANUAL VERIFICATION. ");
    }
    if approved {
        text.push_str("Approved by company policy.");
    } else {
        text.push_str("CHECK POLICY COMPLIANCE before applying.");
    }
    text
}
