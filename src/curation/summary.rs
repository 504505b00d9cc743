use serde::Serialize;

use crate::curation::CurationOutcome;
use crate::models::{ClassificationResult, PolicyStatus, RiskLevel};

/// Counts over a set of classifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    pub total: usize,
    pub approved: usize,
    pub conditional: usize,
    pub forbidden: usize,
    pub unknown: usize,
    pub incompatible: usize,
    pub low_risk: usize,
    pub medium_risk: usize,
    pub high_risk: usize,
    pub critical_risk: usize,
    /// Approved share of all classifications, 0–100, rounded down.
    pub compliance_score: u32,
}

impl ClassificationSummary {
    pub fn from_results(results: &[ClassificationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for r in results {
            match r.status {
                PolicyStatus::Approved => summary.approved += 1,
                PolicyStatus::Conditional => summary.conditional += 1,
                PolicyStatus::Forbidden => summary.forbidden += 1,
                PolicyStatus::Unknown => summary.unknown += 1,
                PolicyStatus::Incompatible => summary.incompatible += 1,
            }
            match r.risk_level {
                RiskLevel::Low => summary.low_risk += 1,
                RiskLevel::Medium => summary.medium_risk += 1,
                RiskLevel::High => summary.high_risk += 1,
                RiskLevel::Critical => summary.critical_risk += 1,
            }
        }

        if summary.total > 0 {
            summary.compliance_score = (summary.approved * 100 / summary.total) as u32;
        }
        summary
    }
}

/// Confidence buckets used when reporting suggestions.
pub const HIGH_CONFIDENCE: f64 = 0.70;
pub const MEDIUM_CONFIDENCE: f64 = 0.50;

/// Counts over the outcomes of a curation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurationSummary {
    pub packages: usize,
    pub suggested: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub manual_review: usize,
    pub needs_alternative: usize,
    pub no_evidence: usize,
    pub failed: usize,
}

impl CurationSummary {
    pub fn from_outcomes(outcomes: &[CurationOutcome]) -> Self {
        let mut summary = Self {
            packages: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            match outcome {
                CurationOutcome::Suggested(s) => {
                    summary.suggested += 1;
                    if s.final_confidence >= HIGH_CONFIDENCE {
                        summary.high_confidence += 1;
                    } else if s.final_confidence >= MEDIUM_CONFIDENCE {
                        summary.medium_confidence += 1;
                    } else {
                        summary.low_confidence += 1;
                    }
                    if s.requires_manual_review {
                        summary.manual_review += 1;
                    }
                }
                CurationOutcome::NeedsAlternative { .. } => summary.needs_alternative += 1,
                CurationOutcome::NoEvidence { .. } => summary.no_evidence += 1,
                CurationOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}
