//! Turning aggregated evidence into curation suggestions.
//!
//! - [`selector`] — [`CurationSelector`]: best candidate, confidence, review flag.
//! - [`batch`] — evaluates every aggregated package on the blocking pool.
//! - [`summary`] — run statistics for reports.

pub mod batch;
pub mod selector;
pub mod summary;

use serde::Serialize;

use crate::models::{ClassificationResult, CurationSuggestion, PackageId};

pub use selector::CurationSelector;

/// Suggestions below this confidence need a human to verify them.
pub const REVIEW_THRESHOLD: f64 = 0.70;
/// Added to a candidate whose expression the policy approves.
pub const APPROVAL_BONUS: f64 = 0.20;
/// Added per contributing source beyond the first.
pub const MULTI_SOURCE_BONUS: f64 = 0.10;

/// Result of evaluating one package.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CurationOutcome {
    Suggested(CurationSuggestion),
    /// Best candidate is forbidden; the package needs replacing, not curating.
    NeedsAlternative {
        package_id: PackageId,
        license: String,
        classification: ClassificationResult,
    },
    /// Only placeholder evidence (or none) was seen.
    NoEvidence { package_id: PackageId },
    Failed { package_id: PackageId, reason: String },
}

impl CurationOutcome {
    pub fn package_id(&self) -> &PackageId {
        match self {
            CurationOutcome::Suggested(s) => &s.package_id,
            CurationOutcome::NeedsAlternative { package_id, .. }
            | CurationOutcome::NoEvidence { package_id }
            | CurationOutcome::Failed { package_id, .. } => package_id,
        }
    }

    pub fn suggestion(&self) -> Option<&CurationSuggestion> {
        match self {
            CurationOutcome::Suggested(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_suggestion(self) -> Option<CurationSuggestion> {
        match self {
            CurationOutcome::Suggested(s) => Some(s),
            _ => None,
        }
    }
}
