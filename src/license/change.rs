use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ChangeSeverityOverrides;
use crate::license::expression::{self, LicenseExpression};
use crate::license::spdx;
use crate::models::LicenseFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ChangeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeSeverity::Low => write!(f, "low"),
            ChangeSeverity::Medium => write!(f, "medium"),
            ChangeSeverity::High => write!(f, "high"),
            ChangeSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Assessment of one package's license moving from `previous` to `current`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LicenseChange {
    pub previous: String,
    pub current: String,
    pub previous_family: LicenseFamily,
    pub current_family: LicenseFamily,
    /// `None` when both expressions normalize to the same text.
    pub severity: Option<ChangeSeverity>,
    pub requires_action: bool,
    pub assessment: String,
}

/// Family of a whole expression: `OR` is as permissive as its most
/// permissive option, `AND` as restrictive as its most restrictive part.
pub fn expression_family(raw: &str) -> LicenseFamily {
    let Ok(expr) = expression::parse(raw) else {
        return LicenseFamily::Unknown;
    };
    let families: Vec<LicenseFamily> = expr.operands().iter().map(|id| spdx::family_of(id)).collect();
    match expr {
        LicenseExpression::AllOf(_) => most_restrictive(families),
        _ => most_permissive(families),
    }
}

fn most_permissive(families: Vec<LicenseFamily>) -> LicenseFamily {
    [
        LicenseFamily::Permissive,
        LicenseFamily::WeakCopyleft,
        LicenseFamily::StrongCopyleft,
        LicenseFamily::Proprietary,
    ]
    .into_iter()
    .find(|f| families.contains(f))
    .unwrap_or(LicenseFamily::Unknown)
}

fn most_restrictive(families: Vec<LicenseFamily>) -> LicenseFamily {
    [
        LicenseFamily::Proprietary,
        LicenseFamily::StrongCopyleft,
        LicenseFamily::WeakCopyleft,
        LicenseFamily::Permissive,
    ]
    .into_iter()
    .find(|f| families.contains(f))
    .unwrap_or(LicenseFamily::Unknown)
}

/// Compare two license expressions for the same package.
///
/// Only a move between the permissive and strong copyleft families, or a
/// swap within the permissive family, has a dedicated severity; every other
/// family change is medium.
pub fn assess_change(
    previous: &str,
    current: &str,
    overrides: &ChangeSeverityOverrides,
) -> LicenseChange {
    let previous_family = expression_family(previous);
    let current_family = expression_family(current);

    let severity = if expression::normalize_expression(previous)
        == expression::normalize_expression(current)
    {
        None
    } else {
        use LicenseFamily::*;
        Some(match (previous_family, current_family) {
            (Permissive, StrongCopyleft) => overrides
                .permissive_to_copyleft
                .unwrap_or(ChangeSeverity::Critical),
            (StrongCopyleft, Permissive) => overrides
                .copyleft_to_permissive
                .unwrap_or(ChangeSeverity::High),
            (Permissive, Permissive) => overrides
                .permissive_to_permissive
                .unwrap_or(ChangeSeverity::Low),
            _ => ChangeSeverity::Medium,
        })
    };

    let requires_action = matches!(
        severity,
        Some(ChangeSeverity::Critical) | Some(ChangeSeverity::High)
    );

    let assessment = match severity {
        None => "No license change".to_string(),
        Some(ChangeSeverity::Critical) => {
            "License became more restrictive (copyleft); derivative works may have to be \
             released under the same terms"
                .to_string()
        }
        Some(ChangeSeverity::High) => {
            "Unusual license change; verify the maintainers' intent before relying on it"
                .to_string()
        }
        Some(ChangeSeverity::Medium) => format!(
            "License family changed from {} to {}; review the new terms",
            previous_family, current_family
        ),
        Some(ChangeSeverity::Low) => {
            "Minor license change within the same family".to_string()
        }
    };

    if let Some(severity) = severity {
        tracing::debug!(previous, current, %severity, "license change assessed");
    }

    LicenseChange {
        previous: previous.to_string(),
        current: current.to_string(),
        previous_family,
        current_family,
        severity,
        requires_action,
        assessment,
    }
}
