use std::sync::Arc;

use crate::config::DualLicenseStrategy;
use crate::license::expression::{self, LicenseExpression};
use crate::license::spdx;
use crate::models::{
    ClassificationResult, CompatibilityIssue, LicenseCategory, PolicyAction, PolicyStatus,
    RiskLevel,
};
use crate::policy::{LicensePolicyEntry, PolicyStore};

/// Classifies license expressions against a [`PolicyStore`].
///
/// Handles:
/// - single ids (aliases resolved, `WITH` exceptions fall back to the base id)
/// - `OR` expressions → first approved, else first conditional operand
/// - `AND` expressions → pairwise compatibility, then most restrictive status
/// - placeholders and unparseable input → `UNKNOWN` with an explicit reason
///
/// Classification is a pure function of the expression and the store.
#[derive(Debug, Clone)]
pub struct ExpressionClassifier {
    store: Arc<PolicyStore>,
}

impl ExpressionClassifier {
    pub fn new(store: Arc<PolicyStore>) -> Self {
        Self { store }
    }

    pub fn classify(&self, expression: &str) -> ClassificationResult {
        if expression::is_placeholder_only(expression) {
            return self.unknown(
                expression,
                spdx::NOASSERTION,
                "No license asserted (NOASSERTION)".to_string(),
            );
        }

        match expression::parse(expression) {
            Ok(LicenseExpression::Single(id)) => {
                let mut result = self.classify_single(&id);
                result.expression = expression.to_string();
                result
            }
            Ok(LicenseExpression::AnyOf(ids)) => self.classify_any_of(expression, &ids),
            Ok(LicenseExpression::AllOf(ids)) => self.classify_all_of(expression, &ids),
            Err(err) => {
                tracing::debug!(expression, error = %err, "unparseable license expression");
                self.unknown(expression, &spdx::normalize(expression), err.to_string())
            }
        }
    }

    fn classify_single(&self, id: &str) -> ClassificationResult {
        if spdx::is_placeholder(id) {
            return self.unknown(id, spdx::NOASSERTION, "No license asserted (NOASSERTION)".to_string());
        }

        if let Some(entry) = self.store.lookup(id) {
            let reason = entry.reason.clone().unwrap_or_else(|| {
                format!("{} is listed as {} ({})", id, entry.tier, entry.category)
            });
            return from_entry(id, entry, reason);
        }

        // `X WITH exception`: an unlisted exception never makes X stricter.
        let base = spdx::base_id(id);
        if base != id {
            if let Some(entry) = self.store.lookup(base) {
                let reason = format!(
                    "Exception clause not listed in policy; classified by base license {}",
                    base
                );
                return from_entry(id, entry, reason);
            }
        }

        let reason = if spdx::looks_like_spdx_id(id) {
            "License not found in policy database".to_string()
        } else {
            format!(
                "'{}' is not a recognised SPDX identifier and is not in the policy database",
                id
            )
        };
        self.unknown(id, id, reason)
    }

    fn classify_any_of(&self, raw: &str, ids: &[String]) -> ClassificationResult {
        let results: Vec<ClassificationResult> =
            ids.iter().map(|id| self.classify_single(id)).collect();
        let normalized = ids.join(" OR ");

        let chosen = match self.store.special_rules().dual_license_strategy {
            DualLicenseStrategy::ChooseMostPermissive => results
                .iter()
                .position(|r| r.status == PolicyStatus::Approved)
                .or_else(|| {
                    results
                        .iter()
                        .position(|r| r.status == PolicyStatus::Conditional)
                }),
        };

        if let Some(index) = chosen {
            let mut result = results[index].clone();
            result.reason = format!(
                "Dual-licensed: chose {} from [{}]. {}",
                ids[index],
                ids.join(", "),
                result.reason
            );
            result.expression = raw.to_string();
            result.normalized_expression = normalized;
            result.chosen_sub_expression = Some(ids[index].clone());
            result.options = ids.to_vec();
            return result;
        }

        ClassificationResult {
            expression: raw.to_string(),
            normalized_expression: normalized,
            status: PolicyStatus::Forbidden,
            risk_level: RiskLevel::High,
            category: LicenseCategory::DualLicensed,
            reason: format!(
                "All license options are forbidden or unknown: [{}]",
                ids.join(", ")
            ),
            action: PolicyAction::Reject,
            auto_approve: false,
            approval_required: false,
            approvers: Vec::new(),
            conditions: Vec::new(),
            compatibility_issues: Vec::new(),
            chosen_sub_expression: None,
            options: ids.to_vec(),
        }
    }

    fn classify_all_of(&self, raw: &str, ids: &[String]) -> ClassificationResult {
        let normalized = ids.join(" AND ");

        let mut issues = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                let (compatible, reason) = self.store.check_compatibility(a, b);
                if !compatible {
                    issues.push(CompatibilityIssue {
                        license_a: a.clone(),
                        license_b: b.clone(),
                        reason,
                    });
                }
            }
        }

        let mut result = ClassificationResult {
            expression: raw.to_string(),
            normalized_expression: normalized,
            status: PolicyStatus::Incompatible,
            risk_level: RiskLevel::Critical,
            category: LicenseCategory::MultiLicensed,
            reason: String::new(),
            action: PolicyAction::Reject,
            auto_approve: false,
            approval_required: false,
            approvers: Vec::new(),
            conditions: Vec::new(),
            compatibility_issues: Vec::new(),
            chosen_sub_expression: None,
            options: ids.to_vec(),
        };

        if !issues.is_empty() {
            let pairs: Vec<String> = issues
                .iter()
                .map(|i| format!("{} + {}: {}", i.license_a, i.license_b, i.reason))
                .collect();
            result.reason = format!(
                "License combination has compatibility issues: {}",
                pairs.join("; ")
            );
            result.compatibility_issues = issues;
            return result;
        }

        let parts: Vec<ClassificationResult> =
            ids.iter().map(|id| self.classify_single(id)).collect();
        result.approvers = merge_unique(parts.iter().map(|p| &p.approvers));
        result.conditions = merge_unique(parts.iter().map(|p| &p.conditions));

        let forbidden: Vec<&str> = parts
            .iter()
            .filter(|p| p.status == PolicyStatus::Forbidden)
            .map(|p| p.normalized_expression.as_str())
            .collect();

        if !forbidden.is_empty() {
            result.status = PolicyStatus::Forbidden;
            result.reason = format!(
                "At least one license in combination is forbidden: {}",
                forbidden.join(", ")
            );
        } else if parts.iter().all(|p| p.status == PolicyStatus::Approved) {
            result.status = PolicyStatus::Approved;
            result.risk_level = RiskLevel::Low;
            result.auto_approve = parts.iter().all(|p| p.auto_approve);
            result.approval_required = parts.iter().any(|p| p.approval_required);
            result.action = approved_action(result.auto_approve);
            result.reason = "All licenses in combination are approved".to_string();
        } else {
            let statuses: Vec<String> = parts
                .iter()
                .map(|p| format!("{}: {}", p.normalized_expression, p.status))
                .collect();
            result.status = PolicyStatus::Conditional;
            result.risk_level = RiskLevel::Medium;
            result.approval_required = true;
            result.action = PolicyAction::Review;
            result.reason = format!(
                "Multi-license combination requires review ({})",
                statuses.join(", ")
            );
        }
        result
    }

    fn unknown(&self, raw: &str, normalized: &str, reason: String) -> ClassificationResult {
        ClassificationResult {
            expression: raw.to_string(),
            normalized_expression: normalized.to_string(),
            status: PolicyStatus::Unknown,
            risk_level: RiskLevel::High,
            category: LicenseCategory::Unknown,
            reason,
            action: self.store.special_rules().unknown_license_action,
            auto_approve: false,
            approval_required: true,
            approvers: Vec::new(),
            conditions: Vec::new(),
            compatibility_issues: Vec::new(),
            chosen_sub_expression: None,
            options: Vec::new(),
        }
    }
}

fn approved_action(auto_approve: bool) -> PolicyAction {
    if auto_approve {
        PolicyAction::Accept
    } else {
        PolicyAction::Review
    }
}

fn from_entry(id: &str, entry: &LicensePolicyEntry, reason: String) -> ClassificationResult {
    let status = entry.tier.status();
    let action = match status {
        PolicyStatus::Approved => approved_action(entry.auto_approve),
        PolicyStatus::Conditional => PolicyAction::Review,
        _ => PolicyAction::Reject,
    };

    ClassificationResult {
        expression: id.to_string(),
        normalized_expression: id.to_string(),
        status,
        risk_level: entry.risk_level,
        category: entry.category,
        reason,
        action,
        auto_approve: entry.auto_approve,
        approval_required: entry.approval_required,
        approvers: entry.approvers.clone(),
        conditions: entry.conditions.clone(),
        compatibility_issues: Vec::new(),
        chosen_sub_expression: None,
        options: Vec::new(),
    }
}

/// Concatenate lists, dropping repeats but keeping first-seen order.
fn merge_unique<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for item in lists.flatten() {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{store_from_toml, TEST_POLICY};
    use proptest::prelude::*;

    const APPROVED: &[&str] = &["MIT", "Apache-2.0", "BSD-3-Clause", "ISC"];
    const OTHERS: &[&str] = &[
        "LGPL-2.1-only",
        "MPL-2.0",
        "GPL-2.0-only",
        "GPL-3.0-only",
        "AGPL-3.0-only",
        "Foo-1.0",
        "NOASSERTION",
    ];

    fn classifier() -> ExpressionClassifier {
        ExpressionClassifier::new(store_from_toml(TEST_POLICY))
    }

    #[test]
    fn test_single_tiers() {
        let c = classifier();
        assert_eq!(c.classify("MIT").status, PolicyStatus::Approved);
        assert_eq!(c.classify("MIT").action, PolicyAction::Accept);
        assert_eq!(c.classify("MPL-2.0").status, PolicyStatus::Conditional);
        assert_eq!(c.classify("MPL-2.0").approvers, vec!["legal"]);
        assert_eq!(c.classify("GPL-3.0-only").status, PolicyStatus::Forbidden);
        assert_eq!(c.classify("GPL-3.0-only").reason, "Strong copyleft");
    }

    #[test]
    fn test_alias_resolved_and_visible() {
        let result = classifier().classify("MIT License");
        assert_eq!(result.status, PolicyStatus::Approved);
        assert_eq!(result.expression, "MIT License");
        assert_eq!(result.normalized_expression, "MIT");
    }

    #[test]
    fn test_unknown_single() {
        let result = classifier().classify("Zlib");
        assert_eq!(result.status, PolicyStatus::Unknown);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.action, PolicyAction::Review);
        assert_eq!(result.reason, "License not found in policy database");

        let odd = classifier().classify("Foo Public License");
        assert_eq!(odd.normalized_expression, "Foo Public License");
        assert!(odd.reason.contains("not a recognised SPDX identifier"));
    }

    #[test]
    fn test_unknown_action_follows_policy() {
        let policy = format!("{}\n[special_rules]\nunknown_license_action = \"reject\"\n", TEST_POLICY);
        let c = ExpressionClassifier::new(store_from_toml(&policy));
        assert_eq!(c.classify("Zlib").action, PolicyAction::Reject);
    }

    #[test]
    fn test_placeholders_are_unknown() {
        let c = classifier();
        for raw in ["NOASSERTION", "", "NONE", "  "] {
            let result = c.classify(raw);
            assert_eq!(result.status, PolicyStatus::Unknown);
            assert_eq!(result.normalized_expression, "NOASSERTION");
        }
    }

    #[test]
    fn test_with_exception_falls_back_to_base() {
        let result = classifier().classify("GPL-2.0-only WITH Classpath-exception-2.0");
        assert_eq!(result.status, PolicyStatus::Forbidden);
        assert!(result.reason.contains("base license GPL-2.0-only"));
    }

    #[test]
    fn test_compound_placeholders_are_unknown() {
        let result = classifier().classify("NOASSERTION AND NONE");
        assert_eq!(result.status, PolicyStatus::Unknown);
        assert_eq!(result.normalized_expression, "NOASSERTION");
    }

    #[test]
    fn test_and_with_exception_checks_base_pair() {
        let result =
            classifier().classify("GPL-2.0-only WITH Classpath-exception-2.0 AND Apache-2.0");
        assert_eq!(result.status, PolicyStatus::Incompatible);
        assert_eq!(result.compatibility_issues.len(), 1);
        let issue = &result.compatibility_issues[0];
        assert_eq!(issue.license_a, "GPL-2.0-only WITH Classpath-exception-2.0");
        assert_eq!(issue.license_b, "Apache-2.0");
        assert_eq!(issue.reason, "Apache-2.0 patent terms conflict with GPL-2.0-only");
    }

    #[test]
    fn test_scenario_a_or_chooses_approved() {
        let result = classifier().classify("MIT OR GPL-3.0-only");
        assert_eq!(result.status, PolicyStatus::Approved);
        assert_eq!(result.chosen_sub_expression.as_deref(), Some("MIT"));
        assert_eq!(result.options, vec!["MIT", "GPL-3.0-only"]);
    }

    #[test]
    fn test_or_picks_first_approved_in_declared_order() {
        let result = classifier().classify("GPL-3.0-only OR ISC OR MIT");
        assert_eq!(result.chosen_sub_expression.as_deref(), Some("ISC"));
    }

    #[test]
    fn test_or_falls_back_to_conditional() {
        let result = classifier().classify("GPL-3.0-only OR MPL-2.0 OR LGPL-2.1-only");
        assert_eq!(result.status, PolicyStatus::Conditional);
        assert_eq!(result.chosen_sub_expression.as_deref(), Some("MPL-2.0"));
    }

    #[test]
    fn test_or_all_forbidden_or_unknown() {
        let result = classifier().classify("GPL-3.0-only OR Foo-1.0");
        assert_eq!(result.status, PolicyStatus::Forbidden);
        assert_eq!(result.category, LicenseCategory::DualLicensed);
        assert!(result.reason.starts_with("All license options are forbidden or unknown"));
        assert_eq!(result.chosen_sub_expression, None);
    }

    #[test]
    fn test_scenario_b_and_incompatible() {
        let result = classifier().classify("GPL-2.0-only AND Apache-2.0");
        assert_eq!(result.status, PolicyStatus::Incompatible);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(result.compatibility_issues.len(), 1);
        let issue = &result.compatibility_issues[0];
        assert_eq!(issue.license_a, "GPL-2.0-only");
        assert_eq!(issue.license_b, "Apache-2.0");
    }

    #[test]
    fn test_and_lists_every_offending_pair() {
        let result = classifier().classify("Apache-2.0 AND GPL-2.0-only AND MPL-2.0 AND ISC");
        assert_eq!(result.status, PolicyStatus::Incompatible);
        assert_eq!(result.compatibility_issues.len(), 2);
    }

    #[test]
    fn test_and_statuses() {
        let c = classifier();

        let approved = c.classify("MIT AND BSD-3-Clause");
        assert_eq!(approved.status, PolicyStatus::Approved);
        assert_eq!(approved.conditions, vec!["Keep notices"]);

        let forbidden = c.classify("MIT AND GPL-3.0-only");
        assert_eq!(forbidden.status, PolicyStatus::Forbidden);
        assert_eq!(forbidden.action, PolicyAction::Reject);

        let conditional = c.classify("MIT AND MPL-2.0");
        assert_eq!(conditional.status, PolicyStatus::Conditional);
        assert!(conditional.approval_required);
        assert_eq!(conditional.conditions, vec!["Keep notices", "Dynamic linking only"]);

        let with_unknown = c.classify("MIT AND Foo-1.0");
        assert_eq!(with_unknown.status, PolicyStatus::Conditional);
    }

    #[test]
    fn test_strict_compatibility_default() {
        let policy = format!(
            "{}\n[special_rules]\nunlisted_combination = \"assume_incompatible\"\n",
            TEST_POLICY
        );
        let c = ExpressionClassifier::new(store_from_toml(&policy));
        assert_eq!(c.classify("MIT AND BSD-3-Clause").status, PolicyStatus::Incompatible);
    }

    #[test]
    fn test_parse_errors_degrade_to_unknown() {
        let c = classifier();
        for raw in ["(MIT OR ISC) AND BSD-3-Clause", "MIT OR ISC AND Zlib", "MIT AND", "OR"] {
            let result = c.classify(raw);
            assert_eq!(result.status, PolicyStatus::Unknown, "{}", raw);
            assert!(!result.reason.is_empty());
        }
    }

    proptest! {
        #[test]
        fn prop_approved_singles_are_approved(id in prop::sample::select(APPROVED)) {
            prop_assert_eq!(classifier().classify(id).status, PolicyStatus::Approved);
        }

        #[test]
        fn prop_or_with_approved_operand_is_approved(
            others in prop::collection::vec(prop::sample::select(OTHERS), 0..4),
            approved in prop::sample::select(APPROVED),
            slot in any::<prop::sample::Index>(),
        ) {
            let mut operands: Vec<&str> = others;
            let at = slot.index(operands.len() + 1);
            operands.insert(at, approved);
            let expr = operands.join(" OR ");
            prop_assert_eq!(classifier().classify(&expr).status, PolicyStatus::Approved);
        }

        #[test]
        fn prop_and_with_incompatible_pair_lists_it(
            others in prop::collection::vec(prop::sample::select(APPROVED), 0..3),
            swap in any::<bool>(),
        ) {
            let mut operands: Vec<&str> = others;
            let (first, second) = if swap {
                ("Apache-2.0", "GPL-2.0-only")
            } else {
                ("GPL-2.0-only", "Apache-2.0")
            };
            operands.insert(0, first);
            operands.push(second);
            let result = classifier().classify(&operands.join(" AND "));
            prop_assert_eq!(result.status, PolicyStatus::Incompatible);
            let listed = result.compatibility_issues.iter().any(|i| {
                (i.license_a == first && i.license_b == second)
                    || (i.license_a == second && i.license_b == first)
            });
            prop_assert!(listed, "incompatible pair missing from the issues");
        }

        #[test]
        fn prop_classification_is_idempotent(
            operands in prop::collection::vec(
                prop::sample::select([APPROVED, OTHERS].concat()), 1..4),
            use_and in any::<bool>(),
        ) {
            let expr = operands.join(if use_and { " AND " } else { " OR " });
            let c = classifier();
            prop_assert_eq!(c.classify(&expr), c.classify(&expr));
        }
    }
}
