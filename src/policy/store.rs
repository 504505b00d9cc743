use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::{PolicyBucket, PolicyDocument, SpecialRules, UnlistedCombination};
use crate::error::ConfigError;
use crate::license::spdx;
use crate::models::{LicenseCategory, PolicyTier, RiskLevel};

static COMBINATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S.*?)\s+AND\s+(\S.*?)\s*$").expect("static regex"));

/// Policy metadata for one license id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LicensePolicyEntry {
    pub license_id: String,
    pub tier: PolicyTier,
    pub category: LicenseCategory,
    pub risk_level: RiskLevel,
    pub auto_approve: bool,
    pub approval_required: bool,
    /// Role names, in the order approvals should be sought.
    pub approvers: Vec<String>,
    pub conditions: Vec<String>,
    pub reason: Option<String>,
}

/// Verdict for an unordered license pair; stored under the sorted pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityRule {
    pub compatible: bool,
    pub reason: String,
}

/// Indexed, read-only license policy.
///
/// Built once per run with [`PolicyStore::from_document`] and shared by
/// reference (usually behind an `Arc`) with every classifier and selector.
#[derive(Debug)]
pub struct PolicyStore {
    company_name: Option<String>,
    policy_version: Option<String>,
    entries: HashMap<String, LicensePolicyEntry>,
    compatibility: HashMap<(String, String), CompatibilityRule>,
    special_rules: SpecialRules,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl PolicyStore {
    /// Validate and index a policy document.
    ///
    /// A license listed in several tiers resolves forbidden > conditional >
    /// approved. Within one tier the first bucket in name order keeps it.
    pub fn from_document(doc: &PolicyDocument) -> Result<Self, ConfigError> {
        let mut entries: HashMap<String, LicensePolicyEntry> = HashMap::new();

        let tiers = [
            (PolicyTier::Approved, &doc.approved_licenses),
            (PolicyTier::Conditional, &doc.conditional_licenses),
            (PolicyTier::Forbidden, &doc.forbidden_licenses),
        ];

        for (tier, buckets) in tiers {
            for (name, bucket) in buckets {
                let category: LicenseCategory = name
                    .parse()
                    .map_err(ConfigError::UnknownCategory)?;
                for raw_id in &bucket.licenses {
                    let entry = build_entry(tier, category, name, raw_id, bucket)?;
                    insert_entry(&mut entries, entry);
                }
            }
        }

        let mut compatibility: HashMap<(String, String), CompatibilityRule> = HashMap::new();
        for rule in &doc.license_compatibility {
            let (a, b) = parse_combination(&rule.combination)?;
            let key = pair_key(&a, &b);
            match compatibility.get(&key) {
                Some(existing) if existing.compatible != rule.compatible => {
                    return Err(ConfigError::ConflictingCompatibility {
                        license_a: key.0,
                        license_b: key.1,
                    });
                }
                Some(_) => {
                    tracing::debug!(combination = %rule.combination, "duplicate compatibility rule");
                }
                None => {
                    compatibility.insert(
                        key,
                        CompatibilityRule {
                            compatible: rule.compatible,
                            reason: rule.reason.clone(),
                        },
                    );
                }
            }
        }

        tracing::debug!(
            licenses = entries.len(),
            rules = compatibility.len(),
            "policy store built"
        );

        Ok(Self {
            company_name: doc.company_name.clone(),
            policy_version: doc.policy_version.clone(),
            entries,
            compatibility,
            special_rules: doc.special_rules.clone(),
        })
    }

    /// Policy entry for a license id; aliases are resolved first.
    pub fn lookup(&self, license_id: &str) -> Option<&LicensePolicyEntry> {
        self.entries.get(&spdx::normalize(license_id))
    }

    /// Whether two licenses may apply together, and why. Order-insensitive.
    /// A pair carrying `WITH` exceptions that has no rule of its own is
    /// checked by its base ids. Pairs with no rule follow
    /// `special_rules.unlisted_combination`.
    pub fn check_compatibility(&self, a: &str, b: &str) -> (bool, String) {
        let (a, b) = (spdx::normalize(a), spdx::normalize(b));
        let rule = self.compatibility.get(&pair_key(&a, &b)).or_else(|| {
            self.compatibility
                .get(&pair_key(spdx::base_id(&a), spdx::base_id(&b)))
        });
        if let Some(rule) = rule {
            let reason = if rule.reason.is_empty() {
                if rule.compatible {
                    "Listed as compatible".to_string()
                } else {
                    "Listed as incompatible".to_string()
                }
            } else {
                rule.reason.clone()
            };
            return (rule.compatible, reason);
        }

        match self.special_rules.unlisted_combination {
            UnlistedCombination::AssumeCompatible => {
                (true, "Not explicitly listed as incompatible".to_string())
            }
            UnlistedCombination::AssumeIncompatible => (
                false,
                "Combination has not been reviewed by the policy".to_string(),
            ),
        }
    }

    pub fn special_rules(&self) -> &SpecialRules {
        &self.special_rules
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    pub fn policy_version(&self) -> Option<&str> {
        self.policy_version.as_deref()
    }

    pub fn license_count(&self) -> usize {
        self.entries.len()
    }
}

fn build_entry(
    tier: PolicyTier,
    category: LicenseCategory,
    bucket_name: &str,
    raw_id: &str,
    bucket: &PolicyBucket,
) -> Result<LicensePolicyEntry, ConfigError> {
    if raw_id.trim().is_empty() {
        return Err(ConfigError::EmptyLicenseId {
            tier: tier.to_string(),
            category: bucket_name.to_string(),
        });
    }

    let (risk, auto_approve, approval_required) = match tier {
        PolicyTier::Approved => (RiskLevel::Low, true, false),
        PolicyTier::Conditional => (RiskLevel::Medium, false, true),
        PolicyTier::Forbidden => (RiskLevel::Critical, false, false),
    };

    Ok(LicensePolicyEntry {
        license_id: spdx::normalize(raw_id),
        tier,
        category,
        risk_level: bucket.risk_level.unwrap_or(risk),
        auto_approve: bucket.auto_approve.unwrap_or(auto_approve),
        approval_required: bucket.approval_required.unwrap_or(approval_required),
        approvers: bucket.approvers.clone(),
        conditions: bucket.conditions.clone(),
        reason: bucket.reason.clone().or_else(|| bucket.description.clone()),
    })
}

fn insert_entry(entries: &mut HashMap<String, LicensePolicyEntry>, entry: LicensePolicyEntry) {
    match entries.get(&entry.license_id) {
        None => {
            entries.insert(entry.license_id.clone(), entry);
        }
        Some(existing) if entry.tier.precedence() > existing.tier.precedence() => {
            tracing::warn!(
                license = %entry.license_id,
                kept = %entry.tier,
                dropped = %existing.tier,
                "license listed in several policy tiers"
            );
            entries.insert(entry.license_id.clone(), entry);
        }
        Some(existing) => {
            tracing::warn!(
                license = %entry.license_id,
                kept = %format!("{}/{}", existing.tier, existing.category),
                dropped = %format!("{}/{}", entry.tier, entry.category),
                "license listed in several policy categories"
            );
        }
    }
}

fn parse_combination(combination: &str) -> Result<(String, String), ConfigError> {
    let malformed = || ConfigError::MalformedCombination(combination.to_string());
    let caps = COMBINATION.captures(combination).ok_or_else(malformed)?;
    let a = caps.get(1).map(|m| m.as_str()).ok_or_else(malformed)?;
    let b = caps.get(2).map(|m| m.as_str()).ok_or_else(malformed)?;

    if [a, b].iter().any(|id| id.contains(" AND ") || id.contains(" OR ")) {
        return Err(malformed());
    }
    Ok((spdx::normalize(a), spdx::normalize(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_document;

    fn store(content: &str) -> PolicyStore {
        let doc = parse_document(content, "test", false).unwrap();
        PolicyStore::from_document(&doc).unwrap()
    }

    fn build(content: &str) -> Result<PolicyStore, ConfigError> {
        let doc = parse_document(content, "test", false)?;
        PolicyStore::from_document(&doc)
    }

    const BASIC: &str = r#"
[approved_licenses.permissive]
licenses = ["MIT", "Apache License 2.0"]

[conditional_licenses.weak_copyleft]
licenses = ["LGPL-2.1-only"]
approvers = ["legal", "cto"]
conditions = ["Dynamic linking only"]

[forbidden_licenses.strong_copyleft]
licenses = ["GPL-3.0-only"]
reason = "Copyleft"

[[license_compatibility]]
combination = "GPL-2.0-only AND Apache-2.0"
compatible = false
reason = "Patent clause conflict"
"#;

    #[test]
    fn test_lookup_with_tier_defaults() {
        let store = store(BASIC);
        let mit = store.lookup("MIT").unwrap();
        assert_eq!(mit.tier, PolicyTier::Approved);
        assert_eq!(mit.risk_level, RiskLevel::Low);
        assert!(mit.auto_approve);

        let lgpl = store.lookup("LGPL-2.1-only").unwrap();
        assert_eq!(lgpl.category, LicenseCategory::WeakCopyleft);
        assert!(lgpl.approval_required);
        assert_eq!(lgpl.approvers, vec!["legal", "cto"]);

        let gpl = store.lookup("GPL-3.0-only").unwrap();
        assert_eq!(gpl.risk_level, RiskLevel::Critical);
        assert_eq!(gpl.reason.as_deref(), Some("Copyleft"));

        assert!(store.lookup("Zlib").is_none());
    }

    #[test]
    fn test_aliases_resolved_on_both_sides() {
        let store = store(BASIC);
        assert!(store.lookup("Apache-2.0").is_some());
        assert!(store.lookup("MIT License").is_some());
        assert!(store.lookup("GPL-3.0").is_some());
    }

    #[test]
    fn test_forbidden_wins_over_other_tiers() {
        let store = store(
            r#"
[approved_licenses.permissive]
licenses = ["MPL-2.0", "LGPL-3.0-only"]

[conditional_licenses.weak_copyleft]
licenses = ["MPL-2.0"]

[forbidden_licenses.strong_copyleft]
licenses = ["LGPL-3.0-only"]
"#,
        );
        assert_eq!(store.lookup("MPL-2.0").unwrap().tier, PolicyTier::Conditional);
        assert_eq!(store.lookup("LGPL-3.0-only").unwrap().tier, PolicyTier::Forbidden);
    }

    #[test]
    fn test_forbidden_wins_regardless_of_declaration_order() {
        let store = store(
            r#"
[forbidden_licenses.strong_copyleft]
licenses = ["GPL-2.0-only"]

[approved_licenses.permissive]
licenses = ["GPL-2.0-only"]
"#,
        );
        assert_eq!(store.lookup("GPL-2.0-only").unwrap().tier, PolicyTier::Forbidden);
    }

    #[test]
    fn test_compatibility_is_symmetric() {
        let store = store(BASIC);
        let (ok, reason) = store.check_compatibility("Apache-2.0", "GPL-2.0-only");
        assert!(!ok);
        assert_eq!(reason, "Patent clause conflict");
        assert_eq!(
            store.check_compatibility("GPL-2.0-only", "Apache-2.0"),
            store.check_compatibility("Apache-2.0", "GPL-2.0-only")
        );
    }

    #[test]
    fn test_with_exception_pair_uses_base_rule() {
        let store = store(&format!(
            r#"{}
[[license_compatibility]]
combination = "GPL-2.0-only WITH Classpath-exception-2.0 AND MIT"
compatible = true
reason = "Exception covers linking"
"#,
            BASIC
        ));
        let (ok, reason) =
            store.check_compatibility("GPL-2.0-only WITH Classpath-exception-2.0", "Apache-2.0");
        assert!(!ok);
        assert_eq!(reason, "Patent clause conflict");

        let (ok, reason) =
            store.check_compatibility("MIT", "GPL-2.0-only WITH Classpath-exception-2.0");
        assert!(ok);
        assert_eq!(reason, "Exception covers linking");
    }

    #[test]
    fn test_unlisted_pair_default_is_configurable() {
        let permissive = store(BASIC);
        assert!(permissive.check_compatibility("MIT", "Zlib").0);

        let strict = store(&format!(
            "{}\n[special_rules]\nunlisted_combination = \"assume_incompatible\"\n",
            BASIC
        ));
        let (ok, _) = strict.check_compatibility("MIT", "Zlib");
        assert!(!ok);
        assert!(!strict.check_compatibility("GPL-2.0-only", "Apache-2.0").0);
    }

    #[test]
    fn test_config_errors() {
        assert!(matches!(
            build("[approved_licenses.permissive]\nlicenses = [\"  \"]\n"),
            Err(ConfigError::EmptyLicenseId { .. })
        ));
        assert!(matches!(
            build("[approved_licenses.friendly]\nlicenses = [\"MIT\"]\n"),
            Err(ConfigError::UnknownCategory(_))
        ));
        assert!(matches!(
            build("[[license_compatibility]]\ncombination = \"MIT OR GPL-2.0-only\"\ncompatible = true\n"),
            Err(ConfigError::MalformedCombination(_))
        ));
        assert!(matches!(
            build("[[license_compatibility]]\ncombination = \"MIT AND ISC AND Zlib\"\ncompatible = true\n"),
            Err(ConfigError::MalformedCombination(_))
        ));
        assert!(matches!(
            build(
                "[[license_compatibility]]\ncombination = \"MIT AND ISC\"\ncompatible = true\n\
                 [[license_compatibility]]\ncombination = \"ISC AND MIT\"\ncompatible = false\n"
            ),
            Err(ConfigError::ConflictingCompatibility { .. })
        ));
    }

    #[test]
    fn test_builtin_policy_builds() {
        let doc = PolicyDocument::builtin().unwrap();
        let store = PolicyStore::from_document(&doc).unwrap();
        assert!(store.license_count() > 10);
        assert_eq!(store.company_name(), Some("Default"));
    }
}
