//! Policy document: the serialized form of a company license policy plus the
//! curation knobs, and the logic for finding and loading it.
//!
//! The document is only a transport shape. It is validated and indexed into a
//! [`PolicyStore`](crate::policy::PolicyStore) before anything classifies
//! against it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::curation::{APPROVAL_BONUS, MULTI_SOURCE_BONUS, REVIEW_THRESHOLD};
use crate::error::ConfigError;
use crate::evidence::weights::SourceWeights;
use crate::license::change::ChangeSeverity;
use crate::models::{PolicyAction, RiskLevel};

const DEFAULT_POLICY: &str = include_str!("default_policy.toml");

/// Root policy document, deserialized from `.license-curatr/policy.toml`
/// (or a `.json` file with the same shape).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub policy_version: Option<String>,
    /// Category name → bucket, for licenses usable without review.
    #[serde(default)]
    pub approved_licenses: BTreeMap<String, PolicyBucket>,
    #[serde(default)]
    pub conditional_licenses: BTreeMap<String, PolicyBucket>,
    #[serde(default)]
    pub forbidden_licenses: BTreeMap<String, PolicyBucket>,
    #[serde(default)]
    pub license_compatibility: Vec<CompatibilityEntry>,
    #[serde(default)]
    pub special_rules: SpecialRules,
    #[serde(default)]
    pub curation: CurationConfig,
}

/// A named group of licenses sharing risk level, approvers and conditions.
/// Unset fields take tier-specific defaults when the store is built.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyBucket {
    pub licenses: Vec<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub auto_approve: Option<bool>,
    #[serde(default)]
    pub approval_required: Option<bool>,
    #[serde(default)]
    pub approvers: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Why the bucket is restricted; mostly set on forbidden buckets.
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompatibilityEntry {
    /// `"<A> AND <B>"`
    pub combination: String,
    pub compatible: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DualLicenseStrategy {
    #[default]
    ChooseMostPermissive,
}

/// How a license pair with no compatibility rule is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlistedCombination {
    #[default]
    AssumeCompatible,
    AssumeIncompatible,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeSeverityOverrides {
    #[serde(default)]
    pub permissive_to_copyleft: Option<ChangeSeverity>,
    #[serde(default)]
    pub copyleft_to_permissive: Option<ChangeSeverity>,
    #[serde(default)]
    pub permissive_to_permissive: Option<ChangeSeverity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecialRules {
    #[serde(default)]
    pub dual_license_strategy: DualLicenseStrategy,
    #[serde(default = "default_unknown_action")]
    pub unknown_license_action: PolicyAction,
    #[serde(default)]
    pub unlisted_combination: UnlistedCombination,
    #[serde(default)]
    pub license_change_severity: ChangeSeverityOverrides,
}

fn default_unknown_action() -> PolicyAction {
    PolicyAction::Review
}

impl Default for SpecialRules {
    fn default() -> Self {
        Self {
            dual_license_strategy: DualLicenseStrategy::default(),
            unknown_license_action: default_unknown_action(),
            unlisted_combination: UnlistedCombination::default(),
            license_change_severity: ChangeSeverityOverrides::default(),
        }
    }
}

/// Scoring knobs for the curation selector.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurationConfig {
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,
    #[serde(default = "default_approval_bonus")]
    pub approval_bonus: f64,
    #[serde(default = "default_multi_source_bonus")]
    pub multi_source_bonus: f64,
    #[serde(default)]
    pub weights: SourceWeights,
}

fn default_review_threshold() -> f64 {
    REVIEW_THRESHOLD
}

fn default_approval_bonus() -> f64 {
    APPROVAL_BONUS
}

fn default_multi_source_bonus() -> f64 {
    MULTI_SOURCE_BONUS
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            review_threshold: REVIEW_THRESHOLD,
            approval_bonus: APPROVAL_BONUS,
            multi_source_bonus: MULTI_SOURCE_BONUS,
            weights: SourceWeights::default(),
        }
    }
}

impl CurationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("curation.review_threshold", self.review_threshold)?;
        check_unit("curation.approval_bonus", self.approval_bonus)?;
        check_unit("curation.multi_source_bonus", self.multi_source_bonus)?;
        self.weights.validate()
    }
}

/// Reject values outside `[0, 1]` (NaN included).
pub(crate) fn check_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidSetting {
            name: name.to_string(),
            value,
        })
    }
}

impl PolicyDocument {
    /// Built-in policy used when no policy file is found.
    pub fn builtin() -> Result<Self, ConfigError> {
        parse_document(DEFAULT_POLICY, "<built-in>", false)
    }
}

/// Parse a policy document from text; JSON when `json` is set, TOML otherwise.
pub fn parse_document(content: &str, origin: &str, json: bool) -> Result<PolicyDocument, ConfigError> {
    let parsed: Result<PolicyDocument, String> = if json {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        toml::from_str(content).map_err(|e| e.to_string())
    };

    let document = parsed.map_err(|message| ConfigError::Parse {
        origin: origin.to_string(),
        message,
    })?;
    document.curation.validate()?;
    Ok(document)
}

fn read_document(path: &Path) -> Result<PolicyDocument, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let document = parse_document(&content, &path.display().to_string(), json)?;
    tracing::info!(path = %path.display(), "loaded license policy");
    Ok(document)
}

/// Load the policy document, searching in order:
///
/// 1. `policy_override`: path passed via `--policy`; failing to read it is fatal
/// 2. `<project_path>/.license-curatr/policy.toml`
/// 3. `~/.config/license-curatr/policy.toml`
/// 4. Built-in [`PolicyDocument::builtin`]
pub fn load_policy(project_path: &Path, policy_override: Option<&Path>) -> Result<PolicyDocument, ConfigError> {
    if let Some(path) = policy_override {
        return read_document(path);
    }

    let project_policy = project_path.join(".license-curatr").join("policy.toml");
    if project_policy.exists() {
        return read_document(&project_policy);
    }

    if let Some(home) = dirs::home_dir() {
        let home_policy = home
            .join(".config")
            .join("license-curatr")
            .join("policy.toml");
        if home_policy.exists() {
            return read_document(&home_policy);
        }
    }

    tracing::info!("no policy file found, using built-in policy");
    PolicyDocument::builtin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_policy_parses() {
        let doc = PolicyDocument::builtin().unwrap();
        assert!(doc.approved_licenses.contains_key("permissive"));
        assert!(doc.forbidden_licenses.contains_key("strong_copyleft"));
        assert!(!doc.license_compatibility.is_empty());
        assert_eq!(doc.special_rules.unknown_license_action, PolicyAction::Review);
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let doc = parse_document("company_name = \"Acme\"", "test", false).unwrap();
        assert!(doc.approved_licenses.is_empty());
        assert_eq!(doc.special_rules.unlisted_combination, UnlistedCombination::AssumeCompatible);
        assert_eq!(doc.curation.review_threshold, REVIEW_THRESHOLD);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let content = "[special_rules]\ndual_license_strategy = \"choose_least_permissive\"\n";
        assert!(matches!(
            parse_document(content, "test", false),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_non_string_license_id_is_rejected() {
        let content = "[approved_licenses.permissive]\nlicenses = [\"MIT\", 42]\n";
        assert!(matches!(
            parse_document(content, "test", false),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_misspelled_section_is_rejected() {
        let content = "[approved_license.permissive]\nlicenses = [\"MIT\"]\n";
        assert!(parse_document(content, "test", false).is_err());
    }

    #[test]
    fn test_out_of_range_threshold() {
        let content = "[curation]\nreview_threshold = 1.5\n";
        assert!(matches!(
            parse_document(content, "test", false),
            Err(ConfigError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_load_override_toml_and_json() {
        let dir = TempDir::new().unwrap();

        let toml_path = dir.path().join("policy.toml");
        std::fs::write(&toml_path, "[approved_licenses.permissive]\nlicenses = [\"MIT\"]\n").unwrap();
        let doc = load_policy(dir.path(), Some(&toml_path)).unwrap();
        assert_eq!(doc.approved_licenses["permissive"].licenses, vec!["MIT"]);

        let json_path = dir.path().join("policy.json");
        std::fs::write(
            &json_path,
            r#"{"forbidden_licenses": {"strong_copyleft": {"licenses": ["GPL-3.0-only"]}}}"#,
        )
        .unwrap();
        let doc = load_policy(dir.path(), Some(&json_path)).unwrap();
        assert!(doc.forbidden_licenses.contains_key("strong_copyleft"));
    }

    #[test]
    fn test_missing_override_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load_policy(dir.path(), Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_project_policy_is_discovered() {
        let dir = TempDir::new().unwrap();
        let policy_dir = dir.path().join(".license-curatr");
        std::fs::create_dir_all(&policy_dir).unwrap();
        std::fs::write(
            policy_dir.join("policy.toml"),
            "company_name = \"Project Co\"\n",
        )
        .unwrap();
        let doc = load_policy(dir.path(), None).unwrap();
        assert_eq!(doc.company_name.as_deref(), Some("Project Co"));
    }
}
