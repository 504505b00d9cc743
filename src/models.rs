use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Policy vocabulary
// ---------------------------------------------------------------------------

/// Outcome of classifying a license expression against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyStatus {
    Approved,
    Conditional,
    Forbidden,
    Unknown,
    Incompatible,
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyStatus::Approved => write!(f, "APPROVED"),
            PolicyStatus::Conditional => write!(f, "CONDITIONAL"),
            PolicyStatus::Forbidden => write!(f, "FORBIDDEN"),
            PolicyStatus::Unknown => write!(f, "UNKNOWN"),
            PolicyStatus::Incompatible => write!(f, "INCOMPATIBLE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Which policy table a license is listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyTier {
    Approved,
    Conditional,
    Forbidden,
}

impl PolicyTier {
    pub fn status(self) -> PolicyStatus {
        match self {
            PolicyTier::Approved => PolicyStatus::Approved,
            PolicyTier::Conditional => PolicyStatus::Conditional,
            PolicyTier::Forbidden => PolicyStatus::Forbidden,
        }
    }

    /// Higher rank wins when a license is listed in more than one tier.
    pub fn precedence(self) -> u8 {
        match self {
            PolicyTier::Approved => 0,
            PolicyTier::Conditional => 1,
            PolicyTier::Forbidden => 2,
        }
    }
}

impl fmt::Display for PolicyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyTier::Approved => write!(f, "approved"),
            PolicyTier::Conditional => write!(f, "conditional"),
            PolicyTier::Forbidden => write!(f, "forbidden"),
        }
    }
}

/// Named policy buckets, plus the derived buckets used for compound expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseCategory {
    Permissive,
    PublicDomain,
    WeakCopyleft,
    StrongCopyleft,
    NetworkCopyleft,
    SourceAvailable,
    Proprietary,
    Commercial,
    DualLicensed,
    MultiLicensed,
    Unknown,
}

impl fmt::Display for LicenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseCategory::Permissive => write!(f, "permissive"),
            LicenseCategory::PublicDomain => write!(f, "public_domain"),
            LicenseCategory::WeakCopyleft => write!(f, "weak_copyleft"),
            LicenseCategory::StrongCopyleft => write!(f, "strong_copyleft"),
            LicenseCategory::NetworkCopyleft => write!(f, "network_copyleft"),
            LicenseCategory::SourceAvailable => write!(f, "source_available"),
            LicenseCategory::Proprietary => write!(f, "proprietary"),
            LicenseCategory::Commercial => write!(f, "commercial"),
            LicenseCategory::DualLicensed => write!(f, "dual_licensed"),
            LicenseCategory::MultiLicensed => write!(f, "multi_licensed"),
            LicenseCategory::Unknown => write!(f, "unknown"),
        }
    }
}

/// Parses the buckets a policy file may declare; derived buckets are rejected.
impl FromStr for LicenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "permissive" => Ok(LicenseCategory::Permissive),
            "public_domain" => Ok(LicenseCategory::PublicDomain),
            "weak_copyleft" => Ok(LicenseCategory::WeakCopyleft),
            "strong_copyleft" => Ok(LicenseCategory::StrongCopyleft),
            "network_copyleft" => Ok(LicenseCategory::NetworkCopyleft),
            "source_available" => Ok(LicenseCategory::SourceAvailable),
            "proprietary" => Ok(LicenseCategory::Proprietary),
            "commercial" => Ok(LicenseCategory::Commercial),
            _ => Err(s.to_string()),
        }
    }
}

/// What a consumer of a classification should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    Accept,
    Review,
    Reject,
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyAction::Accept => write!(f, "accept"),
            PolicyAction::Review => write!(f, "review"),
            PolicyAction::Reject => write!(f, "reject"),
        }
    }
}

/// Coarse license family, independent of any company policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseFamily {
    Permissive,
    WeakCopyleft,
    StrongCopyleft,
    Proprietary,
    Unknown,
}

impl fmt::Display for LicenseFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseFamily::Permissive => write!(f, "Permissive"),
            LicenseFamily::WeakCopyleft => write!(f, "Weak Copyleft"),
            LicenseFamily::StrongCopyleft => write!(f, "Strong Copyleft"),
            LicenseFamily::Proprietary => write!(f, "Proprietary"),
            LicenseFamily::Unknown => write!(f, "Unknown"),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityIssue {
    pub license_a: String,
    pub license_b: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Expression as supplied by the caller.
    pub expression: String,
    /// Expression after alias normalization; unmapped ids appear unchanged.
    pub normalized_expression: String,
    pub status: PolicyStatus,
    pub risk_level: RiskLevel,
    pub category: LicenseCategory,
    pub reason: String,
    pub action: PolicyAction,
    pub auto_approve: bool,
    pub approval_required: bool,
    pub approvers: Vec<String>,
    pub conditions: Vec<String>,
    pub compatibility_issues: Vec<CompatibilityIssue>,
    /// For `OR` expressions, the operand the decision was based on.
    pub chosen_sub_expression: Option<String>,
    /// Operands of a compound expression, in declared order.
    pub options: Vec<String>,
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
#[error("invalid package id '{0}' (expected Ecosystem::name:version)")]
pub struct InvalidPackageId(pub String);

/// `(ecosystem, name, version)`, the key every detection is filed under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId {
    pub ecosystem: String,
    pub name: String,
    pub version: String,
}

impl PackageId {
    pub fn new(
        ecosystem: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}:{}", self.ecosystem, self.name, self.version)
    }
}

impl FromStr for PackageId {
    type Err = InvalidPackageId;

    /// Accepts `Ecosystem:namespace:name:version` (namespace may be empty, as in
    /// `PyPI::requests:2.31.0`) and the short `Ecosystem:name:version`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPackageId(s.to_string());
        let parts: Vec<&str> = s.trim().splitn(4, ':').collect();

        let (ecosystem, name, version) = match parts.as_slice() {
            [eco, ns, name, version] if ns.is_empty() => (*eco, name.to_string(), *version),
            [eco, ns, name, version] => (*eco, format!("{}/{}", ns, name), *version),
            [eco, name, version] => (*eco, name.to_string(), *version),
            _ => return Err(invalid()),
        };

        if ecosystem.is_empty() || name.is_empty() || version.is_empty() {
            return Err(invalid());
        }

        Ok(PackageId::new(ecosystem, name, version))
    }
}

impl TryFrom<String> for PackageId {
    type Error = InvalidPackageId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackageId> for String {
    fn from(id: PackageId) -> Self {
        id.to_string()
    }
}

/// Independent places a license claim can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    Manifest,
    RegistryApi,
    DeepScan,
    PriorCuration,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTag::Manifest => write!(f, "manifest"),
            SourceTag::RegistryApi => write!(f, "registry-api"),
            SourceTag::DeepScan => write!(f, "deep-scan"),
            SourceTag::PriorCuration => write!(f, "prior-curation"),
        }
    }
}

/// One detection event as reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub package_id: PackageId,
    pub license_expression: String,
    pub source_tag: SourceTag,
    /// Scanner match score (0–100); only meaningful for deep scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// A detection after the source weight table has been applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceRecord {
    pub package_id: PackageId,
    pub license_expression: String,
    pub source_tag: SourceTag,
    pub raw_weight: f64,
}

// ---------------------------------------------------------------------------
// Curation output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurationSuggestion {
    pub package_id: PackageId,
    pub recommended_license: String,
    pub policy_status: PolicyStatus,
    /// Always within `[0, 1]`.
    pub final_confidence: f64,
    pub contributing_sources: Vec<SourceTag>,
    pub requires_manual_review: bool,
    pub comment: String,
}
