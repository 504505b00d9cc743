use serde::Deserialize;

use crate::config::check_unit;
use crate::error::ConfigError;
use crate::models::{Detection, EvidenceRecord, SourceTag};

/// Per-source reliability weights, configurable under `[curation.weights]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceWeights {
    /// Declared in the package manifest.
    pub manifest: f64,
    /// Reported by the package registry API.
    pub registry_api: f64,
    /// First deep-scan hit for an expression.
    pub deep_scan: f64,
    /// Added for each further deep-scan hit of the same expression.
    pub deep_scan_repeat: f64,
    /// Upper bound on what deep-scan hits contribute to one candidate.
    pub deep_scan_ceiling: f64,
    /// Deep-scan detections scoring below this (0–100) are discarded.
    pub deep_scan_min_score: f64,
    /// An earlier (possibly AI-assisted) curation suggestion.
    pub prior_curation: f64,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            manifest: 0.40,
            registry_api: 0.30,
            deep_scan: 0.30,
            deep_scan_repeat: 0.05,
            deep_scan_ceiling: 0.50,
            deep_scan_min_score: 80.0,
            prior_curation: 0.20,
        }
    }
}

impl SourceWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("curation.weights.manifest", self.manifest)?;
        check_unit("curation.weights.registry_api", self.registry_api)?;
        check_unit("curation.weights.deep_scan", self.deep_scan)?;
        check_unit("curation.weights.deep_scan_repeat", self.deep_scan_repeat)?;
        check_unit("curation.weights.deep_scan_ceiling", self.deep_scan_ceiling)?;
        check_unit("curation.weights.prior_curation", self.prior_curation)?;
        if !(0.0..=100.0).contains(&self.deep_scan_min_score) {
            return Err(ConfigError::InvalidSetting {
                name: "curation.weights.deep_scan_min_score".to_string(),
                value: self.deep_scan_min_score,
            });
        }
        Ok(())
    }

    /// Weight of a first hit from `source`.
    pub fn base(&self, source: SourceTag) -> f64 {
        match source {
            SourceTag::Manifest => self.manifest,
            SourceTag::RegistryApi => self.registry_api,
            SourceTag::DeepScan => self.deep_scan,
            SourceTag::PriorCuration => self.prior_curation,
        }
    }

    /// Turn a detection into a weighted record, or `None` for a deep-scan
    /// match below the score threshold or any score outside 0–100.
    pub fn weigh(&self, detection: Detection) -> Option<EvidenceRecord> {
        if let Some(score) = detection.score {
            if !(0.0..=100.0).contains(&score) {
                tracing::warn!(
                    package = %detection.package_id,
                    source = %detection.source_tag,
                    score,
                    "discarding detection with invalid score"
                );
                return None;
            }
        }

        if detection.source_tag == SourceTag::DeepScan {
            if let Some(score) = detection.score {
                if score < self.deep_scan_min_score {
                    tracing::debug!(
                        package = %detection.package_id,
                        score,
                        "discarding low-score deep-scan match"
                    );
                    return None;
                }
            }
        }

        Some(EvidenceRecord {
            raw_weight: self.base(detection.source_tag),
            package_id: detection.package_id,
            license_expression: detection.license_expression,
            source_tag: detection.source_tag,
        })
    }
}
