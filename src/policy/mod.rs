//! Indexed company license policy.
//!
//! - [`store`] — [`PolicyStore`]: per-license entries with tier precedence and
//!   the pairwise compatibility matrix.

pub mod store;

pub use store::{LicensePolicyEntry, PolicyStore};

#[cfg(test)]
pub(crate) fn store_from_toml(content: &str) -> std::sync::Arc<PolicyStore> {
    let doc = crate::config::parse_document(content, "test", false).unwrap();
    std::sync::Arc::new(PolicyStore::from_document(&doc).unwrap())
}

/// Small policy shared by classifier and selector tests.
#[cfg(test)]
pub(crate) const TEST_POLICY: &str = r#"
company_name = "Test Co"

[approved_licenses.permissive]
licenses = ["MIT", "Apache-2.0", "BSD-3-Clause", "ISC"]
conditions = ["Keep notices"]

[conditional_licenses.weak_copyleft]
licenses = ["LGPL-2.1-only", "MPL-2.0"]
approvers = ["legal"]
conditions = ["Dynamic linking only"]

[forbidden_licenses.strong_copyleft]
licenses = ["GPL-2.0-only", "GPL-3.0-only", "AGPL-3.0-only"]
reason = "Strong copyleft"

[[license_compatibility]]
combination = "GPL-2.0-only AND Apache-2.0"
compatible = false
reason = "Apache-2.0 patent terms conflict with GPL-2.0-only"

[[license_compatibility]]
combination = "MPL-2.0 AND ISC"
compatible = false
reason = "Test-only incompatibility"
"#;
