//! Error taxonomy.
//!
//! [`ConfigError`] is fatal: no partially-built policy is ever usable.
//! [`ExpressionParseError`] never escapes the classifier; it is folded into an
//! `UNKNOWN` classification carrying the error text as its reason.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read, parse or validate a policy source.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read policy file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("empty license id in {tier} category '{category}'")]
    EmptyLicenseId { tier: String, category: String },

    #[error("unknown license category '{0}'")]
    UnknownCategory(String),

    #[error("malformed compatibility combination '{0}' (expected '<A> AND <B>')")]
    MalformedCombination(String),

    #[error("conflicting compatibility rules for {license_a} / {license_b}")]
    ConflictingCompatibility { license_a: String, license_b: String },

    #[error("invalid setting {name} = {value}: must be within [0, 1]")]
    InvalidSetting { name: String, value: f64 },
}

/// A license expression the classifier cannot tokenize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionParseError {
    #[error("empty license expression")]
    Empty,

    #[error("nested expressions are not supported: '{0}'")]
    Nested(String),

    #[error("mixed AND/OR without parentheses is not supported: '{0}'")]
    MixedOperators(String),

    #[error("dangling or repeated operator in '{0}'")]
    DanglingOperator(String),
}
