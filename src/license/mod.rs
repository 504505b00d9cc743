//! License expression handling.
//!
//! - [`spdx`] — alias normalization, placeholder detection and the coarse
//!   [`LicenseFamily`](crate::models::LicenseFamily) table.
//! - [`expression`] — single-level `AND` / `OR` expression parser.
//! - [`classifier`] — [`ExpressionClassifier`]: expressions judged against the
//!   company policy.
//! - [`change`] — severity of a license moving between families.

pub mod change;
pub mod classifier;
pub mod expression;
pub mod spdx;

pub use classifier::ExpressionClassifier;
