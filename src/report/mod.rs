//! Report renderers.
//!
//! - [`terminal`] — colored tables with a summary box for `classify`, `curate`
//!   and `diff`; respects `--verbose` / `--quiet`.
//!
//! JSON output is plain `serde_json` and lives in `main`.

pub mod terminal;
