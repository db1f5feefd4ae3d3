//! Reporting: run summaries, per-day tables and comparison tables.

pub mod format;

pub use format::*;
