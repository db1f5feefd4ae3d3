//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the immutable parameter record (`ParameterSet`) and its keys (`ParamName`)
//! - per-day simulation output rows (`DayState`)

pub mod types;

pub use types::*;
