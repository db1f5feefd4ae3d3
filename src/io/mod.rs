//! Input/output helpers.
//!
//! - timeline and ensemble exports (CSV/JSON) (`export`)

pub mod export;

pub use export::*;
