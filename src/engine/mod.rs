//! Epidemic propagation engine.
//!
//! Consumes a validated `ParameterSet`, an `R_t` trajectory and the delay library,
//! and steps the renewal equation one day at a time.

pub mod imports;
pub mod propagation;
pub mod reporting;

pub use imports::*;
pub use propagation::*;
pub use reporting::*;
