//! Delay distribution library.
//!
//! Converts delay assumptions (generation interval, incubation, time to hospital
//! admission, length of stay, time to death) into per-day probability mass arrays.

pub mod distribution;
pub mod shapes;

pub use distribution::*;
pub use shapes::*;
