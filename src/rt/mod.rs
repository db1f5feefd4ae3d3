//! Reproduction-number trajectory builder.

pub mod sigmoid;
pub mod trajectory;

pub use sigmoid::*;
pub use trajectory::*;
