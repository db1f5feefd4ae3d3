//! Parameter source: best-params files plus command-line overrides.

pub mod loader;
pub mod overrides;

pub use loader::*;
pub use overrides::*;
