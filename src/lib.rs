//! `epi-renewal` library crate.
//!
//! The binary (`epi`) is a thin wrapper around this library so that:
//!
//! - the renewal engine is testable without spawning processes
//! - runs can be embedded elsewhere (batch sweeps, notebooks, services)
//! - code stays easy to navigate as the project grows
//!
//! Data flows from `params` through `rt` and `delay` into `engine`, which yields a `timeline` for `report`, `plot` and `io`.

pub mod app;
pub mod cli;
pub mod config;
pub mod delay;
pub mod domain;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod io;
pub mod logging;
pub mod params;
pub mod plot;
pub mod report;
pub mod rt;
pub mod timeline;
