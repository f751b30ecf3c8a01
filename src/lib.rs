//! Single-stage rocket sizing.
//!
//! For every (payload, Δv) point the optimizer tries each catalog engine at every
//! allowed count, sizes tanks with the closed-form rocket equation, and keeps the
//! lightest or cheapest feasible configuration. The library crates do the work;
//! this crate wires catalogs and run settings into them for the command-line tools.

pub mod run;

pub use stage_config as config;
pub use stage_core::{axis, constants, units};
pub use stage_export as export;
pub use stage_optimize as optimize;

/// Returns the version of the library for smoke tests.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
