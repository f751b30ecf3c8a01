//! Stage optimization façade: selection, stage kinds, and the shared context, with the
//! supporting crates re-exported for consumers.

pub mod context;
pub mod select;
pub mod stage;

pub use facade::*;
pub use stage_pareto as pareto;
pub use stage_physics as physics;
pub use stage_propulsion as propulsion;
pub use stage_tanks as tanks;

mod facade;
