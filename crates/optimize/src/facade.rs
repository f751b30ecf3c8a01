//! Re-exported APIs for consumers of the optimize crate.

pub use crate::context::OptimizerContext;
pub use crate::select::{Objective, SelectError, Selection, pareto_front, select_best};
pub use crate::stage::{
    OptimizeError, PointRequest, StageCandidate, StageKind, StageMap, optimize_map,
    solve_single_point,
};
pub use stage_core::grid::SweepGrid;
pub use stage_physics::{EngineVariant, StageRequirements, StageTensors};
pub use stage_propulsion::{FlightCondition, FuelFamily};
pub use stage_tanks::TankDominance;
