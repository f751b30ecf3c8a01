//! Stage sizing physics: the closed-form evaluator over (Δv × payload × engine
//! variant) grids and the iterative inverse solver for forward-only models.

pub mod evaluator;
pub mod forward;
pub mod solver;

pub use evaluator::{
    CellSizing, EngineVariant, EvaluateError, StageRequirements, StageTensors,
    evaluate_all_families, evaluate_stage, size_cell, structural_fraction_for,
    structure_and_propellant_mass,
};
pub use forward::{
    ForwardSamples, LinearForwardModel, iterative_forward_optimizer, sample_forward_grid,
};
pub use solver::{ForwardModel, InverseSolution, SolverConfig, SolverStatus, solve_inverse};
