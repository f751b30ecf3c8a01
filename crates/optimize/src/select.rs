//! Reduction of evaluator tensors to the best engine variant per grid cell.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use stage_core::grid::CellGrid;
use stage_pareto::{ParetoError, Sense, frontier};
use stage_physics::StageTensors;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("cost trade-off fronts need a single grid point, got a {0}x{1} grid")]
    NotSupported(usize, usize),
    #[error("unknown objective `{0}` (expected `mass` or `cost`)")]
    UnknownObjective(String),
    #[error("dominance filter failed: {0}")]
    Pareto(#[from] ParetoError),
}

/// Quantity minimized across engine variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    #[default]
    Mass,
    Cost,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Mass => f.write_str("mass"),
            Objective::Cost => f.write_str("cost"),
        }
    }
}

impl FromStr for Objective {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mass" => Ok(Objective::Mass),
            "cost" => Ok(Objective::Cost),
            _ => Err(SelectError::UnknownObjective(s.to_string())),
        }
    }
}

/// Per-cell winner: variant index (`-1` when nothing is feasible) and its objective value.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub index: CellGrid<i64>,
    pub value: CellGrid<f64>,
}

impl Selection {
    pub fn variant_at(&self, dv: usize, payload: usize) -> Option<usize> {
        self.index
            .get((dv, payload))
            .and_then(|&idx| usize::try_from(idx).ok())
    }

    pub fn feasible_cells(&self) -> usize {
        self.index.iter().filter(|&&idx| idx >= 0).count()
    }
}

/// Minimize `objective` across the variant axis of every cell.
///
/// Ties go to the earliest variant. Cells whose minimum is `+inf` get index `-1`.
pub fn select_best(tensors: &StageTensors, objective: Objective) -> Selection {
    let tensor = match objective {
        Objective::Mass => &tensors.mass_t,
        Objective::Cost => &tensors.cost,
    };
    let best: Array2<(i64, f64)> = tensor.map_axis(Axis(2), argmin);
    Selection {
        index: best.mapv(|(idx, _)| idx),
        value: best.mapv(|(_, value)| value),
    }
}

fn argmin(lane: ArrayView1<'_, f64>) -> (i64, f64) {
    let mut best = (-1, f64::INFINITY);
    for (variant, &value) in lane.iter().enumerate() {
        if value < best.1 {
            best = (variant as i64, value);
        }
    }
    best
}

/// Variants on the (cost, mass) trade-off front of a single-point evaluation, both
/// minimized. Infeasible variants are dropped before filtering.
pub fn pareto_front(tensors: &StageTensors) -> Result<Vec<usize>, SelectError> {
    let (n_dv, n_pl) = tensors.grid_shape();
    if (n_dv, n_pl) != (1, 1) {
        return Err(SelectError::NotSupported(n_dv, n_pl));
    }
    let feasible: Vec<usize> = (0..tensors.variant_count())
        .filter(|&v| tensors.cost[[0, 0, v]].is_finite() && tensors.mass_t[[0, 0, v]].is_finite())
        .collect();
    let points = Array2::from_shape_fn((feasible.len(), 2), |(row, axis)| {
        let v = feasible[row];
        match axis {
            0 => tensors.cost[[0, 0, v]],
            _ => tensors.mass_t[[0, 0, v]],
        }
    });
    let kept = frontier(points.view(), &[Sense::Minimize, Sense::Minimize])?;
    Ok(kept.into_iter().map(|row| feasible[row]).collect())
}
