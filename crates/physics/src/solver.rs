//! Finite-difference inverse solver for forward-only stage models.
//!
//! Given a model mapping an `m100` tensor to the Δv it delivers, find per cell the
//! `m100` whose Δv matches a target. Each round takes a Newton step on the squared
//! residual, so the residual roughly halves per round.

use ndarray::{Array3, Zip};

/// Maps a tensor of combined structure + propellant masses to achieved Δv.
pub trait ForwardModel {
    fn delta_v(&self, m100_t: &Array3<f64>) -> Array3<f64>;
}

impl<F> ForwardModel for F
where
    F: Fn(&Array3<f64>) -> Array3<f64>,
{
    fn delta_v(&self, m100_t: &Array3<f64>) -> Array3<f64> {
        self(m100_t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub max_iter: usize,
    /// Mean squared Δv residual below which the solve stops.
    pub min_error: f64,
    /// Finite-difference step on `m100` (t).
    pub eta: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iter: 10,
            min_error: 0.1,
            eta: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Converged,
    MaxIterations,
}

#[derive(Debug, Clone)]
pub struct InverseSolution {
    pub m100_t: Array3<f64>,
    pub status: SolverStatus,
    pub iterations: usize,
    /// Mean squared residual measured at the start of each round.
    pub error_history: Vec<f64>,
}

impl InverseSolution {
    pub fn final_error(&self) -> Option<f64> {
        self.error_history.last().copied()
    }
}

/// Solve `model.delta_v(m100) == target` cell by cell, starting from `m100 = 1`.
///
/// Cells whose update is not finite restart from 1 on the next round. The error is
/// the mean over cells with a finite residual.
pub fn solve_inverse<M>(model: &M, target: &Array3<f64>, config: &SolverConfig) -> InverseSolution
where
    M: ForwardModel + ?Sized,
{
    let mut m100 = Array3::<f64>::ones(target.raw_dim());
    let mut error_history = Vec::with_capacity(config.max_iter);
    let mut status = SolverStatus::MaxIterations;

    for _ in 0..config.max_iter {
        let p1 = squared_residual(&model.delta_v(&m100), target);
        let stepped = &m100 + config.eta;
        let p2 = squared_residual(&model.delta_v(&stepped), target);

        Zip::from(&mut m100)
            .and(&p1)
            .and(&p2)
            .for_each(|m, &p1, &p2| {
                let slope = (p2 - p1) / config.eta;
                let next = *m - p1 / slope;
                *m = if next.is_finite() { next } else { 1.0 };
            });

        let error = finite_mean(&p1);
        error_history.push(error);
        if error < config.min_error {
            status = SolverStatus::Converged;
            break;
        }
    }

    InverseSolution {
        m100_t: m100,
        status,
        iterations: error_history.len(),
        error_history,
    }
}

fn squared_residual(achieved: &Array3<f64>, target: &Array3<f64>) -> Array3<f64> {
    let mut out = achieved - target;
    out.mapv_inplace(|r| r * r);
    out
}

fn finite_mean(values: &Array3<f64>) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::INFINITY
    } else {
        sum / count as f64
    }
}
