//! Forward Δv model of a single-engine linear stage and its numeric inversion.
//!
//! Tensors are laid out `[row, payload, count]`. The forward model reads only the
//! payload and count axes, so rows can hold Δv targets or sampled `m100` values.

use ndarray::{Array1, Array3, Zip};
use stage_core::axis;
use stage_core::constants::G0;
use stage_core::grid::SweepGrid;
use stage_propulsion::{Engine, FlightCondition};

use crate::solver::{ForwardModel, InverseSolution, SolverConfig, solve_inverse};

/// Δv = isp·g·ln(m0 / m1) for one engine fitted 1..=N times.
#[derive(Debug, Clone)]
pub struct LinearForwardModel {
    isp_s: f64,
    structural_fraction: f64,
    payload_t: Array1<f64>,
    counts: Vec<u32>,
    engine_mass_t: f64,
}

impl LinearForwardModel {
    pub fn new(
        engine: &Engine,
        condition: FlightCondition,
        structural_fraction: f64,
        payload_t: Array1<f64>,
        max_count: u32,
    ) -> Self {
        Self {
            isp_s: engine.isp(condition),
            structural_fraction,
            payload_t,
            counts: (1..=max_count).map(|n| engine.effective_count(n)).collect(),
            engine_mass_t: engine.mass_t,
        }
    }

    /// Effective engine count along the last axis.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn payload_t(&self) -> &Array1<f64> {
        &self.payload_t
    }

    /// Shape of a tensor with `rows` rows that this model accepts.
    pub fn shape(&self, rows: usize) -> (usize, usize, usize) {
        (rows, self.payload_t.len(), self.counts.len())
    }
}

impl ForwardModel for LinearForwardModel {
    fn delta_v(&self, m100_t: &Array3<f64>) -> Array3<f64> {
        let mut dv = Array3::zeros(m100_t.raw_dim());
        Zip::indexed(&mut dv)
            .and(m100_t)
            .for_each(|(_, j, k), dv, &m100| {
                let fixed = self.payload_t[j] + self.engine_mass_t * f64::from(self.counts[k]);
                let m0 = fixed + m100;
                let m1 = fixed + m100 * self.structural_fraction;
                *dv = self.isp_s * G0 * (m0 / m1).ln();
            });
        dv
    }
}

/// Δv tabulated over logarithmic payload and `m100` axes.
#[derive(Debug, Clone)]
pub struct ForwardSamples {
    pub payload_t: Array1<f64>,
    pub m100_t: Array1<f64>,
    /// Indexed `[m100, payload, count]`.
    pub delta_v_m_s: Array3<f64>,
    pub counts: Vec<u32>,
}

/// Sample the forward model on a `(payload, m100)` grid of `span` samples per axis.
pub fn sample_forward_grid(
    engine: &Engine,
    condition: FlightCondition,
    structural_fraction: f64,
    payload_bounds_t: (f64, f64),
    m100_bounds_t: (f64, f64),
    span: (usize, usize),
    max_count: u32,
) -> ForwardSamples {
    let payload = axis::logarithmic(payload_bounds_t.0, payload_bounds_t.1, span.0);
    let m100 = axis::logarithmic(m100_bounds_t.0, m100_bounds_t.1, span.1);
    let model = LinearForwardModel::new(engine, condition, structural_fraction, payload.clone(), max_count);
    let m100_tensor = Array3::from_shape_fn(model.shape(m100.len()), |(i, _, _)| m100[i]);
    ForwardSamples {
        delta_v_m_s: model.delta_v(&m100_tensor),
        counts: model.counts().to_vec(),
        payload_t: payload,
        m100_t: m100,
    }
}

/// Invert the forward model over `grid`, returning `m100` indexed `[dv, payload, count]`.
pub fn iterative_forward_optimizer(
    engine: &Engine,
    condition: FlightCondition,
    structural_fraction: f64,
    grid: &SweepGrid,
    max_count: u32,
    config: &SolverConfig,
) -> InverseSolution {
    let model = LinearForwardModel::new(
        engine,
        condition,
        structural_fraction,
        grid.payload_t.clone(),
        max_count,
    );
    let target = Array3::from_shape_fn(model.shape(grid.delta_v_m_s.len()), |(i, _, _)| {
        grid.delta_v_m_s[i]
    });
    solve_inverse(&model, &target, config)
}
