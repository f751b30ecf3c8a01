//! Core constants, grid axes, and tensor aliases shared across the stage optimizer workspace.

/// Physical constants used by the stage model.
pub mod constants {
    /// Surface gravity used for ISP conversion and TWR checks (m/s²).
    pub const G0: f64 = 9.8;
}

/// Mass, force, and exhaust-velocity helpers.
///
/// Masses are tons and thrusts kilonewtons throughout, so `thrust / (mass * G0)`
/// is dimensionless without any scaling.
pub mod units {
    use super::constants::G0;

    /// Effective exhaust velocity (m/s) for a specific impulse in seconds.
    #[inline]
    pub fn exhaust_velocity(isp_seconds: f64) -> f64 {
        isp_seconds * G0
    }

    /// Thrust-to-weight ratio for a thrust in kN acting on a mass in tons.
    #[inline]
    pub fn thrust_to_weight(thrust_kn: f64, mass_t: f64) -> f64 {
        thrust_kn / (mass_t * G0)
    }

    /// Ideal Δv (m/s) from the Tsiolkovsky equation.
    #[inline]
    pub fn rocket_delta_v(isp_seconds: f64, wet_mass_t: f64, dry_mass_t: f64) -> f64 {
        exhaust_velocity(isp_seconds) * (wet_mass_t / dry_mass_t).ln()
    }
}

/// Grid axes for (Δv × payload) sweeps.
pub mod axis {
    use ndarray::Array1;

    /// Evenly spaced samples between `start` and `end` inclusive.
    pub fn linear(start: f64, end: f64, count: usize) -> Array1<f64> {
        match count {
            0 => Array1::zeros(0),
            1 => Array1::from_elem(1, start),
            _ => Array1::linspace(start, end, count),
        }
    }

    /// Logarithmically spaced samples between `start` and `end` inclusive.
    ///
    /// Both bounds must be positive; payload sweeps use this spacing.
    pub fn logarithmic(start: f64, end: f64, count: usize) -> Array1<f64> {
        match count {
            0 => Array1::zeros(0),
            1 => Array1::from_elem(1, start),
            _ => Array1::logspace(10.0, start.log10(), end.log10(), count),
        }
    }
}

/// Tensor aliases for the evaluator's (Δv, payload, variant) layout.
pub mod grid {
    use ndarray::{Array1, Array2, Array3};

    /// Per-variant tensor indexed by `[dv, payload, variant]`.
    pub type StageTensor = Array3<f64>;

    /// Per-cell reduction indexed by `[dv, payload]`.
    pub type CellGrid<T> = Array2<T>;

    /// Ordered Δv and payload axes describing an optimization sweep.
    #[derive(Debug, Clone, PartialEq)]
    pub struct SweepGrid {
        pub delta_v_m_s: Array1<f64>,
        pub payload_t: Array1<f64>,
    }

    impl SweepGrid {
        pub fn new(delta_v_m_s: Array1<f64>, payload_t: Array1<f64>) -> Self {
            Self {
                delta_v_m_s,
                payload_t,
            }
        }

        /// Grid with a single (Δv, payload) cell.
        pub fn point(delta_v_m_s: f64, payload_t: f64) -> Self {
            Self::new(
                Array1::from_elem(1, delta_v_m_s),
                Array1::from_elem(1, payload_t),
            )
        }

        /// Linear Δv axis against a logarithmic payload axis, `span` samples each.
        pub fn sweep(payload_bounds_t: (f64, f64), dv_bounds_m_s: (f64, f64), span: usize) -> Self {
            Self::new(
                super::axis::linear(dv_bounds_m_s.0, dv_bounds_m_s.1, span),
                super::axis::logarithmic(payload_bounds_t.0, payload_bounds_t.1, span),
            )
        }

        /// `(|Δv|, |payload|)`.
        pub fn shape(&self) -> (usize, usize) {
            (self.delta_v_m_s.len(), self.payload_t.len())
        }

        pub fn is_single_point(&self) -> bool {
            self.shape() == (1, 1)
        }
    }
}
