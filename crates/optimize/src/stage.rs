//! Stage kinds and the point / map optimization entry points.

use serde::{Deserialize, Serialize};
use stage_core::grid::SweepGrid;
use stage_physics::{EvaluateError, StageRequirements, StageTensors};
use stage_propulsion::FuelFamily;
use stage_tanks::TankError;

use crate::context::OptimizerContext;
use crate::select::{Objective, SelectError, Selection, pareto_front, select_best};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OptimizeError {
    #[error("tank model error: {0}")]
    Tanks(#[from] TankError),
    #[error("stage evaluation failed: {0}")]
    Evaluate(#[from] EvaluateError),
    #[error("selection failed: {0}")]
    Select(#[from] SelectError),
    #[error("{0} is not supported")]
    NotSupported(&'static str),
}

/// Stage layouts the optimizer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// The payload itself: no engines, no cost, no Δv.
    Payload,
    /// One engine type, fitted 1..=N times, with tanks stacked underneath.
    Linear,
    /// Cross-fed boosters dropped in pairs.
    Asparagus,
}

/// A single (payload, Δv) optimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRequest {
    pub payload_t: f64,
    pub delta_v_m_s: f64,
    /// Restrict to one fuel family; `None` evaluates every supported family.
    pub family: Option<FuelFamily>,
    pub requirements: StageRequirements,
    pub objective: Objective,
}

/// One sized stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageCandidate {
    pub kind: StageKind,
    pub engine: Option<String>,
    pub fuel: Option<FuelFamily>,
    pub engine_count: u32,
    /// Total wet mass including payload.
    pub mass_t: f64,
    pub cost: f64,
    pub delta_v_m_s: f64,
    pub payload_t: f64,
    pub propellant_t: f64,
    /// The tank cost came from beyond the largest catalog tank.
    pub extrapolated: bool,
}

impl StageCandidate {
    pub fn payload(payload_t: f64) -> Self {
        Self {
            kind: StageKind::Payload,
            engine: None,
            fuel: None,
            engine_count: 0,
            mass_t: payload_t,
            cost: 0.0,
            delta_v_m_s: 0.0,
            payload_t,
            propellant_t: 0.0,
            extrapolated: false,
        }
    }

    fn from_cell(tensors: &StageTensors, grid: &SweepGrid, cell: (usize, usize), variant: usize) -> Self {
        let (i, j) = cell;
        let engine = &tensors.variants[variant];
        Self {
            kind: StageKind::Linear,
            engine: Some(engine.engine.clone()),
            fuel: Some(engine.fuel),
            engine_count: engine.count,
            mass_t: tensors.mass_t[[i, j, variant]],
            cost: tensors.cost[[i, j, variant]],
            delta_v_m_s: grid.delta_v_m_s[i],
            payload_t: grid.payload_t[j],
            propellant_t: tensors.propellant_t[[i, j, variant]],
            extrapolated: tensors.extrapolated[[i, j, variant]],
        }
    }

    pub fn label(&self) -> String {
        match &self.engine {
            Some(engine) => format!("{} x {}", self.engine_count, engine),
            None => "payload".to_string(),
        }
    }
}

/// Best variant per cell of a (Δv × payload) sweep.
#[derive(Debug, Clone)]
pub struct StageMap {
    pub grid: SweepGrid,
    pub objective: Objective,
    pub tensors: StageTensors,
    pub selection: Selection,
}

impl StageMap {
    pub fn candidate_at(&self, dv: usize, payload: usize) -> Option<StageCandidate> {
        self.selection
            .variant_at(dv, payload)
            .map(|v| StageCandidate::from_cell(&self.tensors, &self.grid, (dv, payload), v))
    }

    /// Selected cells whose tank cost was extrapolated.
    pub fn extrapolated_cells(&self) -> usize {
        self.selection
            .index
            .indexed_iter()
            .filter(|&((i, j), &v)| v >= 0 && self.tensors.extrapolated[[i, j, v as usize]])
            .count()
    }

    /// Cost/mass trade-off front; only defined for single-point maps.
    pub fn cost_front(&self) -> Result<Vec<StageCandidate>, OptimizeError> {
        let front = pareto_front(&self.tensors)?;
        Ok(sorted_by_cost(&self.tensors, front)
            .into_iter()
            .map(|v| StageCandidate::from_cell(&self.tensors, &self.grid, (0, 0), v))
            .collect())
    }
}

impl StageKind {
    pub fn optimize_point(
        self,
        context: &OptimizerContext,
        request: &PointRequest,
    ) -> Result<Vec<StageCandidate>, OptimizeError> {
        match self {
            StageKind::Payload => Ok(vec![StageCandidate::payload(request.payload_t)]),
            StageKind::Linear => solve_single_point(context, request),
            StageKind::Asparagus => Err(OptimizeError::NotSupported("asparagus staging")),
        }
    }

    pub fn optimize_plot(
        self,
        context: &OptimizerContext,
        grid: SweepGrid,
        family: Option<FuelFamily>,
        requirements: &StageRequirements,
        objective: Objective,
    ) -> Result<StageMap, OptimizeError> {
        match self {
            StageKind::Payload => Err(OptimizeError::NotSupported("mapping a payload stage")),
            StageKind::Linear => optimize_map(context, grid, family, requirements, objective),
            StageKind::Asparagus => Err(OptimizeError::NotSupported("asparagus staging")),
        }
    }
}

/// Best linear stage for one (payload, Δv) point.
///
/// The mass objective yields at most one candidate; the cost objective yields the
/// cost/mass trade-off front ordered by cost. An empty result means nothing is feasible.
pub fn solve_single_point(
    context: &OptimizerContext,
    request: &PointRequest,
) -> Result<Vec<StageCandidate>, OptimizeError> {
    let grid = SweepGrid::point(request.delta_v_m_s, request.payload_t);
    let tensors = context.evaluate(&grid, request.family, &request.requirements)?;
    let variants: Vec<usize> = match request.objective {
        Objective::Mass => select_best(&tensors, Objective::Mass)
            .variant_at(0, 0)
            .into_iter()
            .collect(),
        Objective::Cost => sorted_by_cost(&tensors, pareto_front(&tensors)?),
    };
    Ok(variants
        .into_iter()
        .map(|v| StageCandidate::from_cell(&tensors, &grid, (0, 0), v))
        .collect())
}

/// Best linear stage for every cell of `grid`.
pub fn optimize_map(
    context: &OptimizerContext,
    grid: SweepGrid,
    family: Option<FuelFamily>,
    requirements: &StageRequirements,
    objective: Objective,
) -> Result<StageMap, OptimizeError> {
    let tensors = context.evaluate(&grid, family, requirements)?;
    let selection = select_best(&tensors, objective);
    Ok(StageMap {
        grid,
        objective,
        tensors,
        selection,
    })
}

fn sorted_by_cost(tensors: &StageTensors, mut variants: Vec<usize>) -> Vec<usize> {
    variants.sort_by(|&a, &b| tensors.cost[[0, 0, a]].total_cmp(&tensors.cost[[0, 0, b]]));
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stage_physics::structure_and_propellant_mass;
    use stage_propulsion::{
        Engine, EngineCatalog, FlightCondition, FuelTable, PropellantConstants,
    };
    use stage_tanks::{PropellantLoad, TankCatalog, TankCatalogEntry, TankDominance};

    fn engine(name: &str, mass_t: f64, cost: f64, thrust_vac_kn: f64) -> Engine {
        Engine {
            name: name.into(),
            mass_t,
            thrust_asl_kn: thrust_vac_kn * 0.85,
            thrust_vac_kn,
            isp_asl_s: 265.0,
            isp_vac_s: 300.0,
            cost,
            fuel: FuelFamily::LiquidFuelOxidizer,
            radial: false,
            built_in_fuel_units: 0.0,
            empty_ratio: None,
        }
    }

    fn fuels() -> FuelTable {
        let c = PropellantConstants::new(0.86, 0.005);
        FuelTable {
            liquid_fuel: c,
            oxidizer: c,
            ..FuelTable::default()
        }
    }

    /// Dry/wet ratio 0.1; holds 1800 units at 452 funds per ton of structure.
    fn tanks() -> TankCatalog {
        TankCatalog::new().with_family(
            FuelFamily::LiquidFuelOxidizer,
            vec![TankCatalogEntry {
                name: "Ten-ton".into(),
                mass_full_t: 10.0,
                mass_empty_t: 1.0,
                cost_full: 2000.0,
                load: PropellantLoad {
                    liquid_fuel: 900.0,
                    oxidizer: 900.0,
                    xenon: 0.0,
                },
            }],
        )
    }

    fn context(engines: Vec<Engine>) -> OptimizerContext {
        OptimizerContext::new(
            EngineCatalog::new(engines),
            &tanks(),
            fuels(),
            TankDominance::default(),
        )
        .unwrap()
    }

    fn request(min_twr: f64, objective: Objective) -> PointRequest {
        PointRequest {
            payload_t: 2.0,
            delta_v_m_s: 2500.0,
            family: None,
            requirements: StageRequirements {
                max_engine_count: 1,
                condition: FlightCondition::Vacuum,
                min_twr,
            },
            objective,
        }
    }

    #[test]
    fn sizes_a_feasible_stage_and_rejects_an_impossible_twr() {
        let ctx = context(vec![engine("Mainsail", 1.0, 100.0, 200.0)]);

        let best = solve_single_point(&ctx, &request(1.2, Objective::Mass)).unwrap();
        assert_eq!(best.len(), 1);
        let stage = &best[0];
        let m100 = structure_and_propellant_mass(2500.0, 300.0, 3.0, 0.1);
        assert_relative_eq!(stage.mass_t, 3.0 + m100, max_relative = 1e-12);
        assert_relative_eq!(
            stage.cost,
            0.1 * m100 * 452.0 + 100.0 + 0.9 * m100 * 0.86,
            max_relative = 1e-9
        );
        assert!(!stage.extrapolated);
        assert_eq!(stage.label(), "1 x Mainsail");

        assert!(solve_single_point(&ctx, &request(100.0, Objective::Mass))
            .unwrap()
            .is_empty());
        let map = StageKind::Linear
            .optimize_plot(
                &ctx,
                SweepGrid::point(2500.0, 2.0),
                None,
                &request(100.0, Objective::Mass).requirements,
                Objective::Mass,
            )
            .unwrap();
        assert_eq!(map.selection.index[[0, 0]], -1);
        assert!(map.selection.value[[0, 0]].is_infinite());
    }

    #[test]
    fn low_thrust_engine_cannot_meet_modest_twr() {
        // 20 kN against an 8.25 t stage is a TWR of about 0.25.
        let ctx = context(vec![engine("Spark", 1.0, 100.0, 20.0)]);
        assert!(solve_single_point(&ctx, &request(1.2, Objective::Mass))
            .unwrap()
            .is_empty());
        assert_eq!(
            solve_single_point(&ctx, &request(0.2, Objective::Mass))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn cost_objective_returns_a_tradeoff_front() {
        let ctx = context(vec![
            engine("Light", 0.5, 900.0, 200.0),
            engine("Cheap", 2.0, 50.0, 200.0),
            engine("Worse", 2.5, 950.0, 200.0),
        ]);
        let front = solve_single_point(&ctx, &request(1.0, Objective::Cost)).unwrap();
        let names: Vec<&str> = front.iter().filter_map(|c| c.engine.as_deref()).collect();
        assert_eq!(names, vec!["Cheap", "Light"]);
        assert!(front.windows(2).all(|w| w[0].cost <= w[1].cost && w[0].mass_t >= w[1].mass_t));
        for stage in &front {
            assert!(stage.propellant_t >= 0.0);
            assert!(stage.mass_t > stage.payload_t + stage.propellant_t);
        }
    }

    #[test]
    fn multi_point_cost_fronts_are_rejected() {
        let ctx = context(vec![engine("Mainsail", 1.0, 100.0, 200.0)]);
        let map = optimize_map(
            &ctx,
            SweepGrid::sweep((1.0, 4.0), (1000.0, 2000.0), 2),
            None,
            &request(1.0, Objective::Cost).requirements,
            Objective::Cost,
        )
        .unwrap();
        assert_eq!(
            map.cost_front(),
            Err(OptimizeError::Select(SelectError::NotSupported(2, 2)))
        );
        assert_eq!(map.selection.feasible_cells(), 4);
        assert!(map.candidate_at(1, 1).is_some());
    }

    #[test]
    fn payload_stage_is_the_identity() {
        let ctx = context(vec![]);
        let stages = StageKind::Payload
            .optimize_point(&ctx, &request(1.0, Objective::Mass))
            .unwrap();
        assert_eq!(stages, vec![StageCandidate::payload(2.0)]);
        assert_eq!(stages[0].engine_count, 0);
        assert_eq!(stages[0].cost, 0.0);
        assert_eq!(stages[0].delta_v_m_s, 0.0);
    }

    #[test]
    fn asparagus_staging_is_not_supported() {
        let ctx = context(vec![engine("Mainsail", 1.0, 100.0, 200.0)]);
        assert_eq!(
            StageKind::Asparagus.optimize_point(&ctx, &request(1.0, Objective::Mass)),
            Err(OptimizeError::NotSupported("asparagus staging"))
        );
    }

    #[test]
    fn families_without_tanks_are_skipped_unless_requested() {
        let mut ion = engine("Dawn", 0.25, 8000.0, 2.0);
        ion.fuel = FuelFamily::Xenon;
        let ctx = context(vec![engine("Mainsail", 1.0, 100.0, 200.0), ion]);
        assert_eq!(ctx.skipped_families(), vec![FuelFamily::Xenon]);
        assert_eq!(
            ctx.supported_families(),
            vec![FuelFamily::LiquidFuelOxidizer]
        );

        let all = solve_single_point(&ctx, &request(1.0, Objective::Mass)).unwrap();
        assert_eq!(all.len(), 1);

        let mut xenon_only = request(0.0, Objective::Mass);
        xenon_only.family = Some(FuelFamily::Xenon);
        assert!(matches!(
            solve_single_point(&ctx, &xenon_only),
            Err(OptimizeError::Evaluate(EvaluateError::Tanks(
                TankError::UnsupportedFuelFamily(FuelFamily::Xenon)
            )))
        ));
    }
}
