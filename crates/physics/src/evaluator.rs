//! Closed-form stage sizing over (Δv × payload × engine variant) tensors.
//!
//! Solving the rocket equation for the combined structure and propellant mass
//! `m100` with a Δv-independent structural fraction `f`:
//!
//! ```text
//! Δv   = isp * g * ln(m0 / m1)
//! m0   = payload + engines + m100
//! m1   = payload + engines + f * m100
//! m100 = (payload + engines) * (1 - e) / (f * e - 1),   e = exp(Δv / (isp * g))
//! ```
//!
//! Cells that need a non-positive `m100`, miss the TWR requirement, or (for solid
//! motors) need more propellant than the motors carry are marked infeasible with
//! `+inf` mass and cost.

use ndarray::{Array3, Axis, Zip, concatenate};
use stage_core::constants::G0;
use stage_core::grid::{StageTensor, SweepGrid};
use stage_core::units::thrust_to_weight;
use stage_propulsion::{
    Engine, EngineCatalog, FlightCondition, FuelFamily, FuelTable, PropellantConstants,
};
use stage_tanks::{EfficiencyCurve, EfficiencyIndex, TankError};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvaluateError {
    #[error("tank model error: {0}")]
    Tanks(#[from] TankError),
    #[error("solid motor `{0}` has no empty ratio")]
    MissingEmptyRatio(String),
    #[error("maximum engine count must be at least 1")]
    ZeroEngineCount,
    #[error("cannot join tensors over grids {left:?} and {right:?}")]
    GridMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
}

/// Per-evaluation requirements shared by every grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageRequirements {
    pub max_engine_count: u32,
    pub condition: FlightCondition,
    pub min_twr: f64,
}

/// One engine fitted `count` times, with its physics resolved for a flight condition.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineVariant {
    pub engine: String,
    pub fuel: FuelFamily,
    pub requested_count: u32,
    /// Count after the radial pairing rule.
    pub count: u32,
    pub isp_s: f64,
    pub thrust_kn: f64,
    pub mass_t: f64,
    pub cost: f64,
    pub built_in_fuel_units: f64,
    pub structural_fraction: f64,
}

impl EngineVariant {
    pub fn new(
        engine: &Engine,
        requested_count: u32,
        condition: FlightCondition,
        structural_fraction: f64,
    ) -> Self {
        let count = engine.effective_count(requested_count);
        let n = f64::from(count);
        Self {
            engine: engine.name.clone(),
            fuel: engine.fuel,
            requested_count,
            count,
            isp_s: engine.isp(condition),
            thrust_kn: engine.thrust(condition) * n,
            mass_t: engine.mass_t * n,
            cost: engine.cost * n,
            built_in_fuel_units: engine.built_in_fuel_units * n,
            structural_fraction,
        }
    }

    pub fn label(&self) -> String {
        format!("{} x {}", self.count, self.engine)
    }
}

/// Structural fraction applied to an engine's stage: the motor's own empty ratio for
/// solids, otherwise the family's tank curve constant.
pub fn structural_fraction_for(
    engine: &Engine,
    index: &EfficiencyIndex,
) -> Result<f64, EvaluateError> {
    if engine.fuel.is_self_contained() {
        engine
            .empty_ratio
            .ok_or_else(|| EvaluateError::MissingEmptyRatio(engine.name.clone()))
    } else {
        Ok(index.curve(engine.fuel)?.structural_fraction())
    }
}

/// Combined structure + propellant mass delivering `delta_v_m_s` on top of `fixed_mass_t`.
pub fn structure_and_propellant_mass(
    delta_v_m_s: f64,
    isp_s: f64,
    fixed_mass_t: f64,
    structural_fraction: f64,
) -> f64 {
    let e = (delta_v_m_s / (isp_s * G0)).exp();
    fixed_mass_t * (1.0 - e) / (structural_fraction * e - 1.0)
}

/// Sizing of one (Δv, payload, variant) cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSizing {
    pub m100_t: f64,
    pub structure_t: f64,
    pub propellant_t: f64,
    pub propellant_units: f64,
    /// Total wet mass, `+inf` when infeasible.
    pub mass_t: f64,
    /// Purchase cost, `+inf` when infeasible.
    pub cost: f64,
    pub twr: f64,
    /// Tank cost per ton came from beyond the largest catalog tank.
    pub extrapolated: bool,
    pub feasible: bool,
}

/// Size a single cell. `curve` is `None` for solid motors, whose structure cost is
/// already part of the engine price.
pub fn size_cell(
    delta_v_m_s: f64,
    payload_t: f64,
    variant: &EngineVariant,
    curve: Option<&EfficiencyCurve>,
    fuel: PropellantConstants,
    min_twr: f64,
) -> CellSizing {
    let fixed = payload_t + variant.mass_t;
    let f = variant.structural_fraction;
    let m100 = structure_and_propellant_mass(delta_v_m_s, variant.isp_s, fixed, f);
    let structure = m100 * f;
    let propellant = m100 - structure;
    let units = fuel.units_for_mass(propellant);
    let lookup = curve.map(|c| c.lookup(units));
    let cost_per_ton = lookup.map(|l| l.cost_per_ton).unwrap_or(0.0);

    let wet_mass = fixed + m100;
    let cost = structure * cost_per_ton + variant.cost + propellant * fuel.cost_per_unit;
    let twr = thrust_to_weight(variant.thrust_kn, wet_mass);

    let sized = m100 > 0.0 && m100.is_finite();
    let lifts = twr >= min_twr;
    let fuelled = !variant.fuel.is_self_contained() || units <= variant.built_in_fuel_units;
    let feasible = sized && lifts && fuelled;

    CellSizing {
        m100_t: m100,
        structure_t: structure,
        propellant_t: propellant,
        propellant_units: units,
        mass_t: if feasible { wet_mass } else { f64::INFINITY },
        cost: if feasible { cost } else { f64::INFINITY },
        twr,
        extrapolated: feasible && lookup.is_some_and(|l| l.extrapolated),
        feasible,
    }
}

/// Feasibility-filtered tensors indexed `[dv, payload, variant]`.
#[derive(Debug, Clone)]
pub struct StageTensors {
    pub mass_t: StageTensor,
    pub cost: StageTensor,
    pub propellant_t: StageTensor,
    pub extrapolated: Array3<bool>,
    pub variants: Vec<EngineVariant>,
}

impl StageTensors {
    /// Tensors with no variants over a `(|Δv|, |payload|)` grid.
    pub fn empty(grid_shape: (usize, usize)) -> Self {
        let shape = (grid_shape.0, grid_shape.1, 0);
        Self {
            mass_t: Array3::zeros(shape),
            cost: Array3::zeros(shape),
            propellant_t: Array3::zeros(shape),
            extrapolated: Array3::from_elem(shape, false),
            variants: Vec::new(),
        }
    }

    pub fn grid_shape(&self) -> (usize, usize) {
        let (n_dv, n_pl, _) = self.mass_t.dim();
        (n_dv, n_pl)
    }

    pub fn variant_count(&self) -> usize {
        self.mass_t.len_of(Axis(2))
    }

    pub fn variant_labels(&self) -> Vec<String> {
        self.variants.iter().map(EngineVariant::label).collect()
    }

    /// Concatenate `other` after `self` along the variant axis.
    pub fn append(self, other: StageTensors) -> Result<Self, EvaluateError> {
        if self.grid_shape() != other.grid_shape() {
            return Err(EvaluateError::GridMismatch {
                left: self.grid_shape(),
                right: other.grid_shape(),
            });
        }
        let (left, right) = (self.grid_shape(), other.grid_shape());
        let mismatch = |_| EvaluateError::GridMismatch { left, right };
        let mut variants = self.variants;
        variants.extend(other.variants);
        Ok(Self {
            mass_t: concatenate(Axis(2), &[self.mass_t.view(), other.mass_t.view()])
                .map_err(mismatch)?,
            cost: concatenate(Axis(2), &[self.cost.view(), other.cost.view()])
                .map_err(mismatch)?,
            propellant_t: concatenate(
                Axis(2),
                &[self.propellant_t.view(), other.propellant_t.view()],
            )
            .map_err(mismatch)?,
            extrapolated: concatenate(
                Axis(2),
                &[self.extrapolated.view(), other.extrapolated.view()],
            )
            .map_err(mismatch)?,
            variants,
        })
    }
}

/// Evaluate every engine of `family` at counts `1..=max_engine_count`.
///
/// Variants are count-major: variant `v` is engine `v % n` fitted `v / n + 1` times,
/// where `n` is the number of engines in the family.
pub fn evaluate_stage(
    grid: &SweepGrid,
    family: FuelFamily,
    requirements: &StageRequirements,
    engines: &EngineCatalog,
    index: &EfficiencyIndex,
    fuels: &FuelTable,
) -> Result<StageTensors, EvaluateError> {
    if requirements.max_engine_count == 0 {
        return Err(EvaluateError::ZeroEngineCount);
    }
    let family_engines = engines.of_family(family);
    if family_engines.is_empty() {
        return Ok(StageTensors::empty(grid.shape()));
    }
    let curve = if family.is_self_contained() {
        None
    } else {
        Some(index.curve(family)?)
    };

    let mut variants = Vec::with_capacity(family_engines.len() * requirements.max_engine_count as usize);
    for requested in 1..=requirements.max_engine_count {
        for engine in &family_engines {
            let fraction = structural_fraction_for(engine, index)?;
            variants.push(EngineVariant::new(
                engine,
                requested,
                requirements.condition,
                fraction,
            ));
        }
    }

    let fuel = fuels.family(family);
    let (n_dv, n_pl) = grid.shape();
    let shape = (n_dv, n_pl, variants.len());
    let mut mass = Array3::zeros(shape);
    let mut cost = Array3::zeros(shape);
    let mut propellant = Array3::zeros(shape);
    let mut extrapolated = Array3::from_elem(shape, false);

    Zip::indexed(&mut mass)
        .and(&mut cost)
        .and(&mut propellant)
        .and(&mut extrapolated)
        .for_each(|(i, j, v), mass, cost, propellant, extrapolated| {
            let cell = size_cell(
                grid.delta_v_m_s[i],
                grid.payload_t[j],
                &variants[v],
                curve,
                fuel,
                requirements.min_twr,
            );
            *mass = cell.mass_t;
            *cost = cell.cost;
            *propellant = cell.propellant_t;
            *extrapolated = cell.extrapolated;
        });

    Ok(StageTensors {
        mass_t: mass,
        cost,
        propellant_t: propellant,
        extrapolated,
        variants,
    })
}

/// Evaluate every fuel family present in the engine catalog and join the results
/// along the variant axis, in [`FuelFamily::ALL`] order.
pub fn evaluate_all_families(
    grid: &SweepGrid,
    requirements: &StageRequirements,
    engines: &EngineCatalog,
    index: &EfficiencyIndex,
    fuels: &FuelTable,
) -> Result<StageTensors, EvaluateError> {
    let mut tensors = StageTensors::empty(grid.shape());
    for family in engines.families() {
        let family_tensors = evaluate_stage(grid, family, requirements, engines, index, fuels)?;
        tensors = tensors.append(family_tensors)?;
    }
    Ok(tensors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stage_core::units::rocket_delta_v;
    use stage_tanks::{PropellantLoad, TankCatalog, TankCatalogEntry, TankDominance};

    fn liquid_engine(name: &str, thrust_vac_kn: f64) -> Engine {
        Engine {
            name: name.into(),
            mass_t: 1.0,
            thrust_asl_kn: thrust_vac_kn * 0.8,
            thrust_vac_kn,
            isp_asl_s: 250.0,
            isp_vac_s: 300.0,
            cost: 100.0,
            fuel: FuelFamily::LiquidFuelOxidizer,
            radial: false,
            built_in_fuel_units: 0.0,
            empty_ratio: None,
        }
    }

    fn solid_motor(built_in_fuel_units: f64) -> Engine {
        Engine {
            name: "Thumper".into(),
            mass_t: 0.5,
            thrust_asl_kn: 250.0,
            thrust_vac_kn: 300.0,
            isp_asl_s: 175.0,
            isp_vac_s: 210.0,
            cost: 850.0,
            fuel: FuelFamily::Solid,
            radial: false,
            built_in_fuel_units,
            empty_ratio: Some(0.2),
        }
    }

    fn flat_fuels() -> FuelTable {
        let c = PropellantConstants::new(0.86, 0.005);
        FuelTable {
            liquid_fuel: c,
            oxidizer: c,
            xenon: c,
            solid_fuel: PropellantConstants::new(0.6, 0.0075),
        }
    }

    /// One-tank curve with a structural fraction of exactly 0.1.
    fn tenth_index(fuels: &FuelTable) -> EfficiencyIndex {
        let tank = TankCatalogEntry {
            name: "Test tank".into(),
            mass_full_t: 1.0,
            mass_empty_t: 0.1,
            cost_full: 200.0,
            load: PropellantLoad {
                liquid_fuel: 90.0,
                oxidizer: 90.0,
                xenon: 0.0,
            },
        };
        let catalog = TankCatalog::new().with_family(FuelFamily::LiquidFuelOxidizer, vec![tank]);
        EfficiencyIndex::build(&catalog, fuels, TankDominance::default()).unwrap()
    }

    fn vacuum(max_engine_count: u32, min_twr: f64) -> StageRequirements {
        StageRequirements {
            max_engine_count,
            condition: FlightCondition::Vacuum,
            min_twr,
        }
    }

    #[test]
    fn closed_form_inverts_the_rocket_equation() {
        let m100 = structure_and_propellant_mass(3000.0, 300.0, 2.0, 0.1);
        let achieved = rocket_delta_v(300.0, 2.0 + m100, 2.0 + 0.1 * m100);
        assert_relative_eq!(achieved, 3000.0, max_relative = 1e-6);
    }

    #[test]
    fn wet_mass_is_the_sum_of_its_parts() {
        let fuels = flat_fuels();
        let index = tenth_index(&fuels);
        let engine = liquid_engine("Reliant", 200.0);
        let variant = EngineVariant::new(&engine, 1, FlightCondition::Vacuum, 0.1);
        let curve = index.curve(FuelFamily::LiquidFuelOxidizer).ok();
        let cell = size_cell(2500.0, 2.0, &variant, curve, fuels.family(engine.fuel), 1.2);
        assert!(cell.feasible);
        assert!(cell.propellant_t >= 0.0);
        assert_relative_eq!(
            cell.mass_t,
            2.0 + engine.mass_t + cell.structure_t + cell.propellant_t,
            max_relative = 1e-12
        );
    }

    #[test]
    fn propellant_is_priced_by_mass() {
        let engine = liquid_engine("Reliant", 200.0);
        let variant = EngineVariant::new(&engine, 1, FlightCondition::Vacuum, 0.1);
        let fuel = PropellantConstants::new(0.86, 0.005);
        let cell = size_cell(2500.0, 2.0, &variant, None, fuel, 0.0);
        assert!(cell.feasible);
        assert_relative_eq!(cell.propellant_units, cell.propellant_t / 0.005, max_relative = 1e-12);
        assert_relative_eq!(cell.cost, 100.0 + cell.propellant_t * 0.86, max_relative = 1e-12);
        assert!(cell.cost < 105.0);
    }

    #[test]
    fn radial_single_requests_become_pairs() {
        let fuels = flat_fuels();
        let index = tenth_index(&fuels);
        let mut radial = liquid_engine("Radial", 200.0);
        radial.radial = true;
        let catalog = EngineCatalog::new(vec![radial]);
        let grid = SweepGrid::point(1000.0, 1.0);
        let tensors = evaluate_stage(
            &grid,
            FuelFamily::LiquidFuelOxidizer,
            &vacuum(2, 0.0),
            &catalog,
            &index,
            &fuels,
        )
        .unwrap();
        assert_eq!(tensors.variants[0].requested_count, 1);
        assert_eq!(tensors.variants[0].count, 2);
        assert_eq!(tensors.variants[0].mass_t, 2.0);
        assert_eq!(tensors.mass_t[[0, 0, 0]], tensors.mass_t[[0, 0, 1]]);
    }

    #[test]
    fn variants_are_count_major() {
        let fuels = flat_fuels();
        let index = tenth_index(&fuels);
        let catalog = EngineCatalog::new(vec![
            liquid_engine("A", 100.0),
            liquid_engine("B", 150.0),
        ]);
        let grid = SweepGrid::sweep((1.0, 5.0), (500.0, 1500.0), 3);
        let tensors = evaluate_stage(
            &grid,
            FuelFamily::LiquidFuelOxidizer,
            &vacuum(3, 0.0),
            &catalog,
            &index,
            &fuels,
        )
        .unwrap();
        assert_eq!(tensors.mass_t.dim(), (3, 3, 6));
        assert_eq!(
            tensors.variant_labels(),
            vec!["1 x A", "1 x B", "2 x A", "2 x B", "3 x A", "3 x B"]
        );
    }

    #[test]
    fn insufficient_thrust_marks_cells_infeasible() {
        let fuels = flat_fuels();
        let index = tenth_index(&fuels);
        let catalog = EngineCatalog::new(vec![liquid_engine("Weak", 20.0)]);
        let grid = SweepGrid::point(2500.0, 2.0);
        let tensors = evaluate_stage(
            &grid,
            FuelFamily::LiquidFuelOxidizer,
            &vacuum(1, 1.2),
            &catalog,
            &index,
            &fuels,
        )
        .unwrap();
        assert!(tensors.mass_t[[0, 0, 0]].is_infinite());
        assert!(tensors.cost[[0, 0, 0]].is_infinite());
    }

    #[test]
    fn unreachable_delta_v_is_infeasible() {
        // e^(Δv / (isp g)) beyond 1 / f makes m100 negative.
        let fuels = flat_fuels();
        let engine = liquid_engine("Reliant", 1000.0);
        let variant = EngineVariant::new(&engine, 1, FlightCondition::Vacuum, 0.1);
        let cell = size_cell(8000.0, 1.0, &variant, None, fuels.family(engine.fuel), 0.0);
        assert!(cell.m100_t < 0.0);
        assert!(!cell.feasible);
        assert!(cell.mass_t.is_infinite());
    }

    #[test]
    fn solid_motors_cannot_exceed_built_in_fuel() {
        let fuels = flat_fuels();
        let index = tenth_index(&fuels);
        let grid = SweepGrid::point(1500.0, 0.5);
        let requirements = vacuum(1, 1.0);

        let roomy = EngineCatalog::new(vec![solid_motor(100_000.0)]);
        let ok = evaluate_stage(&grid, FuelFamily::Solid, &requirements, &roomy, &index, &fuels)
            .unwrap();
        assert!(ok.mass_t[[0, 0, 0]].is_finite());

        let cramped = EngineCatalog::new(vec![solid_motor(10.0)]);
        let capped =
            evaluate_stage(&grid, FuelFamily::Solid, &requirements, &cramped, &index, &fuels)
                .unwrap();
        assert!(capped.mass_t[[0, 0, 0]].is_infinite());
        assert!(capped.cost[[0, 0, 0]].is_infinite());
    }

    #[test]
    fn solid_motor_without_empty_ratio_is_rejected() {
        let fuels = flat_fuels();
        let index = tenth_index(&fuels);
        let mut motor = solid_motor(500.0);
        motor.empty_ratio = None;
        let catalog = EngineCatalog::new(vec![motor]);
        let err = evaluate_stage(
            &SweepGrid::point(1000.0, 1.0),
            FuelFamily::Solid,
            &vacuum(1, 0.0),
            &catalog,
            &index,
            &fuels,
        )
        .unwrap_err();
        assert_eq!(err, EvaluateError::MissingEmptyRatio("Thumper".into()));
    }

    #[test]
    fn families_without_curves_are_unsupported() {
        let fuels = flat_fuels();
        let index = tenth_index(&fuels);
        let mut ion = liquid_engine("Dawn", 2.0);
        ion.fuel = FuelFamily::Xenon;
        let catalog = EngineCatalog::new(vec![ion]);
        let err = evaluate_stage(
            &SweepGrid::point(1000.0, 1.0),
            FuelFamily::Xenon,
            &vacuum(1, 0.0),
            &catalog,
            &index,
            &fuels,
        )
        .unwrap_err();
        assert_eq!(
            err,
            EvaluateError::Tanks(TankError::UnsupportedFuelFamily(FuelFamily::Xenon))
        );
    }

    #[test]
    fn all_families_are_joined_along_the_variant_axis() {
        let fuels = flat_fuels();
        let index = tenth_index(&fuels);
        let catalog = EngineCatalog::new(vec![
            solid_motor(100_000.0),
            liquid_engine("Reliant", 200.0),
        ]);
        let grid = SweepGrid::sweep((1.0, 2.0), (500.0, 1000.0), 2);
        let tensors =
            evaluate_all_families(&grid, &vacuum(2, 0.5), &catalog, &index, &fuels).unwrap();
        assert_eq!(tensors.mass_t.dim(), (2, 2, 4));
        assert_eq!(tensors.variants[0].fuel, FuelFamily::LiquidFuelOxidizer);
        assert_eq!(tensors.variants[3].fuel, FuelFamily::Solid);
    }

    #[test]
    fn zero_engine_count_is_rejected() {
        let fuels = flat_fuels();
        let err = evaluate_stage(
            &SweepGrid::point(1000.0, 1.0),
            FuelFamily::LiquidFuelOxidizer,
            &vacuum(0, 0.0),
            &EngineCatalog::default(),
            &tenth_index(&fuels),
            &fuels,
        )
        .unwrap_err();
        assert_eq!(err, EvaluateError::ZeroEngineCount);
    }
}
