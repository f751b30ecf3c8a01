//! Tank efficiency frontiers per fuel family.
//!
//! Each family's tank catalog is reduced to the Pareto-efficient tanks over
//! (capacity, cost per ton of dry structure), sorted by capacity, and queried with
//! a clamped "smallest tank that fits" lookup.
//!
//! Two simplifications apply to every curve:
//! - one structural fraction, the minimum dry/wet ratio across the frontier, is
//!   used for every capacity instead of the selected tank's own ratio;
//! - demands beyond the largest tank reuse the largest tank's cost per ton and are
//!   flagged as extrapolated.

use std::collections::BTreeMap;

use ndarray::Array2;
use stage_pareto::{ParetoError, Sense, frontier};
use stage_propulsion::{FuelFamily, FuelTable, Propellant};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TankError {
    #[error("no tank efficiency curve for fuel family {0}")]
    UnsupportedFuelFamily(FuelFamily),
    #[error("tank catalog for {0} is empty")]
    EmptyCatalog(FuelFamily),
    #[error("tank `{name}` has invalid masses (full {mass_full_t} t, empty {mass_empty_t} t)")]
    InvalidTank {
        name: String,
        mass_full_t: f64,
        mass_empty_t: f64,
    },
    #[error("dominance filter failed: {0}")]
    Pareto(#[from] ParetoError),
}

/// Propellant units a tank holds when full.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PropellantLoad {
    pub liquid_fuel: f64,
    pub oxidizer: f64,
    pub xenon: f64,
}

impl PropellantLoad {
    pub fn total_units(&self) -> f64 {
        self.liquid_fuel + self.oxidizer + self.xenon
    }

    /// Purchase cost of the propellant alone.
    pub fn cost(&self, fuels: &FuelTable) -> f64 {
        self.liquid_fuel * fuels.propellant(Propellant::LiquidFuel).cost_per_unit
            + self.oxidizer * fuels.propellant(Propellant::Oxidizer).cost_per_unit
            + self.xenon * fuels.propellant(Propellant::Xenon).cost_per_unit
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TankCatalogEntry {
    pub name: String,
    pub mass_full_t: f64,
    pub mass_empty_t: f64,
    pub cost_full: f64,
    pub load: PropellantLoad,
}

impl TankCatalogEntry {
    pub fn capacity_units(&self) -> f64 {
        self.load.total_units()
    }

    /// Structure cost per ton of dry mass, excluding the propellant it ships with.
    pub fn cost_per_ton_structure(&self, fuels: &FuelTable) -> f64 {
        (self.cost_full - self.load.cost(fuels)) / self.mass_empty_t
    }

    /// Dry mass over wet mass.
    pub fn structural_fraction(&self) -> f64 {
        self.mass_empty_t / self.mass_full_t
    }

    fn validate(&self) -> Result<(), TankError> {
        if self.mass_empty_t > 0.0 && self.mass_full_t > self.mass_empty_t {
            Ok(())
        } else {
            Err(TankError::InvalidTank {
                name: self.name.clone(),
                mass_full_t: self.mass_full_t,
                mass_empty_t: self.mass_empty_t,
            })
        }
    }
}

/// Tank entries grouped by the fuel family they serve.
#[derive(Debug, Clone, Default)]
pub struct TankCatalog {
    families: BTreeMap<FuelFamily, Vec<TankCatalogEntry>>,
}

impl TankCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, family: FuelFamily, entry: TankCatalogEntry) {
        self.families.entry(family).or_default().push(entry);
    }

    pub fn with_family(mut self, family: FuelFamily, entries: Vec<TankCatalogEntry>) -> Self {
        self.families.entry(family).or_default().extend(entries);
        self
    }

    pub fn entries(&self, family: FuelFamily) -> &[TankCatalogEntry] {
        self.families.get(&family).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn families(&self) -> impl Iterator<Item = FuelFamily> + '_ {
        self.families.keys().copied()
    }
}

/// Which direction counts as better on each frontier axis.
///
/// The default minimizes both axes: a tank survives unless another tank is no
/// larger and no more expensive per ton of structure. Sorted by capacity, the
/// default frontier gets cheaper per ton as tanks grow, so a lookup returns the
/// priciest frontier tank that still fits the demand.
///
/// [`TankDominance::CHEAPEST_FIT`] maximizes capacity and minimizes cost per ton.
/// Its frontier gets pricier as tanks grow, so a lookup returns the cheapest tank
/// in the catalog that fits. [`TankDominance::BOTH_MAXIMIZED`] keeps the priciest
/// tank of each size class, which gives a pessimistic cost estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TankDominance {
    pub capacity: Sense,
    pub cost_per_ton: Sense,
}

impl TankDominance {
    pub const CHEAPEST_FIT: TankDominance = TankDominance {
        capacity: Sense::Maximize,
        cost_per_ton: Sense::Minimize,
    };

    pub const BOTH_MAXIMIZED: TankDominance = TankDominance {
        capacity: Sense::Maximize,
        cost_per_ton: Sense::Maximize,
    };

    fn senses(self) -> [Sense; 2] {
        [self.capacity, self.cost_per_ton]
    }
}

impl Default for TankDominance {
    fn default() -> Self {
        Self {
            capacity: Sense::Minimize,
            cost_per_ton: Sense::Minimize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub capacity_units: f64,
    pub cost_per_ton: f64,
}

/// Result of a cost-per-ton query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostLookup {
    pub cost_per_ton: f64,
    /// The demand exceeded the largest tank and the last entry was reused.
    pub extrapolated: bool,
}

impl CostLookup {
    const ZERO: CostLookup = CostLookup {
        cost_per_ton: 0.0,
        extrapolated: false,
    };
}

/// Capacity-ascending cost frontier for one fuel family.
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyCurve {
    family: FuelFamily,
    points: Vec<CurvePoint>,
    structural_fraction: f64,
}

impl EfficiencyCurve {
    pub fn build(
        family: FuelFamily,
        entries: &[TankCatalogEntry],
        fuels: &FuelTable,
        dominance: TankDominance,
    ) -> Result<Self, TankError> {
        if entries.is_empty() {
            return Err(TankError::EmptyCatalog(family));
        }
        for entry in entries {
            entry.validate()?;
        }

        let objectives = Array2::from_shape_fn((entries.len(), 2), |(i, axis)| match axis {
            0 => entries[i].capacity_units(),
            _ => entries[i].cost_per_ton_structure(fuels),
        });
        let survivors = frontier(objectives.view(), &dominance.senses())?;

        let mut points: Vec<CurvePoint> = survivors
            .iter()
            .map(|&i| CurvePoint {
                capacity_units: objectives[[i, 0]],
                cost_per_ton: objectives[[i, 1]],
            })
            .collect();
        points.sort_by(|a, b| a.capacity_units.total_cmp(&b.capacity_units));

        let structural_fraction = survivors
            .iter()
            .map(|&i| entries[i].structural_fraction())
            .fold(f64::INFINITY, f64::min);

        Ok(Self {
            family,
            points,
            structural_fraction,
        })
    }

    pub fn family(&self) -> FuelFamily {
        self.family
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn structural_fraction(&self) -> f64 {
        self.structural_fraction
    }

    pub fn max_capacity_units(&self) -> f64 {
        self.points.last().map(|p| p.capacity_units).unwrap_or(0.0)
    }

    /// Cost per ton of the smallest frontier tank holding `required_units`.
    pub fn lookup(&self, required_units: f64) -> CostLookup {
        let idx = self
            .points
            .partition_point(|p| p.capacity_units < required_units);
        match self.points.get(idx) {
            Some(point) => CostLookup {
                cost_per_ton: point.cost_per_ton,
                extrapolated: false,
            },
            None => CostLookup {
                cost_per_ton: self.points.last().map(|p| p.cost_per_ton).unwrap_or(0.0),
                extrapolated: true,
            },
        }
    }
}

/// Enum-keyed collection of efficiency curves, built once per process.
#[derive(Debug, Clone, Default)]
pub struct EfficiencyIndex {
    curves: BTreeMap<FuelFamily, EfficiencyCurve>,
}

impl EfficiencyIndex {
    /// Build a curve for every tank-fed family present in `catalog`.
    ///
    /// Solid motors bypass tanks, so solid entries are ignored.
    pub fn build(
        catalog: &TankCatalog,
        fuels: &FuelTable,
        dominance: TankDominance,
    ) -> Result<Self, TankError> {
        let mut curves = BTreeMap::new();
        for family in catalog.families() {
            if family.is_self_contained() {
                continue;
            }
            let curve = EfficiencyCurve::build(family, catalog.entries(family), fuels, dominance)?;
            curves.insert(family, curve);
        }
        Ok(Self { curves })
    }

    pub fn curve(&self, family: FuelFamily) -> Result<&EfficiencyCurve, TankError> {
        self.curves
            .get(&family)
            .ok_or(TankError::UnsupportedFuelFamily(family))
    }

    /// Structure cost per ton for `required_units` of a family's propellant.
    ///
    /// Solid motors embed their structure cost in the engine price, so the answer is zero.
    pub fn cost_per_ton(
        &self,
        family: FuelFamily,
        required_units: f64,
    ) -> Result<CostLookup, TankError> {
        if family.is_self_contained() {
            return Ok(CostLookup::ZERO);
        }
        Ok(self.curve(family)?.lookup(required_units))
    }

    pub fn families(&self) -> impl Iterator<Item = FuelFamily> + '_ {
        self.curves.keys().copied()
    }
}
