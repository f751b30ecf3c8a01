//! Catalogs and derived tank curves, built once and shared by reference.

use stage_core::grid::SweepGrid;
use stage_physics::{StageRequirements, StageTensors, evaluate_stage};
use stage_propulsion::{EngineCatalog, FuelFamily, FuelTable};
use stage_tanks::{EfficiencyIndex, TankCatalog, TankDominance};

use crate::stage::OptimizeError;

#[derive(Debug, Clone)]
pub struct OptimizerContext {
    engines: EngineCatalog,
    index: EfficiencyIndex,
    fuels: FuelTable,
}

impl OptimizerContext {
    /// Build the efficiency index from `tanks` and bundle it with the engine catalog.
    pub fn new(
        engines: EngineCatalog,
        tanks: &TankCatalog,
        fuels: FuelTable,
        dominance: TankDominance,
    ) -> Result<Self, OptimizeError> {
        let index = EfficiencyIndex::build(tanks, &fuels, dominance)?;
        Ok(Self::from_parts(engines, index, fuels))
    }

    pub fn from_parts(engines: EngineCatalog, index: EfficiencyIndex, fuels: FuelTable) -> Self {
        Self {
            engines,
            index,
            fuels,
        }
    }

    pub fn engines(&self) -> &EngineCatalog {
        &self.engines
    }

    pub fn index(&self) -> &EfficiencyIndex {
        &self.index
    }

    pub fn fuels(&self) -> &FuelTable {
        &self.fuels
    }

    /// Engine families that can be sized: solids, and families with a tank curve.
    pub fn supported_families(&self) -> Vec<FuelFamily> {
        self.engines
            .families()
            .into_iter()
            .filter(|family| self.is_supported(*family))
            .collect()
    }

    /// Engine families present in the catalog but lacking a tank curve.
    pub fn skipped_families(&self) -> Vec<FuelFamily> {
        self.engines
            .families()
            .into_iter()
            .filter(|family| !self.is_supported(*family))
            .collect()
    }

    fn is_supported(&self, family: FuelFamily) -> bool {
        family.is_self_contained() || self.index.curve(family).is_ok()
    }

    /// Evaluate one family, or every supported family when `family` is `None`.
    ///
    /// An explicitly requested family without a tank curve is an error.
    pub fn evaluate(
        &self,
        grid: &SweepGrid,
        family: Option<FuelFamily>,
        requirements: &StageRequirements,
    ) -> Result<StageTensors, OptimizeError> {
        let families = match family {
            Some(family) => vec![family],
            None => self.supported_families(),
        };
        let mut tensors = StageTensors::empty(grid.shape());
        for family in families {
            let family_tensors = evaluate_stage(
                grid,
                family,
                requirements,
                &self.engines,
                &self.index,
                &self.fuels,
            )?;
            tensors = tensors.append(family_tensors)?;
        }
        Ok(tensors)
    }
}
