//! Run sessions: catalogs and settings loaded once, then queried for maps and points.

use std::io::{self, Write};

use stage_config::{ConfigError, RunSettings, load_catalogs};
use stage_export::grid::{self, Record};
use stage_export::summary::MapSummary;
use stage_optimize::{
    FuelFamily, Objective, OptimizeError, OptimizerContext, PointRequest, StageCandidate, StageKind, StageMap, StageRequirements, SweepGrid,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}

/// Validated settings plus the optimizer context built from their catalogs.
#[derive(Debug, Clone)]
pub struct Session {
    pub settings: RunSettings,
    pub context: OptimizerContext,
    pub objective: Objective,
}

impl Session {
    pub fn load(settings: RunSettings) -> Result<Self, RunError> {
        settings.validate()?;
        let objective = settings.objective;
        let catalogs = load_catalogs(&settings.catalog)?;
        let engines = match &settings.allowed_engines {
            Some(allowed) => catalogs.engines.allowed(allowed),
            None => catalogs.engines,
        };
        let context = OptimizerContext::new(
            engines,
            &catalogs.tanks,
            catalogs.fuels,
            settings.tank_frontier.dominance(),
        )?;
        Ok(Self {
            settings,
            context,
            objective,
        })
    }

    pub fn requirements(&self) -> StageRequirements {
        let req = &self.settings.requirements;
        StageRequirements {
            max_engine_count: req.max_engine_count,
            condition: req.condition,
            min_twr: req.min_twr,
        }
    }

    pub fn grid(&self) -> SweepGrid {
        let grid = &self.settings.grid;
        SweepGrid::sweep(
            (grid.payload_t[0], grid.payload_t[1]),
            (grid.delta_v_m_s[0], grid.delta_v_m_s[1]),
            grid.span,
        )
    }

    pub fn map(&self, family: Option<FuelFamily>) -> Result<StageMap, RunError> {
        Ok(StageKind::Linear.optimize_plot(
            &self.context,
            self.grid(),
            family,
            &self.requirements(),
            self.objective,
        )?)
    }

    pub fn point(
        &self,
        kind: StageKind,
        payload_t: f64,
        delta_v_m_s: f64,
        family: Option<FuelFamily>,
    ) -> Result<Vec<StageCandidate>, RunError> {
        let request = PointRequest {
            payload_t,
            delta_v_m_s,
            family,
            requirements: self.requirements(),
            objective: self.objective,
        };
        Ok(kind.optimize_point(&self.context, &request)?)
    }

    pub fn summarize(&self, map: &StageMap) -> MapSummary {
        let (n_dv, n_pl) = map.grid.shape();
        MapSummary {
            objective: map.objective.to_string(),
            condition: self.settings.requirements.condition.to_string(),
            min_twr: self.settings.requirements.min_twr,
            max_engine_count: self.settings.requirements.max_engine_count,
            cells: n_dv * n_pl,
            feasible_cells: map.selection.feasible_cells(),
            extrapolated_cells: map.extrapolated_cells(),
            variants: map.tensors.variant_labels(),
            skipped_families: self
                .context
                .skipped_families()
                .iter()
                .map(FuelFamily::to_string)
                .collect(),
        }
    }
}

/// Write one CSV row per grid cell, Δv-major.
pub fn write_map_csv(map: &StageMap, writer: &mut dyn Write) -> io::Result<()> {
    grid::write_header(writer)?;
    let (n_dv, n_pl) = map.grid.shape();
    for i in 0..n_dv {
        for j in 0..n_pl {
            let dv = map.grid.delta_v_m_s[i];
            let payload = map.grid.payload_t[j];
            let record = match map.selection.variant_at(i, j) {
                Some(v) => {
                    let variant = &map.tensors.variants[v];
                    Record {
                        dv_m_s: dv,
                        payload_t: payload,
                        variant: v as i64,
                        engine: &variant.engine,
                        count: variant.count,
                        mass_t: map.tensors.mass_t[[i, j, v]],
                        cost: map.tensors.cost[[i, j, v]],
                        feasible: true,
                    }
                }
                None => Record::infeasible(dv, payload),
            };
            record.write_to(writer)?;
        }
    }
    Ok(())
}
