//! Catalog and run-settings loaders for the stage optimizer.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use stage_optimize::Objective;
use stage_propulsion::{Engine, EngineCatalog, FlightCondition, FuelFamily, FuelTable, PropulsionError};
use stage_tanks::{PropellantLoad, TankCatalog, TankCatalogEntry, TankDominance};
use thiserror::Error;

/// Engine record as written in catalog files.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    pub name: String,
    pub mass_t: f64,
    pub thrust_asl_kn: f64,
    pub thrust_vac_kn: f64,
    pub isp_asl_s: f64,
    pub isp_vac_s: f64,
    pub cost: f64,
    pub fuel: FuelFamily,
    #[serde(default)]
    pub radial: bool,
    #[serde(default)]
    pub built_in_fuel_units: f64,
    #[serde(default)]
    pub empty_ratio: Option<f64>,
}

impl TryFrom<EngineConfig> for Engine {
    type Error = ConfigError;

    fn try_from(config: EngineConfig) -> Result<Self, Self::Error> {
        let invalid = |reason| ConfigError::InvalidEngine {
            name: config.name.clone(),
            reason,
        };
        if config.mass_t <= 0.0 {
            return Err(invalid("mass must be positive"));
        }
        if config.isp_asl_s <= 0.0 || config.isp_vac_s <= 0.0 {
            return Err(invalid("specific impulse must be positive"));
        }
        if config.fuel.is_self_contained() {
            match config.empty_ratio {
                Some(ratio) if ratio > 0.0 && ratio < 1.0 => {}
                _ => return Err(invalid("solid motors need an empty ratio in (0, 1)")),
            }
        }

        Ok(Engine {
            name: config.name,
            mass_t: config.mass_t,
            thrust_asl_kn: config.thrust_asl_kn,
            thrust_vac_kn: config.thrust_vac_kn,
            isp_asl_s: config.isp_asl_s,
            isp_vac_s: config.isp_vac_s,
            cost: config.cost,
            fuel: config.fuel,
            radial: config.radial,
            built_in_fuel_units: config.built_in_fuel_units,
            empty_ratio: config.empty_ratio,
        })
    }
}

/// One row of the tank CSV.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TankRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Fuel")]
    pub fuel: String,
    #[serde(rename = "Mass Full")]
    pub mass_full_t: f64,
    #[serde(rename = "Mass Empty")]
    pub mass_empty_t: f64,
    #[serde(rename = "Cost Full")]
    pub cost_full: f64,
    #[serde(rename = "Liquid Fuel", default)]
    pub liquid_fuel: f64,
    #[serde(rename = "Oxidizer", default)]
    pub oxidizer: f64,
    #[serde(rename = "Xenon", default)]
    pub xenon: f64,
}

impl TankRecord {
    fn into_entry(self) -> Result<(FuelFamily, TankCatalogEntry), ConfigError> {
        let family: FuelFamily = self.fuel.parse()?;
        let entry = TankCatalogEntry {
            name: self.name,
            mass_full_t: self.mass_full_t,
            mass_empty_t: self.mass_empty_t,
            cost_full: self.cost_full,
            load: PropellantLoad {
                liquid_fuel: self.liquid_fuel,
                oxidizer: self.oxidizer,
                xenon: self.xenon,
            },
        };
        Ok((family, entry))
    }
}

/// Which tanks survive the efficiency frontier.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TankFrontier {
    /// Small tanks that are cheap per ton. A lookup lands on the smallest tank that
    /// fits, which is the priciest per ton among the survivors that fit.
    #[default]
    Smallest,
    /// Large tanks that are cheap per ton. A lookup lands on the cheapest tank
    /// per ton that fits.
    Cheapest,
    /// Large tanks that are pricey per ton, for pessimistic estimates.
    Priciest,
}

impl TankFrontier {
    pub fn dominance(self) -> TankDominance {
        match self {
            TankFrontier::Smallest => TankDominance::default(),
            TankFrontier::Cheapest => TankDominance::CHEAPEST_FIT,
            TankFrontier::Priciest => TankDominance::BOTH_MAXIMIZED,
        }
    }
}

/// Catalog file locations.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPaths {
    pub engines: PathBuf,
    /// Stock propellant constants are used when absent.
    pub fuels: Option<PathBuf>,
    pub tanks: PathBuf,
}

impl Default for CatalogPaths {
    fn default() -> Self {
        Self {
            engines: PathBuf::from("configs/engines.yaml"),
            fuels: Some(PathBuf::from("configs/fuels.yaml")),
            tanks: PathBuf::from("configs/tanks.csv"),
        }
    }
}

/// Catalog keys as written in a settings file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CatalogFile {
    engines: Option<PathBuf>,
    fuels: Option<PathBuf>,
    tanks: Option<PathBuf>,
}

impl CatalogFile {
    /// Paths named in the file resolve against `base`; omitted keys keep the defaults.
    fn resolve(self, base: Option<&Path>) -> CatalogPaths {
        let rebase = |path: PathBuf| match base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        };
        let defaults = CatalogPaths::default();
        CatalogPaths {
            engines: self.engines.map(rebase).unwrap_or(defaults.engines),
            fuels: self.fuels.map(rebase).or(defaults.fuels),
            tanks: self.tanks.map(rebase).unwrap_or(defaults.tanks),
        }
    }
}

/// Sweep bounds: linear Δv axis, logarithmic payload axis.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct GridSettings {
    pub payload_t: [f64; 2],
    pub delta_v_m_s: [f64; 2],
    pub span: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            payload_t: [0.1, 300.0],
            delta_v_m_s: [100.0, 20_000.0],
            span: 200,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RequirementSettings {
    pub max_engine_count: u32,
    pub condition: FlightCondition,
    pub min_twr: f64,
}

impl Default for RequirementSettings {
    fn default() -> Self {
        Self {
            max_engine_count: 3,
            condition: FlightCondition::Vacuum,
            min_twr: 1.5,
        }
    }
}

/// Everything a map or point run needs besides the catalogs themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub catalog: CatalogPaths,
    pub grid: GridSettings,
    pub requirements: RequirementSettings,
    pub objective: Objective,
    pub tank_frontier: TankFrontier,
    /// Restrict the engine catalog to these names.
    pub allowed_engines: Option<Vec<String>>,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettingsFile::default().resolve(None)
    }
}

/// Run settings as written in TOML, before catalog paths are resolved.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RunSettingsFile {
    catalog: CatalogFile,
    grid: GridSettings,
    requirements: RequirementSettings,
    objective: Objective,
    tank_frontier: TankFrontier,
    allowed_engines: Option<Vec<String>>,
}

impl RunSettingsFile {
    fn resolve(self, base: Option<&Path>) -> RunSettings {
        RunSettings {
            catalog: self.catalog.resolve(base),
            grid: self.grid,
            requirements: self.requirements,
            objective: self.objective,
            tank_frontier: self.tank_frontier,
            allowed_engines: self.allowed_engines,
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [pl_lo, pl_hi] = self.grid.payload_t;
        let [dv_lo, dv_hi] = self.grid.delta_v_m_s;
        if self.grid.span == 0 {
            return Err(ConfigError::InvalidSettings("grid span must be at least 1".into()));
        }
        if !(pl_lo > 0.0 && pl_hi >= pl_lo) {
            return Err(ConfigError::InvalidSettings(format!(
                "payload bounds [{pl_lo}, {pl_hi}] must be positive and ascending"
            )));
        }
        if !(dv_lo >= 0.0 && dv_hi >= dv_lo) {
            return Err(ConfigError::InvalidSettings(format!(
                "delta-v bounds [{dv_lo}, {dv_hi}] must be non-negative and ascending"
            )));
        }
        if self.requirements.max_engine_count == 0 {
            return Err(ConfigError::InvalidSettings(
                "max_engine_count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Loaded engine, tank, and propellant catalogs.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub engines: EngineCatalog,
    pub tanks: TankCatalog,
    pub fuels: FuelTable,
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Propulsion(#[from] PropulsionError),
    #[error("engine `{name}` is invalid: {reason}")]
    InvalidEngine { name: String, reason: &'static str },
    #[error("invalid run settings: {0}")]
    InvalidSettings(String),
}

/// Load engine records from a YAML file, a single TOML file, or a directory of TOML files.
pub fn load_engine_configs<P: AsRef<Path>>(path: P) -> Result<Vec<EngineConfig>, ConfigError> {
    load_records(path)
}

pub fn load_engines<P: AsRef<Path>>(path: P) -> Result<EngineCatalog, ConfigError> {
    let engines = load_engine_configs(path)?
        .into_iter()
        .map(Engine::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(EngineCatalog::new(engines))
}

/// Load propellant constants from YAML or TOML.
pub fn load_fuels<P: AsRef<Path>>(path: P) -> Result<FuelTable, ConfigError> {
    let path = path.as_ref();
    if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

pub fn load_tanks<P: AsRef<Path>>(path: P) -> Result<TankCatalog, ConfigError> {
    read_tanks(File::open(path)?)
}

/// Parse tank rows, grouping them by their `Fuel` column.
pub fn read_tanks<R: Read>(reader: R) -> Result<TankCatalog, ConfigError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut catalog = TankCatalog::new();
    for record in csv_reader.deserialize::<TankRecord>() {
        let (family, entry) = record?.into_entry()?;
        catalog.push(family, entry);
    }
    Ok(catalog)
}

/// Load run settings from TOML. Relative catalog paths written in the file resolve
/// against the file's directory; catalogs the file omits keep their default paths.
pub fn load_run_settings<P: AsRef<Path>>(path: P) -> Result<RunSettings, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let file: RunSettingsFile = toml::from_str(&contents)?;
    let settings = file.resolve(path.parent());
    settings.validate()?;
    Ok(settings)
}

pub fn load_catalogs(paths: &CatalogPaths) -> Result<Catalogs, ConfigError> {
    let fuels = match &paths.fuels {
        Some(path) => load_fuels(path)?,
        None => FuelTable::default(),
    };
    Ok(Catalogs {
        engines: load_engines(&paths.engines)?,
        tanks: load_tanks(&paths.tanks)?,
        fuels,
    })
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut records = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    entries.sort();
    for path in entries {
        let contents = std::fs::read_to_string(&path)?;
        let record: T = toml::from_str(&contents)?;
        records.push(record);
    }
    Ok(records)
}
