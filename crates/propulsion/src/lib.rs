//! Engine, propellant, and fuel-family descriptors shared across the optimizer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropulsionError {
    #[error("invalid flight condition `{0}` (expected `asl` or `vac`)")]
    InvalidFlightCondition(String),
    #[error("unknown fuel family `{0}`")]
    UnknownFuelFamily(String),
}

/// Propellant class an engine burns; each family has its own tank efficiency model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FuelFamily {
    #[serde(rename = "LF")]
    LiquidFuel,
    #[serde(rename = "LFOX")]
    LiquidFuelOxidizer,
    #[serde(rename = "Xenon")]
    Xenon,
    #[serde(rename = "SolidFuel")]
    Solid,
}

impl FuelFamily {
    pub const ALL: [FuelFamily; 4] = [
        FuelFamily::LiquidFuel,
        FuelFamily::LiquidFuelOxidizer,
        FuelFamily::Xenon,
        FuelFamily::Solid,
    ];

    /// Short tag used in catalogs and exports.
    pub fn tag(self) -> &'static str {
        match self {
            FuelFamily::LiquidFuel => "LF",
            FuelFamily::LiquidFuelOxidizer => "LFOX",
            FuelFamily::Xenon => "Xenon",
            FuelFamily::Solid => "SolidFuel",
        }
    }

    /// Solid motors carry their propellant and structure in the engine itself.
    pub fn is_self_contained(self) -> bool {
        matches!(self, FuelFamily::Solid)
    }
}

impl fmt::Display for FuelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FuelFamily {
    type Err = PropulsionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lf" | "liquidfuel" | "liquid_fuel" => Ok(FuelFamily::LiquidFuel),
            "lfox" | "lfo" | "liquidfueloxidizer" | "liquid_fuel_oxidizer" => {
                Ok(FuelFamily::LiquidFuelOxidizer)
            }
            "xenon" | "xenongas" => Ok(FuelFamily::Xenon),
            "solid" | "solidfuel" | "solid_fuel" => Ok(FuelFamily::Solid),
            _ => Err(PropulsionError::UnknownFuelFamily(s.to_string())),
        }
    }
}

/// Storable resource held by tanks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Propellant {
    LiquidFuel,
    Oxidizer,
    Xenon,
    SolidFuel,
}

/// Purchase cost and mass of one unit of propellant.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PropellantConstants {
    /// Funds per unit.
    pub cost_per_unit: f64,
    /// Tons per unit.
    pub density_t_per_unit: f64,
}

impl PropellantConstants {
    pub const fn new(cost_per_unit: f64, density_t_per_unit: f64) -> Self {
        Self {
            cost_per_unit,
            density_t_per_unit,
        }
    }

    /// Units held by `mass_t` tons.
    pub fn units_for_mass(&self, mass_t: f64) -> f64 {
        mass_t / self.density_t_per_unit
    }
}

/// Liquid fuel to oxidizer unit ratio of stock bipropellant tanks.
const LFOX_MIX: (f64, f64) = (0.9, 1.1);

/// Enum-keyed cost and density table for every propellant.
///
/// Missing entries fall back to the stock values when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FuelTable {
    pub liquid_fuel: PropellantConstants,
    pub oxidizer: PropellantConstants,
    pub xenon: PropellantConstants,
    pub solid_fuel: PropellantConstants,
}

impl Default for FuelTable {
    fn default() -> Self {
        Self {
            liquid_fuel: PropellantConstants::new(0.8, 5.0 / 1000.0),
            oxidizer: PropellantConstants::new(0.18, 5.0 / 1000.0),
            xenon: PropellantConstants::new(4.0, 0.1 / 1000.0),
            solid_fuel: PropellantConstants::new(0.6, 7.5 / 1000.0),
        }
    }
}

impl FuelTable {
    pub fn propellant(&self, propellant: Propellant) -> PropellantConstants {
        match propellant {
            Propellant::LiquidFuel => self.liquid_fuel,
            Propellant::Oxidizer => self.oxidizer,
            Propellant::Xenon => self.xenon,
            Propellant::SolidFuel => self.solid_fuel,
        }
    }

    /// Per-unit constants for a fuel family; bipropellant values average the LF/OX mix.
    pub fn family(&self, family: FuelFamily) -> PropellantConstants {
        match family {
            FuelFamily::LiquidFuel => self.liquid_fuel,
            FuelFamily::Xenon => self.xenon,
            FuelFamily::Solid => self.solid_fuel,
            FuelFamily::LiquidFuelOxidizer => {
                let (lf, ox) = LFOX_MIX;
                PropellantConstants::new(
                    (lf * self.liquid_fuel.cost_per_unit + ox * self.oxidizer.cost_per_unit) / 2.0,
                    (lf * self.liquid_fuel.density_t_per_unit
                        + ox * self.oxidizer.density_t_per_unit)
                        / 2.0,
                )
            }
        }
    }
}

/// Atmospheric condition selecting which ISP/thrust pair applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightCondition {
    #[serde(rename = "asl")]
    SeaLevel,
    #[serde(rename = "vac")]
    Vacuum,
}

impl fmt::Display for FlightCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightCondition::SeaLevel => f.write_str("asl"),
            FlightCondition::Vacuum => f.write_str("vac"),
        }
    }
}

impl FromStr for FlightCondition {
    type Err = PropulsionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asl" | "sea-level" | "sea_level" => Ok(FlightCondition::SeaLevel),
            "vac" | "vacuum" => Ok(FlightCondition::Vacuum),
            _ => Err(PropulsionError::InvalidFlightCondition(s.to_string())),
        }
    }
}

/// Catalog engine. Masses in tons, thrust in kN, ISP in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    pub name: String,
    pub mass_t: f64,
    pub thrust_asl_kn: f64,
    pub thrust_vac_kn: f64,
    pub isp_asl_s: f64,
    pub isp_vac_s: f64,
    pub cost: f64,
    pub fuel: FuelFamily,
    /// Radial boosters are always mounted in symmetric pairs.
    pub radial: bool,
    /// Propellant units carried by a self-contained motor.
    pub built_in_fuel_units: f64,
    /// Dry/wet mass ratio of a solid motor.
    pub empty_ratio: Option<f64>,
}

impl Engine {
    pub fn isp(&self, condition: FlightCondition) -> f64 {
        match condition {
            FlightCondition::SeaLevel => self.isp_asl_s,
            FlightCondition::Vacuum => self.isp_vac_s,
        }
    }

    pub fn thrust(&self, condition: FlightCondition) -> f64 {
        match condition {
            FlightCondition::SeaLevel => self.thrust_asl_kn,
            FlightCondition::Vacuum => self.thrust_vac_kn,
        }
    }

    /// Engine count actually fitted when `requested` copies are asked for.
    pub fn effective_count(&self, requested: u32) -> u32 {
        if self.radial && requested == 1 {
            2
        } else {
            requested
        }
    }
}

/// Read-only engine catalog shared by every evaluation.
#[derive(Debug, Clone, Default)]
pub struct EngineCatalog {
    engines: Vec<Engine>,
}

impl EngineCatalog {
    pub fn new(engines: Vec<Engine>) -> Self {
        Self { engines }
    }

    /// Keep only the engines whose names appear in `allowed` (case-insensitive).
    pub fn allowed<S: AsRef<str>>(self, allowed: &[S]) -> Self {
        let engines = self
            .engines
            .into_iter()
            .filter(|engine| {
                allowed
                    .iter()
                    .any(|name| name.as_ref().eq_ignore_ascii_case(&engine.name))
            })
            .collect();
        Self { engines }
    }

    pub fn engines(&self) -> &[Engine] {
        &self.engines
    }

    pub fn get(&self, name: &str) -> Option<&Engine> {
        self.engines
            .iter()
            .find(|engine| engine.name.eq_ignore_ascii_case(name))
    }

    /// Engines of one fuel family, in catalog order.
    pub fn of_family(&self, family: FuelFamily) -> Vec<&Engine> {
        self.engines.iter().filter(|e| e.fuel == family).collect()
    }

    /// Fuel families present in the catalog, in [`FuelFamily::ALL`] order.
    pub fn families(&self) -> Vec<FuelFamily> {
        FuelFamily::ALL
            .into_iter()
            .filter(|family| self.engines.iter().any(|e| e.fuel == *family))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booster() -> Engine {
        Engine {
            name: "Hammer".into(),
            mass_t: 0.75,
            thrust_asl_kn: 197.9,
            thrust_vac_kn: 227.0,
            isp_asl_s: 170.0,
            isp_vac_s: 195.0,
            cost: 400.0,
            fuel: FuelFamily::Solid,
            radial: true,
            built_in_fuel_units: 375.0,
            empty_ratio: Some(0.2),
        }
    }

    #[test]
    fn radial_engines_pair_up() {
        let engine = booster();
        assert_eq!(engine.effective_count(1), 2);
        assert_eq!(engine.effective_count(3), 3);
        let inline = Engine {
            radial: false,
            ..engine
        };
        assert_eq!(inline.effective_count(1), 1);
    }

    #[test]
    fn flight_condition_parsing() {
        assert_eq!("asl".parse::<FlightCondition>(), Ok(FlightCondition::SeaLevel));
        assert_eq!("VAC".parse::<FlightCondition>(), Ok(FlightCondition::Vacuum));
        assert_eq!(
            "orbit".parse::<FlightCondition>(),
            Err(PropulsionError::InvalidFlightCondition("orbit".into()))
        );
    }

    #[test]
    fn bipropellant_constants_average_the_mix() {
        let table = FuelTable::default();
        let lfox = table.family(FuelFamily::LiquidFuelOxidizer);
        assert!((lfox.cost_per_unit - (0.9 * 0.8 + 1.1 * 0.18) / 2.0).abs() < 1e-12);
        assert!((lfox.density_t_per_unit - 0.005).abs() < 1e-12);
    }

    #[test]
    fn catalog_filters_by_family_and_allow_list() {
        let mut liquid = booster();
        liquid.name = "Terrier".into();
        liquid.fuel = FuelFamily::LiquidFuelOxidizer;
        let catalog = EngineCatalog::new(vec![booster(), liquid]);
        assert_eq!(
            catalog.families(),
            vec![FuelFamily::LiquidFuelOxidizer, FuelFamily::Solid]
        );
        assert_eq!(catalog.of_family(FuelFamily::Solid).len(), 1);
        let filtered = catalog.allowed(&["terrier"]);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.get("TERRIER").is_some());
    }
}
