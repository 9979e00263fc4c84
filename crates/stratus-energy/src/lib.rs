//! Renewable power potential from climate conditions.
//!
//! Stateless formulas for waterfall hydro, geothermal and waste-heat
//! recovery, plus the [`PowerModel`] seam the scenario projector calls once
//! per projected step.

mod error;
mod formula;
mod power;
mod report;
mod site;

pub use error::EnergyError;
pub use formula::{
    EfficiencyRange, GEO_MASS_FLOW, GEO_MIN_RESERVOIR_C, GRAVITY, RECOVERY_EFFICIENCY,
    WASTE_HEAT_FRACTION, WATER_DENSITY, WATER_SPECIFIC_HEAT, geothermal_power, waste_recovery,
    waterfall_power,
};
pub use power::{
    HOURS_PER_YEAR, HOUSEHOLD_MWH_PER_YEAR, PowerEstimate, PowerModel, SitePowerModel,
    households_served,
};
pub use report::{PipeMaterial, SiteReport};
pub use site::Site;
