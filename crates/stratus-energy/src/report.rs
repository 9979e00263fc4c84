//! Nominal annual assessment of a site.

use tracing::debug;

use crate::error::EnergyError;
use crate::power::{HOURS_PER_YEAR, PowerEstimate, SitePowerModel, households_served};

/// Well casing material for a geothermal reservoir temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeMaterial {
    /// Below 300 °C.
    StainlessSteel,
    /// 300 °C up to 600 °C.
    InconelAlloy,
    /// 600 °C and above.
    CeramicComposite,
}

impl PipeMaterial {
    /// Pick the casing for `reservoir_c`.
    #[must_use]
    pub fn for_reservoir(reservoir_c: f64) -> Self {
        if reservoir_c < 300.0 {
            Self::StainlessSteel
        } else if reservoir_c < 600.0 {
            Self::InconelAlloy
        } else {
            Self::CeramicComposite
        }
    }
}

/// Steady-state output of a site at reference conditions over one year.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SiteReport {
    /// Site name.
    pub location_name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Power at reference flow and surface temperature.
    pub power: PowerEstimate,
    /// Energy over a year of continuous operation, in MWh.
    pub annual_energy_mwh: f64,
    /// Households the annual energy supplies.
    pub households_served: u64,
    /// Casing material, when the site has a usable geothermal well.
    pub pipe_material: Option<PipeMaterial>,
}

impl SiteReport {
    /// Assess the site behind `model` at its nominal conditions.
    ///
    /// # Errors
    ///
    /// Returns an [`EnergyError`] if the site's description is physically invalid.
    pub fn assess(model: &SitePowerModel) -> Result<Self, EnergyError> {
        let site = model.site();
        let power = model.nominal()?;
        let annual_energy_mwh = power.energy_mwh(HOURS_PER_YEAR);
        debug!(site = %site.location_name, annual_energy_mwh, "site assessed");
        Ok(Self {
            location_name: site.location_name.clone(),
            latitude: site.latitude,
            longitude: site.longitude,
            power,
            annual_energy_mwh,
            households_served: households_served(annual_energy_mwh),
            pipe_material: site
                .has_geothermal()
                .then(|| PipeMaterial::for_reservoir(site.geo_temp_c)),
        })
    }
}
