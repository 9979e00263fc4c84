//! Climate-driven power estimation.

use stratus_series::VariableKind;
use tracing::debug;

use crate::error::EnergyError;
use crate::formula::{EfficiencyRange, geothermal_power, waste_recovery, waterfall_power};
use crate::site::Site;

/// Hours in a 365-day year.
pub const HOURS_PER_YEAR: f64 = 8760.0;
/// Annual consumption of one household in MWh.
pub const HOUSEHOLD_MWH_PER_YEAR: f64 = 7.2;

/// Power potential of one climate step, in watts.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PowerEstimate {
    /// Hydro output.
    pub waterfall_w: f64,
    /// Geothermal output.
    pub geothermal_w: f64,
    /// Recovered waste heat from the two plants above.
    pub waste_recovery_w: f64,
}

impl PowerEstimate {
    /// Combine plant outputs and derive the recoverable waste heat.
    #[must_use]
    pub fn new(waterfall_w: f64, geothermal_w: f64) -> Self {
        Self {
            waterfall_w,
            geothermal_w,
            waste_recovery_w: waste_recovery(waterfall_w + geothermal_w),
        }
    }

    /// Total output including recovered heat.
    #[must_use]
    pub fn total_w(&self) -> f64 {
        self.waterfall_w + self.geothermal_w + self.waste_recovery_w
    }

    /// Energy in MWh produced over `hours` at this power.
    #[must_use]
    pub fn energy_mwh(&self, hours: f64) -> f64 {
        self.total_w() * hours / 1.0e6
    }
}

/// Number of households an annualised energy figure supplies.
#[must_use]
pub fn households_served(annual_mwh: f64) -> u64 {
    if annual_mwh.is_finite() && annual_mwh > 0.0 {
        (annual_mwh / HOUSEHOLD_MWH_PER_YEAR).floor() as u64
    } else {
        0
    }
}

/// Converts one step of climate values into a power estimate.
///
/// `variables` names the columns of `values`; implementations pick the
/// variables they depend on by name and ignore the rest.
pub trait PowerModel {
    /// Estimate the power potential of one climate step.
    ///
    /// # Errors
    ///
    /// Returns an [`EnergyError`] if the inputs are physically invalid.
    fn estimate(&self, variables: &[String], values: &[f64]) -> Result<PowerEstimate, EnergyError>;
}

/// [`PowerModel`] for a fixed [`Site`].
///
/// - Waterfall flow is the site's reference flow scaled by the ratio of the
///   step's rainfall to `reference_rainfall`. A flow variable, when present,
///   is used directly instead.
/// - Geothermal `ΔT` is the reservoir temperature minus the step's
///   temperature variable, or minus `surface_temp_c` when there is none.
///
/// # Defaults
///
/// | Parameter | Default |
/// |---|---|
/// | `turbine_efficiency` | 0.90 |
/// | `geothermal_efficiency` | 0.15 |
/// | `reference_rainfall` | none (flow is not scaled) |
/// | `surface_temp_c` | 25.0 |
#[derive(Debug, Clone, PartialEq)]
pub struct SitePowerModel {
    site: Site,
    turbine_efficiency: f64,
    geothermal_efficiency: f64,
    reference_rainfall: Option<f64>,
    surface_temp_c: f64,
}

impl SitePowerModel {
    /// Create a model for `site` with default efficiencies.
    #[must_use]
    pub fn new(site: Site) -> Self {
        Self {
            site,
            turbine_efficiency: 0.90,
            geothermal_efficiency: 0.15,
            reference_rainfall: None,
            surface_temp_c: 25.0,
        }
    }

    /// Set the turbine efficiency.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::EfficiencyOutOfRange`] outside [`EfficiencyRange::TURBINE`].
    pub fn with_turbine_efficiency(mut self, efficiency: f64) -> Result<Self, EnergyError> {
        EfficiencyRange::TURBINE.check("waterfall", efficiency)?;
        self.turbine_efficiency = efficiency;
        Ok(self)
    }

    /// Set the geothermal efficiency.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::EfficiencyOutOfRange`] outside [`EfficiencyRange::GEOTHERMAL`].
    pub fn with_geothermal_efficiency(mut self, efficiency: f64) -> Result<Self, EnergyError> {
        EfficiencyRange::GEOTHERMAL.check("geothermal", efficiency)?;
        self.geothermal_efficiency = efficiency;
        Ok(self)
    }

    /// Rainfall (mm per step) at which the waterfall runs at its reference flow.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::InvalidInput`] unless `rainfall_mm` is finite and positive.
    pub fn with_reference_rainfall(mut self, rainfall_mm: f64) -> Result<Self, EnergyError> {
        if !(rainfall_mm.is_finite() && rainfall_mm > 0.0) {
            return Err(EnergyError::InvalidInput {
                quantity: "reference_rainfall",
                value: rainfall_mm,
            });
        }
        self.reference_rainfall = Some(rainfall_mm);
        Ok(self)
    }

    /// Surface temperature used when the climate step has no temperature variable.
    #[must_use]
    pub fn with_surface_temp(mut self, surface_temp_c: f64) -> Self {
        self.surface_temp_c = surface_temp_c;
        self
    }

    /// Return the site.
    #[must_use]
    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Power at reference conditions, independent of any climate input.
    ///
    /// # Errors
    ///
    /// Returns an [`EnergyError`] if the site's physical description is invalid.
    pub fn nominal(&self) -> Result<PowerEstimate, EnergyError> {
        self.estimate_at(self.site.waterfall_flow_m3s, self.surface_temp_c)
    }

    fn estimate_at(&self, flow_m3s: f64, surface_c: f64) -> Result<PowerEstimate, EnergyError> {
        let waterfall = if self.site.waterfall_height_m > 0.0 {
            waterfall_power(self.site.waterfall_height_m, flow_m3s, self.turbine_efficiency)?
        } else {
            0.0
        };
        let geothermal = if self.site.depth_km > 0.0 {
            geothermal_power(self.site.geo_temp_c, surface_c, self.geothermal_efficiency)?
        } else {
            0.0
        };
        Ok(PowerEstimate::new(waterfall, geothermal))
    }
}

impl PowerModel for SitePowerModel {
    fn estimate(&self, variables: &[String], values: &[f64]) -> Result<PowerEstimate, EnergyError> {
        if variables.len() != values.len() {
            return Err(EnergyError::VariableCountMismatch {
                expected: variables.len(),
                got: values.len(),
            });
        }
        let flow = if let Some(i) = VariableKind::Flow.find(variables) {
            values[i]
        } else if let (Some(i), Some(reference)) =
            (VariableKind::Rainfall.find(variables), self.reference_rainfall)
        {
            self.site.waterfall_flow_m3s * values[i].max(0.0) / reference
        } else {
            self.site.waterfall_flow_m3s
        };
        let surface = VariableKind::Temperature
            .find(variables)
            .map_or(self.surface_temp_c, |i| values[i]);
        debug!(flow, surface, "site power inputs");
        self.estimate_at(flow, surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Site {
        Site {
            location_name: "Madhabkunda".into(),
            latitude: 24.64,
            longitude: 92.22,
            waterfall_height_m: 45.0,
            waterfall_flow_m3s: 8.5,
            geo_temp_c: 150.0,
            depth_km: 2.0,
        }
    }

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn nominal_matches_formulas() {
        let est = SitePowerModel::new(site()).nominal().unwrap();
        assert!((est.waterfall_w - 3_377_092.5).abs() < 1e-6);
        assert!((est.geothermal_w - 3_918_750.0).abs() < 1e-6);
        let base = est.waterfall_w + est.geothermal_w;
        assert!((est.waste_recovery_w - base * 0.24).abs() < 1e-6);
    }

    #[test]
    fn rainfall_scales_flow_linearly() {
        let m = SitePowerModel::new(site()).with_reference_rainfall(200.0).unwrap();
        let v = vars(&["rain"]);
        let full = m.estimate(&v, &[200.0]).unwrap();
        let half = m.estimate(&v, &[100.0]).unwrap();
        assert!((half.waterfall_w * 2.0 - full.waterfall_w).abs() < 1e-6);
    }

    #[test]
    fn rainfall_ignored_without_reference() {
        let m = SitePowerModel::new(site());
        let a = m.estimate(&vars(&["rain"]), &[10.0]).unwrap();
        let b = m.estimate(&vars(&["rain"]), &[400.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn warmer_air_lowers_geothermal() {
        let m = SitePowerModel::new(site());
        let v = vars(&["tem"]);
        let cool = m.estimate(&v, &[20.0]).unwrap();
        let hot = m.estimate(&v, &[30.0]).unwrap();
        assert!(hot.geothermal_w < cool.geothermal_w);
    }

    #[test]
    fn flow_variable_takes_precedence() {
        let m = SitePowerModel::new(site()).with_reference_rainfall(200.0).unwrap();
        let est = m.estimate(&vars(&["rain", "flow"]), &[400.0, 8.5]).unwrap();
        assert!((est.waterfall_w - 3_377_092.5).abs() < 1e-6);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let m = SitePowerModel::new(site());
        assert!(matches!(
            m.estimate(&vars(&["tem", "rain"]), &[1.0]),
            Err(EnergyError::VariableCountMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn site_without_plants_yields_zero() {
        let mut s = site();
        s.waterfall_height_m = 0.0;
        s.depth_km = 0.0;
        let est = SitePowerModel::new(s).nominal().unwrap();
        assert_eq!(est.total_w(), 0.0);
    }

    #[test]
    fn energy_and_households() {
        let est = PowerEstimate::new(1.0e6, 0.0);
        let annual = est.energy_mwh(HOURS_PER_YEAR);
        assert!((annual - 1.24 * 8760.0).abs() < 1e-6);
        assert_eq!(households_served(72.0), 10);
        assert_eq!(households_served(-1.0), 0);
    }

    #[test]
    fn efficiency_setters_validate() {
        assert!(SitePowerModel::new(site()).with_turbine_efficiency(0.99).is_err());
        assert!(SitePowerModel::new(site()).with_geothermal_efficiency(0.2).is_ok());
        assert!(SitePowerModel::new(site()).with_reference_rainfall(0.0).is_err());
    }
}
