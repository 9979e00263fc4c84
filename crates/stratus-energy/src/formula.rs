//! Closed-form power formulas. All outputs are in watts.

use crate::error::EnergyError;

/// Density of water in kg/m³.
pub const WATER_DENSITY: f64 = 1000.0;
/// Gravitational acceleration in m/s².
pub const GRAVITY: f64 = 9.81;
/// Geothermal brine mass flow in kg/s.
pub const GEO_MASS_FLOW: f64 = 50.0;
/// Specific heat of water in kJ/(kg·K).
pub const WATER_SPECIFIC_HEAT: f64 = 4.18;
/// Reservoirs at or below this temperature (°C) are not worth generating from.
pub const GEO_MIN_RESERVOIR_C: f64 = 50.0;
/// Fraction of generated energy lost as recoverable heat.
pub const WASTE_HEAT_FRACTION: f64 = 0.30;
/// Efficiency of recovering that heat.
pub const RECOVERY_EFFICIENCY: f64 = 0.80;

/// Inclusive range an efficiency factor must fall within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyRange {
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

impl EfficiencyRange {
    /// Hydro turbine efficiency.
    pub const TURBINE: Self = Self { min: 0.85, max: 0.95 };
    /// Geothermal thermal-to-electric efficiency.
    pub const GEOTHERMAL: Self = Self { min: 0.10, max: 0.25 };

    pub(crate) fn check(self, plant: &'static str, efficiency: f64) -> Result<(), EnergyError> {
        if efficiency >= self.min && efficiency <= self.max {
            Ok(())
        } else {
            Err(EnergyError::EfficiencyOutOfRange {
                plant,
                efficiency,
                min: self.min,
                max: self.max,
            })
        }
    }
}

fn non_negative(quantity: &'static str, value: f64) -> Result<f64, EnergyError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EnergyError::InvalidInput { quantity, value })
    }
}

/// Hydro power of a waterfall: `ρ·g·Q·h·η`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`EnergyError::InvalidInput`] | `height_m` or `flow_m3s` is negative or non-finite |
/// | [`EnergyError::EfficiencyOutOfRange`] | `efficiency` outside [`EfficiencyRange::TURBINE`] |
pub fn waterfall_power(height_m: f64, flow_m3s: f64, efficiency: f64) -> Result<f64, EnergyError> {
    let h = non_negative("height_m", height_m)?;
    let q = non_negative("flow_m3s", flow_m3s)?;
    EfficiencyRange::TURBINE.check("waterfall", efficiency)?;
    Ok(WATER_DENSITY * GRAVITY * q * h * efficiency)
}

/// Electric power of a geothermal loop: `ṁ·Cp·ΔT·η`.
///
/// `ΔT` is `reservoir_c - surface_c`. A reservoir at or below
/// [`GEO_MIN_RESERVOIR_C`], or one no warmer than the surface, yields 0.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`EnergyError::InvalidInput`] | A temperature is non-finite |
/// | [`EnergyError::EfficiencyOutOfRange`] | `efficiency` outside [`EfficiencyRange::GEOTHERMAL`] |
pub fn geothermal_power(reservoir_c: f64, surface_c: f64, efficiency: f64) -> Result<f64, EnergyError> {
    if !reservoir_c.is_finite() {
        return Err(EnergyError::InvalidInput {
            quantity: "reservoir_c",
            value: reservoir_c,
        });
    }
    if !surface_c.is_finite() {
        return Err(EnergyError::InvalidInput {
            quantity: "surface_c",
            value: surface_c,
        });
    }
    EfficiencyRange::GEOTHERMAL.check("geothermal", efficiency)?;
    let delta_t = reservoir_c - surface_c;
    if reservoir_c <= GEO_MIN_RESERVOIR_C || delta_t <= 0.0 {
        return Ok(0.0);
    }
    // kJ/s == kW
    let thermal_kw = GEO_MASS_FLOW * WATER_SPECIFIC_HEAT * delta_t;
    Ok(thermal_kw * efficiency * 1000.0)
}

/// Recoverable waste heat from `base` power or energy: `base × 0.30 × 0.80`.
#[must_use]
pub fn waste_recovery(base: f64) -> f64 {
    base * WASTE_HEAT_FRACTION * RECOVERY_EFFICIENCY
}
