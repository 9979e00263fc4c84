//! Projection output records and their summary.

use chrono::NaiveDate;
use stratus_energy::{HOURS_PER_YEAR, PowerEstimate, households_served};
use stratus_series::Granularity;

use crate::scenario::AdjustmentTarget;

/// Two-sided band around the projected climate of one step.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfidenceBand {
    /// Lower bound per variable.
    pub lower: Vec<f64>,
    /// Upper bound per variable.
    pub upper: Vec<f64>,
}

/// One projected step.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ForecastRecord {
    /// Zero-based step index.
    pub step: usize,
    /// Step timestamp.
    pub timestamp: NaiveDate,
    /// Timestamp formatted at the series granularity.
    pub label: String,
    /// Scenario-adjusted climate values, one per variable.
    pub climate: Vec<f64>,
    /// Power potential under `climate`.
    pub power: PowerEstimate,
    /// Energy over the step in MWh.
    pub energy_mwh: f64,
    /// Present when the model carries residual variance.
    pub interval: Option<ConfidenceBand>,
}

/// Aggregate figures over a projection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ForecastSummary {
    /// Number of projected steps.
    pub steps: usize,
    /// Sum of per-step energy in MWh.
    pub total_energy_mwh: f64,
    /// Mean total power in W.
    pub mean_power_w: f64,
    /// Highest total power in W.
    pub peak_power_w: f64,
    /// Total energy scaled to one year.
    pub annual_energy_mwh: f64,
    /// Households the annual energy supplies.
    pub households_served: u64,
}

impl ForecastSummary {
    fn from_records(records: &[ForecastRecord], hours_per_step: f64) -> Self {
        let steps = records.len();
        let total_energy_mwh: f64 = records.iter().map(|r| r.energy_mwh).sum();
        let (sum_power, peak_power_w) = records.iter().fold((0.0, 0.0_f64), |(sum, peak), r| {
            let p = r.power.total_w();
            (sum + p, peak.max(p))
        });
        let mean_power_w = if steps == 0 { 0.0 } else { sum_power / steps as f64 };
        let covered_hours = steps as f64 * hours_per_step;
        let annual_energy_mwh = if covered_hours > 0.0 {
            total_energy_mwh * HOURS_PER_YEAR / covered_hours
        } else {
            0.0
        };
        Self {
            steps,
            total_energy_mwh,
            mean_power_w,
            peak_power_w,
            annual_energy_mwh,
            households_served: households_served(annual_energy_mwh),
        }
    }
}

/// A complete scenario projection. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ForecastResult {
    /// Scenario name.
    pub scenario: String,
    /// Side the scenario adjusted.
    pub target: AdjustmentTarget,
    /// Variable names, in `climate` column order.
    pub variables: Vec<String>,
    /// Step granularity.
    pub granularity: Granularity,
    /// Projected steps, in order.
    pub records: Vec<ForecastRecord>,
    /// Aggregates over `records`.
    pub summary: ForecastSummary,
}

impl ForecastResult {
    /// Assemble a result and compute its summary.
    #[must_use]
    pub fn new(
        scenario: String,
        target: AdjustmentTarget,
        variables: Vec<String>,
        granularity: Granularity,
        records: Vec<ForecastRecord>,
    ) -> Self {
        let summary = ForecastSummary::from_records(&records, granularity.hours_per_step());
        Self {
            scenario,
            target,
            variables,
            granularity,
            records,
            summary,
        }
    }
}
