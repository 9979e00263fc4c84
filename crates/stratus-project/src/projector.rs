//! Recursive multi-step projection under a scenario.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use chrono::NaiveDate;
use stratus_energy::PowerModel;
use stratus_model::{Forecaster, ShapeError};
use stratus_series::{ClimateSeries, Granularity, SeriesView};
use tracing::{debug, info, instrument};

use crate::error::ProjectionError;
use crate::result::{ConfidenceBand, ForecastRecord, ForecastResult};
use crate::scenario::{Adjustment, AdjustmentTarget, Scenario, apply_all};

/// Two-sided 95% normal quantile used for confidence bands.
pub const INTERVAL_Z: f64 = 1.96;

/// The history a projection starts from: the most recent `window_len` steps.
#[derive(Debug, Clone, PartialEq)]
pub struct StartWindow {
    values: Vec<f64>,
    variables: Vec<String>,
    last_timestamp: NaiveDate,
    granularity: Granularity,
}

impl StartWindow {
    /// Take the last `window_len` steps of `series`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::InsufficientHistory`] if the series is
    /// shorter than `window_len` or `window_len` is zero.
    pub fn latest(series: &ClimateSeries, window_len: usize) -> Result<Self, ProjectionError> {
        let tail = if window_len == 0 {
            None
        } else {
            series.tail(window_len)
        };
        let tail = tail.ok_or(ProjectionError::InsufficientHistory {
            available: series.len(),
            required: window_len,
        })?;
        Ok(Self {
            values: tail.as_slice().to_vec(),
            variables: series.variables().to_vec(),
            last_timestamp: series.last_timestamp(),
            granularity: series.granularity(),
        })
    }

    /// Build a start window from a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::Series`] if `values` is empty, not a whole
    /// number of steps, or `variables` is empty.
    pub fn new(
        values: Vec<f64>,
        variables: Vec<String>,
        last_timestamp: NaiveDate,
        granularity: Granularity,
    ) -> Result<Self, ProjectionError> {
        let view = SeriesView::new(&values, variables.len())?;
        if view.is_empty() {
            return Err(ProjectionError::InsufficientHistory {
                available: 0,
                required: 1,
            });
        }
        Ok(Self {
            values,
            variables,
            last_timestamp,
            granularity,
        })
    }

    /// Return the number of history steps.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.values.len() / self.variables.len()
    }

    /// Return the variable names.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Return the timestamp of the last history step.
    #[must_use]
    pub fn last_timestamp(&self) -> NaiveDate {
        self.last_timestamp
    }

    /// Return the step granularity.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }
}

/// Drives a [`Forecaster`] forward and converts each step to power.
///
/// Holds only shared references, so one projector can run any number of
/// scenarios.
#[derive(Debug)]
pub struct Projector<'a, M: ?Sized, P: ?Sized> {
    model: &'a M,
    power: &'a P,
}

impl<M: ?Sized, P: ?Sized> Clone for Projector<'_, M, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: ?Sized, P: ?Sized> Copy for Projector<'_, M, P> {}

impl<'a, M, P> Projector<'a, M, P>
where
    M: Forecaster + ?Sized,
    P: PowerModel + ?Sized,
{
    /// Create a projector over a trained model and a power model.
    #[must_use]
    pub fn new(model: &'a M, power: &'a P) -> Self {
        Self { model, power }
    }

    /// Start a lazy projection of `steps` steps past `start`.
    ///
    /// Input-target adjustments are applied to the start window here, once.
    /// Output-target adjustments are applied to each emitted step; the model
    /// is always fed its own unadjusted output.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::ZeroSteps`], [`ProjectionError::Shape`] if
    /// `start` does not fit the model, or
    /// [`ProjectionError::UnknownVariable`] if the scenario names a variable
    /// `start` lacks.
    pub fn project(
        &self,
        start: &StartWindow,
        scenario: &Scenario,
        steps: usize,
    ) -> Result<Projection<'a, M, P>, ProjectionError> {
        if steps == 0 {
            return Err(ProjectionError::ZeroSteps);
        }
        let n_features = start.variables.len();
        if n_features != self.model.n_features() {
            return Err(ShapeError::FeatureCount {
                expected: self.model.n_features(),
                got: n_features,
            }
            .into());
        }
        let history = start.steps();
        if history != self.model.window_len() {
            return Err(ShapeError::WindowLength {
                expected: self.model.window_len(),
                got: history,
            }
            .into());
        }

        let resolved = scenario.resolve(&start.variables)?;
        let mut window = start.values.clone();
        let output_adjustments = match scenario.target {
            AdjustmentTarget::Input => {
                apply_all(&resolved, &mut window, n_features);
                Vec::new()
            }
            AdjustmentTarget::Output => resolved,
        };
        debug!(
            scenario = %scenario.name,
            target = ?scenario.target,
            steps,
            "projection started"
        );

        Ok(Projection {
            model: self.model,
            power: self.power,
            variables: start.variables.clone(),
            granularity: start.granularity,
            output_adjustments,
            window,
            pending: VecDeque::new(),
            timestamp: start.last_timestamp,
            emitted: 0,
            steps,
            done: false,
        })
    }

    /// Run a projection to completion.
    ///
    /// # Errors
    ///
    /// Returns the setup errors of [`Projector::project`] or the first error
    /// the projection yields. No partial result is returned.
    #[instrument(skip_all, fields(scenario = %scenario.name, steps))]
    pub fn run(
        &self,
        start: &StartWindow,
        scenario: &Scenario,
        steps: usize,
    ) -> Result<ForecastResult, ProjectionError> {
        let records = self
            .project(start, scenario, steps)?
            .collect::<Result<Vec<_>, _>>()?;
        let result = ForecastResult::new(
            scenario.name.clone(),
            scenario.target,
            start.variables.clone(),
            start.granularity,
            records,
        );
        info!(
            total_energy_mwh = result.summary.total_energy_mwh,
            peak_power_w = result.summary.peak_power_w,
            households = result.summary.households_served,
            "projection complete"
        );
        Ok(result)
    }

    /// Run every scenario from the same start window.
    ///
    /// # Errors
    ///
    /// Returns the first failing scenario's error.
    pub fn run_all(
        &self,
        start: &StartWindow,
        scenarios: &[Scenario],
        steps: usize,
    ) -> Result<Vec<ForecastResult>, ProjectionError> {
        scenarios
            .iter()
            .map(|scenario| self.run(start, scenario, steps))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct PendingStep {
    values: Vec<f64>,
    variances: Option<Vec<f64>>,
}

/// Lazy iterator over projected steps.
///
/// Yields at most `steps` records. After the first error it yields nothing.
/// Cloning captures the current position, so a clone resumes independently.
#[derive(Debug)]
pub struct Projection<'a, M: ?Sized, P: ?Sized> {
    model: &'a M,
    power: &'a P,
    variables: Vec<String>,
    granularity: Granularity,
    output_adjustments: Vec<(usize, Adjustment)>,
    window: Vec<f64>,
    pending: VecDeque<PendingStep>,
    timestamp: NaiveDate,
    emitted: usize,
    steps: usize,
    done: bool,
}

impl<M: ?Sized, P: ?Sized> Clone for Projection<'_, M, P> {
    fn clone(&self) -> Self {
        Self {
            model: self.model,
            power: self.power,
            variables: self.variables.clone(),
            granularity: self.granularity,
            output_adjustments: self.output_adjustments.clone(),
            window: self.window.clone(),
            pending: self.pending.clone(),
            timestamp: self.timestamp,
            emitted: self.emitted,
            steps: self.steps,
            done: self.done,
        }
    }
}

impl<M, P> Projection<'_, M, P>
where
    M: Forecaster + ?Sized,
    P: PowerModel + ?Sized,
{
    /// Number of steps emitted so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn refill(&mut self) -> Result<(), ProjectionError> {
        let n_features = self.variables.len();
        let expected = self.model.horizon() * n_features;
        let view = SeriesView::new(&self.window, n_features)?;

        let (values, variances) = if self.model.has_uncertainty() {
            let intervals = self.model.predict_with_variance(view)?;
            let values: Vec<f64> = intervals.iter().map(|p| p.mean).collect();
            let variances: Vec<f64> = intervals.iter().map(|p| p.variance).collect();
            (values, Some(variances))
        } else {
            (self.model.predict(view)?, None)
        };
        if values.len() != expected || expected == 0 {
            return Err(ProjectionError::OutputLength {
                expected,
                got: values.len(),
            });
        }

        for (h, chunk) in values.chunks_exact(n_features).enumerate() {
            let range = h * n_features..(h + 1) * n_features;
            self.pending.push_back(PendingStep {
                values: chunk.to_vec(),
                variances: variances.as_ref().map(|v| v[range].to_vec()),
            });
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<ForecastRecord, ProjectionError> {
        let step = self.emitted;
        if self.pending.is_empty() {
            self.refill()?;
        }
        let raw = self
            .pending
            .pop_front()
            .ok_or(ProjectionError::OutputLength {
                expected: self.model.horizon() * self.variables.len(),
                got: 0,
            })?;

        if let Some(f) = raw.values.iter().position(|v| !v.is_finite()) {
            return Err(ProjectionError::Divergence {
                step,
                variable: self.variables[f].clone(),
            });
        }

        let n_features = self.variables.len();
        self.window.drain(..n_features);
        self.window.extend_from_slice(&raw.values);

        let mut climate = raw.values;
        apply_all(&self.output_adjustments, &mut climate, n_features);
        if let Some(f) = climate.iter().position(|v| !v.is_finite()) {
            return Err(ProjectionError::Divergence {
                step,
                variable: self.variables[f].clone(),
            });
        }

        let interval = raw.variances.map(|variances| self.band(&climate, &variances));

        let timestamp = self
            .granularity
            .next(self.timestamp)
            .ok_or(ProjectionError::CalendarOverflow { step })?;
        let power = self
            .power
            .estimate(&self.variables, &climate)
            .map_err(|source| ProjectionError::Energy { step, source })?;
        let energy_mwh = power.energy_mwh(self.granularity.hours_per_step());

        self.timestamp = timestamp;
        self.emitted += 1;
        Ok(ForecastRecord {
            step,
            timestamp,
            label: self.granularity.label(timestamp),
            climate,
            power,
            energy_mwh,
            interval,
        })
    }

    /// Band of ±[`INTERVAL_Z`] standard deviations, passed through the
    /// output adjustments so it brackets the adjusted climate.
    fn band(&self, climate: &[f64], variances: &[f64]) -> ConfidenceBand {
        let mut lower = Vec::with_capacity(climate.len());
        let mut upper = Vec::with_capacity(climate.len());
        for (f, (&value, &variance)) in climate.iter().zip(variances).enumerate() {
            let scale = self
                .output_adjustments
                .iter()
                .filter(|(feature, _)| *feature == f)
                .fold(1.0, |acc, (_, a)| acc * a.scale.abs());
            let half = INTERVAL_Z * variance.max(0.0).sqrt() * scale;
            lower.push(value - half);
            upper.push(value + half);
        }
        ConfidenceBand { lower, upper }
    }
}

impl<M, P> Iterator for Projection<'_, M, P>
where
    M: Forecaster + ?Sized,
    P: PowerModel + ?Sized,
{
    type Item = Result<ForecastRecord, ProjectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.emitted >= self.steps {
            return None;
        }
        let item = self.advance();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.steps - self.emitted))
        }
    }
}

impl<M, P> FusedIterator for Projection<'_, M, P>
where
    M: Forecaster + ?Sized,
    P: PowerModel + ?Sized,
{
}

#[cfg(test)]
mod tests {
    use stratus_energy::{EnergyError, PowerEstimate};

    use super::*;

    /// Predicts `last * factor + step`, one step ahead, for every feature.
    struct Linear {
        window_len: usize,
        n_features: usize,
        factor: f64,
        step: f64,
    }

    impl Forecaster for Linear {
        fn window_len(&self) -> usize {
            self.window_len
        }
        fn horizon(&self) -> usize {
            1
        }
        fn n_features(&self) -> usize {
            self.n_features
        }
        fn predict(&self, input: SeriesView<'_>) -> Result<Vec<f64>, ShapeError> {
            let last = input.step(input.steps() - 1);
            Ok(last.iter().map(|v| v * self.factor + self.step).collect())
        }
    }

    /// Power equal to the first climate value, in watts.
    struct FirstValue;

    impl PowerModel for FirstValue {
        fn estimate(&self, _: &[String], values: &[f64]) -> Result<PowerEstimate, EnergyError> {
            Ok(PowerEstimate {
                waterfall_w: values[0],
                geothermal_w: 0.0,
                waste_recovery_w: 0.0,
            })
        }
    }

    fn start(values: Vec<f64>, names: &[&str]) -> StartWindow {
        StartWindow::new(
            values,
            names.iter().map(|s| (*s).to_string()).collect(),
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            Granularity::Monthly,
        )
        .unwrap()
    }

    fn climate(records: &[ForecastRecord]) -> Vec<f64> {
        records.iter().map(|r| r.climate[0]).collect()
    }

    #[test]
    fn identity_scenario_matches_baseline() {
        let model = Linear { window_len: 2, n_features: 1, factor: 1.0, step: 1.0 };
        let projector = Projector::new(&model, &FirstValue);
        let s = start(vec![1.0, 2.0], &["rain"]);
        let base = projector.run(&s, &Scenario::baseline(), 5).unwrap();
        let normal = projector.run(&s, &Scenario::preset("normal").unwrap(), 5).unwrap();
        assert_eq!(base.records, normal.records);
        assert_eq!(climate(&base.records), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn output_adjustments_do_not_compound() {
        let model = Linear { window_len: 1, n_features: 1, factor: 1.0, step: 1.0 };
        let projector = Projector::new(&model, &FirstValue);
        let s = start(vec![10.0], &["rain"]);
        let scenario = Scenario::new("double", AdjustmentTarget::Output)
            .with_adjustment(Adjustment::scale("rain", 2.0));
        let result = projector.run(&s, &scenario, 3).unwrap();
        assert_eq!(climate(&result.records), vec![22.0, 24.0, 26.0]);
    }

    #[test]
    fn input_adjustments_apply_once() {
        let model = Linear { window_len: 1, n_features: 1, factor: 1.0, step: 1.0 };
        let projector = Projector::new(&model, &FirstValue);
        let s = start(vec![10.0], &["rain"]);
        let scenario = Scenario::new("double", AdjustmentTarget::Input)
            .with_adjustment(Adjustment::scale("rain", 2.0));
        let result = projector.run(&s, &scenario, 3).unwrap();
        assert_eq!(climate(&result.records), vec![21.0, 22.0, 23.0]);
    }

    #[test]
    fn timestamps_and_labels_advance() {
        let model = Linear { window_len: 1, n_features: 1, factor: 1.0, step: 0.0 };
        let projector = Projector::new(&model, &FirstValue);
        let result = projector.run(&start(vec![1.0], &["rain"]), &Scenario::baseline(), 2).unwrap();
        let labels: Vec<_> = result.records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["2025-01", "2025-02"]);
        assert!((result.records[0].energy_mwh - 730.0 / 1.0e6).abs() < 1e-12);
    }

    #[test]
    fn divergence_fuses_the_iterator() {
        let model = Linear { window_len: 1, n_features: 1, factor: 1.0e200, step: 0.0 };
        let projector = Projector::new(&model, &FirstValue);
        let s = start(vec![1.0], &["rain"]);
        let mut projection = projector.project(&s, &Scenario::baseline(), 5).unwrap();
        assert!(projection.next().unwrap().is_ok());
        assert!(matches!(
            projection.next(),
            Some(Err(ProjectionError::Divergence { step: 1, .. }))
        ));
        assert!(projection.next().is_none());
        assert!(matches!(
            projector.run(&s, &Scenario::baseline(), 5),
            Err(ProjectionError::Divergence { step: 1, .. })
        ));
    }

    #[test]
    fn clones_resume_independently() {
        let model = Linear { window_len: 1, n_features: 1, factor: 1.0, step: 1.0 };
        let projector = Projector::new(&model, &FirstValue);
        let s = start(vec![0.0], &["rain"]);
        let mut projection = projector.project(&s, &Scenario::baseline(), 4).unwrap();
        projection.next();
        let fork = projection.clone();
        let rest: Vec<_> = projection.map(|r| r.unwrap().climate[0]).collect();
        let forked: Vec<_> = fork.map(|r| r.unwrap().climate[0]).collect();
        assert_eq!(rest, vec![2.0, 3.0, 4.0]);
        assert_eq!(rest, forked);
    }

    #[test]
    fn setup_errors() {
        let model = Linear { window_len: 2, n_features: 1, factor: 1.0, step: 0.0 };
        let projector = Projector::new(&model, &FirstValue);
        let short = start(vec![1.0], &["rain"]);
        assert!(matches!(
            projector.project(&short, &Scenario::baseline(), 1),
            Err(ProjectionError::Shape(ShapeError::WindowLength { expected: 2, got: 1 }))
        ));
        let ok = start(vec![1.0, 2.0], &["rain"]);
        assert!(matches!(
            projector.project(&ok, &Scenario::baseline(), 0),
            Err(ProjectionError::ZeroSteps)
        ));
        assert!(matches!(
            projector.project(&ok, &Scenario::preset("hotter").unwrap(), 1),
            Err(ProjectionError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn power_is_estimated_from_adjusted_climate() {
        let model = Linear { window_len: 1, n_features: 2, factor: 1.0, step: 0.0 };
        let projector = Projector::new(&model, &FirstValue);
        let s = start(vec![100.0, 20.0], &["rain", "tem"]);
        let result = projector.run(&s, &Scenario::preset("drier").unwrap(), 1).unwrap();
        assert!((result.records[0].climate[0] - 70.0).abs() < 1e-12);
        assert!((result.records[0].power.waterfall_w - 70.0).abs() < 1e-12);
        assert_eq!(result.records[0].climate[1], 20.0);
    }
}
