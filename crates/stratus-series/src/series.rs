//! Climate series types with validation guarantees.

use chrono::NaiveDate;

use crate::bounds::PhysicalRange;
use crate::error::SeriesError;
use crate::granularity::Granularity;

/// How the builder treats missing steps between two pushed timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GapPolicy {
    /// Any missing step fails validation with [`SeriesError::Gap`].
    #[default]
    Reject,
    /// Missing steps are filled by linear interpolation between neighbours.
    Interpolate,
}

/// Owned, validated climate series.
///
/// Guaranteed non-empty, with strictly increasing, gap-free timestamps at
/// its [`Granularity`] and finite values for every variable. Values are
/// stored row-major: `values[step * n_features + feature]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateSeries {
    granularity: Granularity,
    variables: Vec<String>,
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ClimateSeries {
    /// Start building a series with the given granularity and variable names.
    ///
    /// Default physical ranges from [`PhysicalRange::for_variable`] are
    /// attached to recognised variable names.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::NoVariables`] | `variables` is empty |
    /// | [`SeriesError::DuplicateVariable`] | A name appears twice |
    pub fn builder(
        granularity: Granularity,
        variables: Vec<String>,
    ) -> Result<SeriesBuilder, SeriesError> {
        if variables.is_empty() {
            return Err(SeriesError::NoVariables);
        }
        for (i, name) in variables.iter().enumerate() {
            if variables[..i].contains(name) {
                return Err(SeriesError::DuplicateVariable { name: name.clone() });
            }
        }
        let ranges = variables.iter().map(|v| PhysicalRange::for_variable(v)).collect();
        Ok(SeriesBuilder {
            granularity,
            variables,
            ranges,
            gap_policy: GapPolicy::Reject,
            timestamps: Vec::new(),
            values: Vec::new(),
            input_step: 0,
        })
    }

    /// Build a single-variable series of consecutive steps starting at `start`.
    ///
    /// # Errors
    ///
    /// Any [`SeriesError`] raised by [`SeriesBuilder::push`] or
    /// [`SeriesBuilder::build`].
    pub fn from_values(
        granularity: Granularity,
        start: NaiveDate,
        variable: &str,
        values: &[f64],
    ) -> Result<Self, SeriesError> {
        let mut builder = Self::builder(granularity, vec![variable.to_string()])?;
        let mut timestamp = Some(start);
        for &value in values {
            let Some(ts) = timestamp else { break };
            builder.push(ts, &[value])?;
            timestamp = granularity.next(ts);
        }
        builder.build()
    }

    /// Return the step spacing.
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Return the variable names in column order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Return the column index of `name`, if present.
    #[must_use]
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    /// Return the number of variables per step.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.variables.len()
    }

    /// Return the number of time steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Return true if the series has no time steps.
    ///
    /// A [`ClimateSeries`] produced by [`SeriesBuilder::build`] is always
    /// non-empty; provided to satisfy the `len_without_is_empty` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Return the step timestamps.
    #[must_use]
    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Return the timestamp of the most recent step.
    #[must_use]
    pub fn last_timestamp(&self) -> NaiveDate {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// Return the row-major value buffer.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the values of one step, or `None` past the end.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&[f64]> {
        let f = self.n_features();
        self.values.get(index * f..(index + 1) * f)
    }

    /// Return a copy of one variable's column.
    #[must_use]
    pub fn column(&self, feature: usize) -> Vec<f64> {
        self.values
            .iter()
            .skip(feature)
            .step_by(self.n_features())
            .copied()
            .collect()
    }

    /// Borrow the whole series as a view.
    #[must_use]
    pub fn as_view(&self) -> SeriesView<'_> {
        SeriesView::new_unchecked(&self.values, self.n_features())
    }

    /// Borrow `steps` consecutive steps beginning at `start`.
    #[must_use]
    pub fn view(&self, start: usize, steps: usize) -> Option<SeriesView<'_>> {
        let f = self.n_features();
        let end = start.checked_add(steps)?;
        if end > self.len() {
            return None;
        }
        Some(SeriesView::new_unchecked(&self.values[start * f..end * f], f))
    }

    /// Borrow the most recent `steps` steps.
    #[must_use]
    pub fn tail(&self, steps: usize) -> Option<SeriesView<'_>> {
        let start = self.len().checked_sub(steps)?;
        self.view(start, steps)
    }
}

/// Incremental, validating constructor for [`ClimateSeries`].
///
/// Rows are validated as they are pushed so the first invalid row is
/// reported with its input index and nothing after it is inspected.
#[derive(Debug)]
pub struct SeriesBuilder {
    granularity: Granularity,
    variables: Vec<String>,
    ranges: Vec<Option<PhysicalRange>>,
    gap_policy: GapPolicy,
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
    input_step: usize,
}

impl SeriesBuilder {
    /// Set how missing steps are handled. Defaults to [`GapPolicy::Reject`].
    #[must_use]
    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    /// Override the physical range of `variable`. Names not in the series
    /// are ignored.
    #[must_use]
    pub fn with_range(mut self, variable: &str, range: PhysicalRange) -> Self {
        if let Some(i) = self.variables.iter().position(|v| v == variable) {
            self.ranges[i] = Some(range);
        }
        self
    }

    /// Remove the physical range of `variable`, keeping only the finiteness check.
    #[must_use]
    pub fn without_range(mut self, variable: &str) -> Self {
        if let Some(i) = self.variables.iter().position(|v| v == variable) {
            self.ranges[i] = None;
        }
        self
    }

    /// Append one step.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::FeatureCountMismatch`] | `values.len()` differs from the variable count |
    /// | [`SeriesError::NonFiniteValue`] | A value is NaN or infinite |
    /// | [`SeriesError::OutOfRange`] | A value is outside its physical range |
    /// | [`SeriesError::MisalignedTimestamp`] | `timestamp` is not on a step boundary |
    /// | [`SeriesError::NonMonotonic`] | `timestamp` is not after the previous one |
    /// | [`SeriesError::Gap`] | Steps are missing and the policy is [`GapPolicy::Reject`] |
    pub fn push(&mut self, timestamp: NaiveDate, values: &[f64]) -> Result<(), SeriesError> {
        let step = self.input_step;
        let n_features = self.variables.len();
        if values.len() != n_features {
            return Err(SeriesError::FeatureCountMismatch {
                step,
                expected: n_features,
                got: values.len(),
            });
        }
        for (feature, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(SeriesError::NonFiniteValue {
                    step,
                    variable: self.variables[feature].clone(),
                });
            }
            if let Some(range) = self.ranges[feature]
                && !range.contains(value)
            {
                return Err(SeriesError::OutOfRange {
                    step,
                    variable: self.variables[feature].clone(),
                    value,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        if !self.granularity.is_aligned(timestamp) {
            return Err(SeriesError::MisalignedTimestamp {
                step,
                timestamp,
                granularity: self.granularity.name(),
            });
        }

        if let Some(&previous) = self.timestamps.last() {
            if timestamp <= previous {
                return Err(SeriesError::NonMonotonic {
                    step,
                    timestamp,
                    previous,
                });
            }
            let missing = self.missing_between(previous, timestamp);
            if !missing.is_empty() {
                match self.gap_policy {
                    GapPolicy::Reject => {
                        return Err(SeriesError::Gap {
                            step,
                            expected: missing[0],
                            found: timestamp,
                        });
                    }
                    GapPolicy::Interpolate => self.interpolate(&missing, values),
                }
            }
        }

        self.timestamps.push(timestamp);
        self.values.extend_from_slice(values);
        self.input_step += 1;
        Ok(())
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::EmptySeries`] if no step was pushed.
    pub fn build(self) -> Result<ClimateSeries, SeriesError> {
        if self.timestamps.is_empty() {
            return Err(SeriesError::EmptySeries);
        }
        Ok(ClimateSeries {
            granularity: self.granularity,
            variables: self.variables,
            timestamps: self.timestamps,
            values: self.values,
        })
    }

    /// Step timestamps strictly between `previous` and `timestamp`.
    fn missing_between(&self, previous: NaiveDate, timestamp: NaiveDate) -> Vec<NaiveDate> {
        let mut missing = Vec::new();
        let mut cursor = self.granularity.next(previous);
        while let Some(date) = cursor {
            if date >= timestamp {
                break;
            }
            missing.push(date);
            cursor = self.granularity.next(date);
        }
        missing
    }

    /// Linearly interpolate every missing step between the last stored step
    /// and `next_values`.
    fn interpolate(&mut self, missing: &[NaiveDate], next_values: &[f64]) {
        let n_features = self.variables.len();
        let last_start = self.values.len() - n_features;
        let previous: Vec<f64> = self.values[last_start..].to_vec();
        let span = (missing.len() + 1) as f64;
        for (i, &date) in missing.iter().enumerate() {
            let frac = (i + 1) as f64 / span;
            self.timestamps.push(date);
            self.values.extend(
                previous
                    .iter()
                    .zip(next_values)
                    .map(|(&a, &b)| a + frac * (b - a)),
            );
        }
    }
}

/// Borrowed run of consecutive steps. Zero-copy, row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesView<'a> {
    data: &'a [f64],
    n_features: usize,
}

impl<'a> SeriesView<'a> {
    /// Create a view over a row-major buffer of whole steps.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::RaggedBuffer`] if `n_features` is zero or does
    /// not divide `data.len()`.
    pub fn new(data: &'a [f64], n_features: usize) -> Result<Self, SeriesError> {
        if n_features == 0 || data.len() % n_features != 0 {
            return Err(SeriesError::RaggedBuffer {
                len: data.len(),
                n_features,
            });
        }
        Ok(Self { data, n_features })
    }

    /// Create a view without validation. For internal use where the shape is known.
    pub(crate) fn new_unchecked(data: &'a [f64], n_features: usize) -> Self {
        Self { data, n_features }
    }

    /// Return the number of steps in the view.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.data.len() / self.n_features
    }

    /// Return true if the view covers no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the number of variables per step.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the underlying row-major slice.
    #[must_use]
    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }

    /// Return the values of step `index` within the view.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.steps()`.
    #[must_use]
    pub fn step(&self, index: usize) -> &'a [f64] {
        &self.data[index * self.n_features..(index + 1) * self.n_features]
    }
}

impl AsRef<[f64]> for SeriesView<'_> {
    fn as_ref(&self) -> &[f64] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly(variables: &[&str]) -> SeriesBuilder {
        ClimateSeries::builder(
            Granularity::Monthly,
            variables.iter().map(|v| v.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn builds_valid_monthly_series() {
        let mut b = monthly(&["tem", "rain"]);
        b.push(date(1901, 1, 1), &[19.0, 20.0]).unwrap();
        b.push(date(1901, 2, 1), &[22.0, 25.0]).unwrap();
        b.push(date(1901, 3, 1), &[26.0, 50.0]).unwrap();
        let s = b.build().unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.n_features(), 2);
        assert_eq!(s.step(1), Some(&[22.0, 25.0][..]));
        assert_eq!(s.column(1), vec![20.0, 25.0, 50.0]);
        assert_eq!(s.last_timestamp(), date(1901, 3, 1));
    }

    #[test]
    fn rejects_empty_variable_list() {
        let result = ClimateSeries::builder(Granularity::Daily, vec![]);
        assert!(matches!(result, Err(SeriesError::NoVariables)));
    }

    #[test]
    fn rejects_duplicate_variable() {
        let result = ClimateSeries::builder(
            Granularity::Daily,
            vec!["rain".to_string(), "rain".to_string()],
        );
        assert!(matches!(result, Err(SeriesError::DuplicateVariable { .. })));
    }

    #[test]
    fn rejects_empty_series() {
        let result = monthly(&["tem"]).build();
        assert!(matches!(result, Err(SeriesError::EmptySeries)));
    }

    #[test]
    fn rejects_gap_with_step_index() {
        let mut b = monthly(&["tem"]);
        b.push(date(2000, 1, 1), &[20.0]).unwrap();
        b.push(date(2000, 2, 1), &[21.0]).unwrap();
        let err = b.push(date(2000, 4, 1), &[22.0]).unwrap_err();
        assert_eq!(
            err,
            SeriesError::Gap {
                step: 2,
                expected: date(2000, 3, 1),
                found: date(2000, 4, 1),
            }
        );
    }

    #[test]
    fn interpolates_gap_when_enabled() {
        let mut b = monthly(&["tem"]).with_gap_policy(GapPolicy::Interpolate);
        b.push(date(2000, 1, 1), &[10.0]).unwrap();
        b.push(date(2000, 4, 1), &[16.0]).unwrap();
        let s = b.build().unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.values(), &[10.0, 12.0, 14.0, 16.0]);
        assert_eq!(s.timestamps()[2], date(2000, 3, 1));
    }

    #[test]
    fn rejects_non_monotonic() {
        let mut b = monthly(&["tem"]);
        b.push(date(2000, 2, 1), &[20.0]).unwrap();
        let err = b.push(date(2000, 1, 1), &[20.0]).unwrap_err();
        assert!(matches!(err, SeriesError::NonMonotonic { step: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let mut b = monthly(&["tem"]);
        b.push(date(2000, 2, 1), &[20.0]).unwrap();
        let err = b.push(date(2000, 2, 1), &[20.0]).unwrap_err();
        assert!(matches!(err, SeriesError::NonMonotonic { .. }));
    }

    #[test]
    fn rejects_misaligned_timestamp() {
        let mut b = monthly(&["tem"]);
        let err = b.push(date(2000, 2, 15), &[20.0]).unwrap_err();
        assert!(matches!(err, SeriesError::MisalignedTimestamp { step: 0, .. }));
    }

    #[test]
    fn rejects_temperature_out_of_range() {
        let mut b = monthly(&["temperature"]);
        let err = b.push(date(2000, 1, 1), &[75.0]).unwrap_err();
        assert!(matches!(err, SeriesError::OutOfRange { value, .. } if value == 75.0));
    }

    #[test]
    fn custom_range_overrides_default() {
        let mut b = monthly(&["temperature"]).with_range("temperature", PhysicalRange::new(0.0, 10.0));
        assert!(b.push(date(2000, 1, 1), &[5.0]).is_ok());
        assert!(matches!(
            b.push(date(2000, 2, 1), &[20.0]),
            Err(SeriesError::OutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_nan() {
        let mut b = monthly(&["humidity"]);
        let err = b.push(date(2000, 1, 1), &[f64::NAN]).unwrap_err();
        assert!(matches!(err, SeriesError::NonFiniteValue { step: 0, .. }));
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let mut b = monthly(&["tem", "rain"]);
        let err = b.push(date(2000, 1, 1), &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            SeriesError::FeatureCountMismatch { expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn from_values_builds_consecutive_steps() {
        let s = ClimateSeries::from_values(Granularity::Yearly, date(1990, 1, 1), "x", &[1.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.last_timestamp(), date(1992, 1, 1));
    }

    #[test]
    fn tail_and_view() {
        let s = ClimateSeries::from_values(Granularity::Daily, date(2020, 1, 1), "x", &[1.0, 2.0, 3.0, 4.0])
            .unwrap();
        assert_eq!(s.tail(2).unwrap().as_slice(), &[3.0, 4.0]);
        assert_eq!(s.view(1, 2).unwrap().as_slice(), &[2.0, 3.0]);
        assert!(s.view(3, 2).is_none());
        assert!(s.tail(5).is_none());
    }

    #[test]
    fn view_rejects_ragged_buffer() {
        let data = [1.0, 2.0, 3.0];
        assert!(matches!(
            SeriesView::new(&data, 2),
            Err(SeriesError::RaggedBuffer { len: 3, n_features: 2 })
        ));
        assert!(SeriesView::new(&data, 0).is_err());
        assert_eq!(SeriesView::new(&data, 1).unwrap().steps(), 3);
    }
}
