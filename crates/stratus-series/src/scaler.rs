//! Per-feature z-score normalization.

use crate::series::SeriesView;

/// Per-feature mean and standard deviation used to z-score model inputs.
///
/// Uses population standard deviation (divides by n, not n-1). A feature
/// with zero variance gets a standard deviation of 1.0 so constant inputs
/// pass through shifted but unscaled.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Scaler {
    /// Fit on every step of every view.
    ///
    /// Returns `None` if the views hold no steps or disagree with `n_features`.
    #[must_use]
    pub fn fit(n_features: usize, views: &[SeriesView<'_>]) -> Option<Self> {
        if n_features == 0 || views.iter().any(|v| v.n_features() != n_features) {
            return None;
        }
        let n: usize = views.iter().map(SeriesView::steps).sum();
        if n == 0 {
            return None;
        }
        let mut means = vec![0.0; n_features];
        for view in views {
            for (i, &x) in view.as_slice().iter().enumerate() {
                means[i % n_features] += x;
            }
        }
        for m in &mut means {
            *m /= n as f64;
        }
        let mut variances = vec![0.0; n_features];
        for view in views {
            for (i, &x) in view.as_slice().iter().enumerate() {
                let f = i % n_features;
                variances[f] += (x - means[f]).powi(2);
            }
        }
        let stds = variances
            .into_iter()
            .map(|v| {
                let std = (v / n as f64).sqrt();
                if std > 0.0 && std.is_finite() { std } else { 1.0 }
            })
            .collect();
        Some(Self { means, stds })
    }

    /// Scaler that leaves values unchanged.
    #[must_use]
    pub fn identity(n_features: usize) -> Self {
        Self {
            means: vec![0.0; n_features],
            stds: vec![1.0; n_features],
        }
    }

    /// Return the number of features the scaler was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Return the per-feature means.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Return the per-feature standard deviations.
    #[must_use]
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// Z-score a row-major buffer.
    #[must_use]
    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        let f = self.n_features();
        values
            .iter()
            .enumerate()
            .map(|(i, &x)| (x - self.means[i % f]) / self.stds[i % f])
            .collect()
    }

    /// Map a z-scored row-major buffer back to physical units.
    #[must_use]
    pub fn inverse(&self, values: &[f64]) -> Vec<f64> {
        let f = self.n_features();
        values
            .iter()
            .enumerate()
            .map(|(i, &z)| z * self.stds[i % f] + self.means[i % f])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_computes_population_moments() {
        let data = [1.0, 10.0, 2.0, 10.0, 3.0, 10.0];
        let view = SeriesView::new(&data, 2).unwrap();
        let s = Scaler::fit(2, &[view]).unwrap();
        assert!((s.means()[0] - 2.0).abs() < 1e-12);
        assert!((s.stds()[0] - (2.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(s.means()[1], 10.0);
        assert_eq!(s.stds()[1], 1.0, "constant feature falls back to unit std");
    }

    #[test]
    fn transform_then_inverse_is_identity() {
        let data = [4.0, 8.0, 15.0, 16.0, 23.0, 42.0];
        let view = SeriesView::new(&data, 1).unwrap();
        let s = Scaler::fit(1, &[view]).unwrap();
        let z = s.transform(&data);
        let mean = z.iter().sum::<f64>() / z.len() as f64;
        assert!(mean.abs() < 1e-10, "mean was {mean}");
        for (a, b) in s.inverse(&z).iter().zip(&data) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn fit_rejects_empty_and_mismatched() {
        assert!(Scaler::fit(1, &[]).is_none());
        let data = [1.0, 2.0];
        let view = SeriesView::new(&data, 2).unwrap();
        assert!(Scaler::fit(1, &[view]).is_none());
    }

    #[test]
    fn identity_is_noop() {
        let s = Scaler::identity(2);
        assert_eq!(s.transform(&[3.0, -1.0]), vec![3.0, -1.0]);
    }
}
