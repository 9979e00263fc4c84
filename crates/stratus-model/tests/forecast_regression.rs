//! End-to-end regression tests for training, prediction and evaluation.

use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stratus_model::{Architecture, ForecastConfig, ForecastModel, Forecaster, ShapeError};
use stratus_series::{ClimateSeries, Granularity, SeriesView};

fn yearly(values: &[f64]) -> ClimateSeries {
    ClimateSeries::from_values(
        Granularity::Yearly,
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        "x",
        values,
    )
    .unwrap()
}

/// Two-variable monthly series with a seasonal cycle and seeded noise.
fn monthly_climate(n: usize, seed: u64) -> ClimateSeries {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut builder = ClimateSeries::builder(
        Granularity::Monthly,
        vec!["tem".to_string(), "rain".to_string()],
    )
    .unwrap();
    let mut date = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
    for i in 0..n {
        let phase = i as f64 * std::f64::consts::TAU / 12.0;
        let tem = 25.0 + 4.0 * phase.sin() + rng.gen_range(-0.5..0.5);
        let rain = (180.0 - 150.0 * phase.cos() + rng.gen_range(-10.0..10.0)).max(0.0);
        builder.push(date, &[tem, rain]).unwrap();
        date = Granularity::Monthly.next(date).unwrap();
    }
    builder.build().unwrap()
}

fn toy_trend() -> ClimateSeries {
    let values: Vec<f64> = (10..20).map(f64::from).collect();
    yearly(&values)
}

#[test]
fn toy_trend_yields_seven_windows() {
    assert_eq!(toy_trend().windows(3, 1).unwrap().count(), 7);
}

#[test]
fn autoregressive_extrapolates_linear_trend() {
    let series = toy_trend();
    let windows: Vec<_> = series.windows(3, 1).unwrap().collect();
    let model = ForecastConfig::new(3, 1)
        .unwrap()
        .with_architecture(Architecture::Autoregressive)
        .with_epochs(3000)
        .with_learning_rate(0.01)
        .fit(&windows)
        .unwrap();
    let input = [17.0, 18.0, 19.0];
    let pred = model.predict(SeriesView::new(&input, 1).unwrap()).unwrap();
    assert_eq!(pred.len(), 1);
    assert!((pred[0] - 20.0).abs() < 0.25, "predicted {}", pred[0]);
}

#[test]
fn recurrent_model_extrapolates_linear_trend() {
    let series = toy_trend();
    let windows: Vec<_> = series.windows(3, 1).unwrap().collect();
    let model = ForecastConfig::new(3, 1)
        .unwrap()
        .with_hidden_size(4)
        .with_epochs(3000)
        .with_learning_rate(0.01)
        .fit(&windows)
        .unwrap();
    let input = [17.0, 18.0, 19.0];
    let pred = model.predict(SeriesView::new(&input, 1).unwrap()).unwrap();
    assert!((pred[0] - 20.0).abs() < 1.0, "predicted {}", pred[0]);
}

#[test]
fn identical_seed_gives_bit_identical_models() {
    let series = monthly_climate(72, 3);
    let windows: Vec<_> = series.windows(12, 2).unwrap().collect();
    let config = ForecastConfig::new(12, 2)
        .unwrap()
        .with_hidden_size(6)
        .with_layers(2)
        .with_epochs(15)
        .with_batch_size(8)
        .with_seed(1234);
    let a = config.fit(&windows).unwrap();
    let b = config.fit(&windows).unwrap();
    assert_eq!(a, b);

    let probe = series.tail(12).unwrap();
    assert_eq!(a.predict(probe).unwrap(), b.predict(probe).unwrap());

    let c = config.clone().with_seed(4321).fit(&windows).unwrap();
    assert_ne!(a, c);
}

#[test]
fn predict_rejects_wrong_window_length() {
    let series = monthly_climate(48, 1);
    let windows: Vec<_> = series.windows(6, 1).unwrap().collect();
    let model = ForecastConfig::new(6, 1)
        .unwrap()
        .with_epochs(3)
        .fit(&windows)
        .unwrap();
    let short = series.tail(5).unwrap();
    assert_eq!(
        model.predict(short).unwrap_err(),
        ShapeError::WindowLength { expected: 6, got: 5 }
    );
    let univariate = [1.0; 6];
    assert_eq!(
        model.predict(SeriesView::new(&univariate, 1).unwrap()).unwrap_err(),
        ShapeError::FeatureCount { expected: 2, got: 1 }
    );
}

#[test]
fn predict_returns_horizon_times_features() {
    let series = monthly_climate(60, 2);
    let windows: Vec<_> = series.windows(12, 3).unwrap().collect();
    let model = ForecastConfig::new(12, 3)
        .unwrap()
        .with_epochs(5)
        .fit(&windows)
        .unwrap();
    let pred = model.predict(series.tail(12).unwrap()).unwrap();
    assert_eq!(pred.len(), 3 * 2);
    assert!(pred.iter().all(|v| v.is_finite()));
}

#[test]
fn variance_requires_uncertainty_config() {
    let series = monthly_climate(48, 4);
    let windows: Vec<_> = series.windows(6, 1).unwrap().collect();
    let plain = ForecastConfig::new(6, 1)
        .unwrap()
        .with_epochs(3)
        .fit(&windows)
        .unwrap();
    let input = series.tail(6).unwrap();
    assert_eq!(
        plain.predict_with_variance(input).unwrap_err(),
        ShapeError::UncertaintyNotConfigured
    );
    assert!(!Forecaster::has_uncertainty(&plain));

    let with_var = ForecastConfig::new(6, 1)
        .unwrap()
        .with_epochs(3)
        .with_uncertainty(true)
        .fit(&windows)
        .unwrap();
    let intervals = with_var.predict_with_variance(input).unwrap();
    let means = with_var.predict(input).unwrap();
    assert_eq!(intervals.len(), 2);
    for (interval, mean) in intervals.iter().zip(&means) {
        assert_eq!(interval.mean, *mean);
        assert!(interval.variance >= 0.0);
    }
}

#[test]
fn evaluate_reports_mae_and_rmse() {
    let series = monthly_climate(72, 5);
    let windows: Vec<_> = series.windows(12, 1).unwrap().collect();
    let model = ForecastConfig::new(12, 1)
        .unwrap()
        .with_epochs(30)
        .fit(&windows)
        .unwrap();
    let metrics = model.evaluate(&windows).unwrap();
    assert_eq!(metrics.n_windows, windows.len());
    assert_eq!(metrics.n_values, windows.len() * 2);
    assert!(metrics.mean_absolute_error >= 0.0);
    assert!(metrics.root_mean_squared_error >= metrics.mean_absolute_error);
}

#[test]
fn evaluate_rejects_horizon_mismatch_and_empty_set() {
    let series = monthly_climate(48, 6);
    let windows: Vec<_> = series.windows(6, 1).unwrap().collect();
    let model: ForecastModel = ForecastConfig::new(6, 1)
        .unwrap()
        .with_epochs(2)
        .fit(&windows)
        .unwrap();
    let longer: Vec<_> = series.windows(6, 2).unwrap().collect();
    assert!(matches!(
        model.evaluate(&longer),
        Err(ShapeError::Horizon { window: 0, expected: 1, got: 2 })
    ));
    assert_eq!(model.evaluate(&[]).unwrap_err(), ShapeError::EmptyWindowSet);
}
