//! Scenario projections driven by a trained model and a site power model.

use chrono::NaiveDate;
use stratus_energy::{Site, SitePowerModel};
use stratus_model::{ForecastConfig, ForecastModel};
use stratus_project::{PRESET_NAMES, ProjectionError, Projector, Scenario, StartWindow};
use stratus_series::{ClimateSeries, Granularity};

fn monthly_climate(n: usize) -> ClimateSeries {
    let mut builder = ClimateSeries::builder(
        Granularity::Monthly,
        vec!["tem".to_string(), "rain".to_string()],
    )
    .unwrap();
    let mut date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    for i in 0..n {
        let phase = i as f64 * std::f64::consts::TAU / 12.0;
        builder
            .push(date, &[25.0 + 4.0 * phase.sin(), 180.0 - 150.0 * phase.cos()])
            .unwrap();
        date = Granularity::Monthly.next(date).unwrap();
    }
    builder.build().unwrap()
}

fn trained(series: &ClimateSeries, uncertainty: bool) -> ForecastModel {
    let windows: Vec<_> = series.windows(12, 1).unwrap().collect();
    ForecastConfig::new(12, 1)
        .unwrap()
        .with_hidden_size(8)
        .with_epochs(40)
        .with_uncertainty(uncertainty)
        .fit(&windows)
        .unwrap()
        .with_variables(series.variables().to_vec())
}

fn power() -> SitePowerModel {
    SitePowerModel::new(Site {
        location_name: "Madhabkunda".into(),
        latitude: 24.64,
        longitude: 92.22,
        waterfall_height_m: 45.0,
        waterfall_flow_m3s: 8.5,
        geo_temp_c: 150.0,
        depth_km: 2.0,
    })
    .with_reference_rainfall(180.0)
    .unwrap()
}

#[test]
fn every_preset_projects_a_year() {
    let series = monthly_climate(96);
    let model = trained(&series, false);
    let power = power();
    let projector = Projector::new(&model, &power);
    let start = StartWindow::latest(&series, 12).unwrap();

    let scenarios: Vec<_> = PRESET_NAMES
        .iter()
        .map(|name| Scenario::preset(name).unwrap())
        .collect();
    let results = projector.run_all(&start, &scenarios, 12).unwrap();
    assert_eq!(results.len(), PRESET_NAMES.len());
    for result in &results {
        assert_eq!(result.records.len(), 12);
        assert_eq!(result.records[0].label, "2008-01");
        assert_eq!(result.records[11].label, "2008-12");
        assert!(result.summary.total_energy_mwh > 0.0);
        assert!(result.summary.peak_power_w >= result.summary.mean_power_w);
    }

    let normal = &results[0];
    let wetter = &results[1];
    let hotter = &results[3];
    for ((n, w), h) in normal.records.iter().zip(&wetter.records).zip(&hotter.records) {
        assert!(w.power.waterfall_w >= n.power.waterfall_w);
        assert!(h.power.geothermal_w <= n.power.geothermal_w);
        assert!((w.climate[0] - n.climate[0]).abs() < 1e-12);
    }
}

#[test]
fn projections_are_deterministic_and_restartable() {
    let series = monthly_climate(60);
    let model = trained(&series, false);
    let power = power();
    let projector = Projector::new(&model, &power);
    let start = StartWindow::latest(&series, 12).unwrap();
    let scenario = Scenario::preset("drought").unwrap();

    let first = projector.run(&start, &scenario, 24).unwrap();
    let second = projector.run(&start, &scenario, 24).unwrap();
    assert_eq!(first, second);

    let lazy: Vec<_> = projector
        .project(&start, &scenario, 24)
        .unwrap()
        .take(6)
        .map(Result::unwrap)
        .collect();
    assert_eq!(lazy, first.records[..6]);
}

#[test]
fn projection_past_the_model_horizon_is_recursive() {
    let series = monthly_climate(60);
    let model = trained(&series, false);
    let power = power();
    let projector = Projector::new(&model, &power);
    let start = StartWindow::latest(&series, 12).unwrap();
    let result = projector.run(&start, &Scenario::baseline(), 36).unwrap();
    assert_eq!(result.records.len(), 36);
    assert!(result.records.iter().all(|r| r.climate.iter().all(|v| v.is_finite())));
    assert_eq!(result.summary.steps, 36);
}

#[test]
fn uncertainty_yields_bands_around_the_climate() {
    let series = monthly_climate(60);
    let model = trained(&series, true);
    let power = power();
    let projector = Projector::new(&model, &power);
    let start = StartWindow::latest(&series, 12).unwrap();
    let result = projector.run(&start, &Scenario::preset("wetter").unwrap(), 6).unwrap();
    for record in &result.records {
        let band = record.interval.as_ref().unwrap();
        for (f, value) in record.climate.iter().enumerate() {
            assert!(band.lower[f] <= *value && *value <= band.upper[f]);
        }
    }

    let plain = trained(&series, false);
    let projector = Projector::new(&plain, &power);
    let result = projector.run(&start, &Scenario::baseline(), 3).unwrap();
    assert!(result.records.iter().all(|r| r.interval.is_none()));
}

#[test]
fn start_window_needs_enough_history() {
    let series = monthly_climate(6);
    assert!(matches!(
        StartWindow::latest(&series, 12),
        Err(ProjectionError::InsufficientHistory { available: 6, required: 12 })
    ));
}

#[test]
fn unknown_variable_in_custom_scenario() {
    let series = monthly_climate(60);
    let model = trained(&series, false);
    let power = power();
    let projector = Projector::new(&model, &power);
    let start = StartWindow::latest(&series, 12).unwrap();
    let scenario = Scenario::from_json_str(
        r#"{"name": "windy", "adjustments": [{"variable": "wind_speed", "scale": 1.2}]}"#,
    )
    .unwrap();
    assert!(matches!(
        projector.run(&start, &scenario, 3),
        Err(ProjectionError::UnknownVariable { .. })
    ));
}
