//! JSON and CSV result writer for training, evaluation, projection and site outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use stratus_energy::{PowerEstimate, SiteReport};
use stratus_model::{EpochLoss, EvaluationMetrics, ForecastConfig, TrainingMetadata};
use stratus_project::{AdjustmentTarget, ForecastResult, ForecastSummary};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes pipeline results into one output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_train.json`,
/// `{experiment}_evaluate.json`, `{experiment}_forecast.json`,
/// `{experiment}_forecast.csv` and `{experiment}_sites.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn path(&self, kind: &str, extension: &str) -> PathBuf {
        self.output_dir.join(self.experiment.artifact(kind, extension))
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).expect("serialization cannot fail");
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the training config and metadata to `{experiment}_train.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_training(
        &self,
        config: &ForecastConfig,
        variables: &[String],
        metadata: &TrainingMetadata,
    ) -> Result<(), IoError> {
        let path = self.path("train", "json");
        let artifact = TrainArtifact {
            experiment: self.experiment.as_str(),
            config,
            variables,
            n_windows: metadata.n_windows,
            n_train: metadata.n_train,
            n_validation: metadata.n_validation,
            n_params: metadata.n_params,
            epochs_run: metadata.epochs_run,
            final_train_loss: metadata.final_train_loss,
            final_validation_loss: metadata.final_validation_loss,
            residual_variance: metadata.residual_variance.as_deref(),
            history: &metadata.history,
        };
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "training summary written");
        Ok(())
    }

    /// Write evaluation metrics to `{experiment}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_evaluation(
        &self,
        config: &ForecastConfig,
        metrics: &EvaluationMetrics,
    ) -> Result<(), IoError> {
        let path = self.path("evaluate", "json");
        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            window_len: config.window_len(),
            horizon: config.horizon(),
            mean_absolute_error: metrics.mean_absolute_error,
            root_mean_squared_error: metrics.root_mean_squared_error,
            n_windows: metrics.n_windows,
            n_values: metrics.n_values,
        };
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "evaluation result written");
        Ok(())
    }

    /// Write scenario projections to `{experiment}_forecast.json` (summaries
    /// and records) and `{experiment}_forecast.csv` (one row per record).
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] or [`IoError::CsvWrite`] if a file
    /// cannot be written.
    #[instrument(skip_all, fields(n_scenarios = results.len()))]
    pub fn write_forecast(&self, results: &[ForecastResult]) -> Result<(), IoError> {
        let json_path = self.path("forecast", "json");
        let artifact = ForecastArtifact {
            experiment: self.experiment.as_str(),
            scenarios: results
                .iter()
                .map(|r| ScenarioEntry {
                    scenario: &r.scenario,
                    target: r.target,
                    granularity: r.granularity.name(),
                    variables: &r.variables,
                    summary: &r.summary,
                    records: r
                        .records
                        .iter()
                        .map(|rec| RecordEntry {
                            label: &rec.label,
                            climate: &rec.climate,
                            lower: rec.interval.as_ref().map(|b| b.lower.as_slice()),
                            upper: rec.interval.as_ref().map(|b| b.upper.as_slice()),
                            power: &rec.power,
                            total_w: rec.power.total_w(),
                            energy_mwh: rec.energy_mwh,
                        })
                        .collect(),
                })
                .collect(),
        };
        self.write_json(&json_path, &artifact)?;

        let csv_path = self.path("forecast", "csv");
        self.write_forecast_csv(&csv_path, results)
            .map_err(|source| IoError::CsvWrite {
                path: csv_path.clone(),
                source,
            })?;

        info!(
            json = %json_path.display(),
            csv = %csv_path.display(),
            "forecast written"
        );
        Ok(())
    }

    /// Columns: scenario, label, one per variable, then a lower/upper pair
    /// per variable when any record carries an interval, then power columns.
    fn write_forecast_csv(&self, path: &Path, results: &[ForecastResult]) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_path(path)?;
        let variables: &[String] = results.first().map_or(&[][..], |r| r.variables.as_slice());
        let with_interval = results
            .iter()
            .flat_map(|r| &r.records)
            .any(|rec| rec.interval.is_some());

        let mut header = vec!["scenario".to_string(), "label".to_string()];
        header.extend(variables.iter().cloned());
        if with_interval {
            for v in variables {
                header.push(format!("{v}_lower"));
                header.push(format!("{v}_upper"));
            }
        }
        header.extend(
            ["waterfall_w", "geothermal_w", "waste_recovery_w", "total_w", "energy_mwh"]
                .map(String::from),
        );
        wtr.write_record(&header)?;

        for result in results {
            for rec in &result.records {
                let mut row = vec![result.scenario.clone(), rec.label.clone()];
                row.extend(rec.climate.iter().map(f64::to_string));
                if with_interval {
                    for f in 0..rec.climate.len() {
                        let (lo, hi) = rec
                            .interval
                            .as_ref()
                            .map_or((String::new(), String::new()), |b| {
                                (b.lower[f].to_string(), b.upper[f].to_string())
                            });
                        row.push(lo);
                        row.push(hi);
                    }
                }
                let PowerEstimate {
                    waterfall_w,
                    geothermal_w,
                    waste_recovery_w,
                } = rec.power;
                row.extend(
                    [
                        waterfall_w,
                        geothermal_w,
                        waste_recovery_w,
                        rec.power.total_w(),
                        rec.energy_mwh,
                    ]
                    .map(|v| v.to_string()),
                );
                wtr.write_record(&row)?;
            }
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write nominal site assessments to `{experiment}_sites.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_sites = reports.len()))]
    pub fn write_sites(&self, reports: &[SiteReport]) -> Result<(), IoError> {
        let path = self.path("sites", "json");
        let artifact = SitesArtifact {
            experiment: self.experiment.as_str(),
            n_sites: reports.len(),
            total_power_w: reports.iter().map(|r| r.power.total_w()).sum(),
            total_households: reports.iter().map(|r| r.households_served).sum(),
            sites: reports,
        };
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "site assessments written");
        Ok(())
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything. Computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.path("model", "bin")
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct TrainArtifact<'a> {
    experiment: &'a str,
    config: &'a ForecastConfig,
    variables: &'a [String],
    n_windows: usize,
    n_train: usize,
    n_validation: usize,
    n_params: usize,
    epochs_run: usize,
    final_train_loss: f64,
    final_validation_loss: f64,
    residual_variance: Option<&'a [f64]>,
    history: &'a [EpochLoss],
}

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    experiment: &'a str,
    window_len: usize,
    horizon: usize,
    mean_absolute_error: f64,
    root_mean_squared_error: f64,
    n_windows: usize,
    n_values: usize,
}

#[derive(Serialize)]
struct ForecastArtifact<'a> {
    experiment: &'a str,
    scenarios: Vec<ScenarioEntry<'a>>,
}

#[derive(Serialize)]
struct ScenarioEntry<'a> {
    scenario: &'a str,
    target: AdjustmentTarget,
    granularity: &'static str,
    variables: &'a [String],
    summary: &'a ForecastSummary,
    records: Vec<RecordEntry<'a>>,
}

#[derive(Serialize)]
struct RecordEntry<'a> {
    label: &'a str,
    climate: &'a [f64],
    #[serde(skip_serializing_if = "Option::is_none")]
    lower: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upper: Option<&'a [f64]>,
    power: &'a PowerEstimate,
    total_w: f64,
    energy_mwh: f64,
}

#[derive(Serialize)]
struct SitesArtifact<'a> {
    experiment: &'a str,
    n_sites: usize,
    total_power_w: f64,
    total_households: u64,
    sites: &'a [SiteReport],
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stratus_project::{ConfidenceBand, ForecastRecord};
    use stratus_series::Granularity;
    use tempfile::TempDir;

    fn result(scenario: &str, with_interval: bool) -> ForecastResult {
        let records = (0..3)
            .map(|i| {
                let power = PowerEstimate::new(1.0e6 * (i + 1) as f64, 5.0e5);
                ForecastRecord {
                    step: i,
                    timestamp: NaiveDate::from_ymd_opt(2025, 1 + i as u32, 1).unwrap(),
                    label: format!("2025-{:02}", i + 1),
                    climate: vec![25.0, 100.0 + i as f64],
                    energy_mwh: power.energy_mwh(730.0),
                    power,
                    interval: with_interval.then(|| ConfidenceBand {
                        lower: vec![24.0, 90.0],
                        upper: vec![26.0, 110.0],
                    }),
                }
            })
            .collect();
        ForecastResult::new(
            scenario.into(),
            AdjustmentTarget::Output,
            vec!["tem".into(), "rain".into()],
            Granularity::Monthly,
            records,
        )
    }

    fn writer(dir: &TempDir, name: &str) -> ResultWriter {
        ResultWriter::new(dir.path(), ExperimentName::new(name.into()).unwrap()).unwrap()
    }

    #[test]
    fn write_forecast_json_structure() {
        let dir = TempDir::new().unwrap();
        writer(&dir, "fc")
            .write_forecast(&[result("normal", false), result("wetter", false)])
            .unwrap();

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("fc_forecast.json")).unwrap())
                .unwrap();
        assert_eq!(content["experiment"], "fc");
        let scenarios = content["scenarios"].as_array().unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[1]["scenario"], "wetter");
        assert_eq!(scenarios[0]["granularity"], "monthly");
        assert_eq!(scenarios[0]["target"], "output");
        assert_eq!(scenarios[0]["summary"]["steps"], 3);
        let records = scenarios[0]["records"].as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["label"], "2025-01");
        assert!(records[0].get("lower").is_none());
        assert!(records[0]["power"]["waterfall_w"].is_number());
    }

    #[test]
    fn write_forecast_csv_rows() {
        let dir = TempDir::new().unwrap();
        writer(&dir, "fc")
            .write_forecast(&[result("normal", true), result("drier", true)])
            .unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("fc_forecast.csv")).unwrap();
        let header: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            header,
            [
                "scenario", "label", "tem", "rain", "tem_lower", "tem_upper", "rain_lower",
                "rain_upper", "waterfall_w", "geothermal_w", "waste_recovery_w", "total_w",
                "energy_mwh"
            ]
        );
        let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 6);
        assert_eq!(&rows[3][0], "drier");
        assert_eq!(&rows[1][3], "101");
        assert_eq!(&rows[0][6], "90");
    }

    #[test]
    fn write_evaluation_json() {
        let dir = TempDir::new().unwrap();
        let config = ForecastConfig::new(12, 1).unwrap();
        let metrics = EvaluationMetrics {
            mean_absolute_error: 1.5,
            root_mean_squared_error: 2.0,
            n_windows: 10,
            n_values: 20,
        };
        writer(&dir, "ev").write_evaluation(&config, &metrics).unwrap();
        let content: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("ev_evaluate.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(content["window_len"], 12);
        assert_eq!(content["mean_absolute_error"], 1.5);
        assert_eq!(content["n_values"], 20);
    }

    #[test]
    fn writer_creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let w = ResultWriter::new(&nested, ExperimentName::new("nest".into()).unwrap()).unwrap();
        w.write_sites(&[]).unwrap();
        assert!(nested.join("nest_sites.json").exists());
        assert_eq!(w.model_path(), nested.join("nest_model.bin"));
    }
}
