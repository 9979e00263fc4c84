use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use stratus_energy::{Site, SitePowerModel, SiteReport};
use stratus_io::{ExperimentName, ResultWriter, SeriesReader, SiteReader};
use stratus_model::{Architecture, ForecastConfig, ForecastModel};
use stratus_project::{Projector, Scenario, StartWindow};
use stratus_series::{ClimateSeries, GapPolicy, Granularity};

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Climate-driven renewable power forecasting under named scenarios")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Where the climate series comes from and how to load it.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the climate CSV file (timestamp column first)
    #[arg(long)]
    data: PathBuf,

    /// Step granularity: "daily", "monthly" or "yearly"
    #[arg(long, default_value = "monthly")]
    granularity: String,

    /// Variable columns to load, comma-separated (defaults to all)
    #[arg(long, value_delimiter = ',')]
    variables: Vec<String>,

    /// Fill missing steps by linear interpolation instead of rejecting the file
    #[arg(long, default_value_t = false)]
    interpolate_gaps: bool,
}

/// Plant efficiencies shared by the site-based commands.
#[derive(Args, Debug, Clone)]
struct PlantArgs {
    /// Path to the site CSV file
    #[arg(long)]
    sites: PathBuf,

    /// Hydro turbine efficiency, within [0.85, 0.95]
    #[arg(long, default_value_t = 0.90)]
    turbine_efficiency: f64,

    /// Geothermal efficiency, within [0.10, 0.25]
    #[arg(long, default_value_t = 0.15)]
    geothermal_efficiency: f64,

    /// Surface temperature (°C) when the climate has no temperature variable
    #[arg(long, default_value_t = 25.0)]
    surface_temp: f64,
}

/// Output location shared by every command.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: ExperimentName,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Train a forecast model on a climate series
    Train {
        #[command(flatten)]
        data: DataArgs,

        /// JSON model config; replaces every model flag below
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input steps per window
        #[arg(long, default_value_t = 12)]
        window_len: usize,

        /// Steps predicted per window
        #[arg(long, default_value_t = 1)]
        horizon: usize,

        /// Recurrent state width
        #[arg(long, default_value_t = 16)]
        hidden_size: usize,

        /// Number of stacked recurrent layers
        #[arg(long, default_value_t = 1)]
        layers: usize,

        /// Model architecture: "elman" or "autoregressive"
        #[arg(long, default_value = "elman")]
        architecture: String,

        /// Training epochs
        #[arg(long, default_value_t = 200)]
        epochs: usize,

        /// Adam learning rate
        #[arg(long, default_value_t = 0.01)]
        learning_rate: f64,

        /// Windows per gradient step
        #[arg(long, default_value_t = 32)]
        batch_size: usize,

        /// Trailing fraction of windows held out for validation
        #[arg(long, default_value_t = 0.2)]
        validation_fraction: f64,

        /// Record residual variance for confidence intervals
        #[arg(long, default_value_t = false)]
        uncertainty: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Score a trained model on every window of a climate series
    Evaluate {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Project climate and power past the end of a series under scenarios
    Project {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        plant: PlantArgs,

        /// Site to project for (defaults to the first row of the site CSV)
        #[arg(long)]
        site: Option<String>,

        /// Scenario preset names or JSON files, comma-separated
        #[arg(long, value_delimiter = ',', default_value = "normal")]
        scenario: Vec<String>,

        /// Number of steps to project
        #[arg(long, default_value_t = 12)]
        steps: usize,

        /// Rainfall per step at which the waterfall runs at its site flow
        #[arg(long)]
        reference_rainfall: Option<f64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Assess the nominal annual output of every site in a CSV
    Sites {
        #[command(flatten)]
        plant: PlantArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    experiment: String,
    n_steps: usize,
    variables: Vec<String>,
    n_windows: usize,
    n_params: usize,
    epochs_run: usize,
    final_train_loss: f64,
    final_validation_loss: f64,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    n_windows: usize,
    mean_absolute_error: f64,
    root_mean_squared_error: f64,
}

#[derive(Serialize)]
struct ProjectOutput {
    experiment: String,
    site: String,
    steps: usize,
    scenarios: Vec<ScenarioOutput>,
}

#[derive(Serialize)]
struct ScenarioOutput {
    scenario: String,
    total_energy_mwh: f64,
    mean_power_w: f64,
    peak_power_w: f64,
    households_served: u64,
}

#[derive(Serialize)]
struct SitesOutput {
    experiment: String,
    n_sites: usize,
    total_power_w: f64,
    total_households: u64,
}

fn parse_granularity(s: &str) -> Result<Granularity> {
    match s {
        "daily" => Ok(Granularity::Daily),
        "monthly" => Ok(Granularity::Monthly),
        "yearly" => Ok(Granularity::Yearly),
        other => anyhow::bail!("unknown granularity: {other} (expected daily, monthly, or yearly)"),
    }
}

fn parse_architecture(s: &str) -> Result<Architecture> {
    match s {
        "elman" => Ok(Architecture::Elman),
        "autoregressive" => Ok(Architecture::Autoregressive),
        other => anyhow::bail!("unknown architecture: {other} (expected elman or autoregressive)"),
    }
}

/// Load the series, restricted to `model_variables` when the model records them.
fn read_series(data: &DataArgs, model_variables: Option<&[String]>) -> Result<ClimateSeries> {
    let mut reader = SeriesReader::new(&data.data, parse_granularity(&data.granularity)?);
    if data.interpolate_gaps {
        reader = reader.with_gap_policy(GapPolicy::Interpolate);
    }
    if !data.variables.is_empty() {
        reader = reader.with_variables(data.variables.clone());
    } else if let Some(vars) = model_variables {
        reader = reader.with_variables(vars.to_vec());
    }
    reader.read().context("failed to read climate CSV")
}

fn power_model(plant: &PlantArgs, site: Site) -> Result<SitePowerModel> {
    let model = SitePowerModel::new(site)
        .with_turbine_efficiency(plant.turbine_efficiency)?
        .with_geothermal_efficiency(plant.geothermal_efficiency)?
        .with_surface_temp(plant.surface_temp);
    Ok(model)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            config,
            window_len,
            horizon,
            hidden_size,
            layers,
            architecture,
            epochs,
            learning_rate,
            batch_size,
            validation_fraction,
            uncertainty,
            output,
        } => {
            // 1. Build the model config
            let forecast_config = match config {
                Some(path) => ForecastConfig::from_json_file(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => ForecastConfig::new(window_len, horizon)?
                    .with_hidden_size(hidden_size)
                    .with_layers(layers)
                    .with_architecture(parse_architecture(&architecture)?)
                    .with_epochs(epochs)
                    .with_learning_rate(learning_rate)
                    .with_batch_size(batch_size)
                    .with_validation_fraction(validation_fraction)
                    .with_seed(cli.seed)
                    .with_uncertainty(uncertainty),
            };

            // 2. Read series and window it
            let series = read_series(&data, None)?;
            let windows: Vec<_> = series
                .windows(forecast_config.window_len(), forecast_config.horizon())?
                .collect();
            info!(n_windows = windows.len(), "windows built");

            // 3. Train
            let model = forecast_config
                .fit(&windows)
                .context("training failed")?
                .with_variables(series.variables().to_vec());

            // 4. Save model and training summary
            let writer = ResultWriter::new(&output.output_dir, output.experiment.clone())?;
            model
                .save(writer.model_path())
                .context("failed to save model")?;
            writer.write_training(model.config(), series.variables(), model.metadata())?;

            // 5. Print summary
            let meta = model.metadata();
            let out = TrainOutput {
                experiment: output.experiment.to_string(),
                n_steps: series.len(),
                variables: series.variables().to_vec(),
                n_windows: meta.n_windows,
                n_params: meta.n_params,
                epochs_run: meta.epochs_run,
                final_train_loss: meta.final_train_loss,
                final_validation_loss: meta.final_validation_loss,
                model_path: writer.model_path(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Evaluate {
            model,
            data,
            output,
        } => {
            // 1. Load model
            let model = ForecastModel::load(&model).context("failed to load model")?;
            info!(
                window_len = model.window_len(),
                horizon = model.horizon(),
                n_features = model.n_features(),
                "model loaded"
            );

            // 2. Read series and window it with the trained shape
            let series = read_series(&data, model.variables())?;
            let windows: Vec<_> = series
                .windows(model.window_len(), model.horizon())?
                .collect();

            // 3. Score
            let metrics = model.evaluate(&windows).context("evaluation failed")?;

            // 4. Write evaluation JSON
            let writer = ResultWriter::new(&output.output_dir, output.experiment.clone())?;
            writer.write_evaluation(model.config(), &metrics)?;

            // 5. Print summary
            let out = EvaluateOutput {
                experiment: output.experiment.to_string(),
                n_windows: metrics.n_windows,
                mean_absolute_error: metrics.mean_absolute_error,
                root_mean_squared_error: metrics.root_mean_squared_error,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Project {
            model,
            data,
            plant,
            site,
            scenario,
            steps,
            reference_rainfall,
            output,
        } => {
            // 1. Load model and history
            let model = ForecastModel::load(&model).context("failed to load model")?;
            let series = read_series(&data, model.variables())?;
            let start = StartWindow::latest(&series, model.window_len())
                .context("failed to take the starting window")?;

            // 2. Pick the site and build its power model
            let sites = SiteReader::new(&plant.sites)
                .read()
                .context("failed to read site CSV")?;
            let chosen = match &site {
                Some(name) => sites
                    .into_iter()
                    .find(|s| &s.location_name == name)
                    .with_context(|| format!("site \"{name}\" not found"))?,
                None => sites
                    .into_iter()
                    .next()
                    .context("site CSV has no rows")?,
            };
            let site_name = chosen.location_name.clone();
            let mut power = power_model(&plant, chosen)?;
            if let Some(rainfall) = reference_rainfall {
                power = power.with_reference_rainfall(rainfall)?;
            }

            // 3. Resolve scenarios
            let scenarios = scenario
                .iter()
                .map(|s| {
                    Scenario::from_name_or_path(s)
                        .with_context(|| format!("failed to load scenario {s}"))
                })
                .collect::<Result<Vec<_>>>()?;

            // 4. Project
            let results = Projector::new(&model, &power)
                .run_all(&start, &scenarios, steps)
                .context("projection failed")?;

            // 5. Write forecast JSON and CSV
            let writer = ResultWriter::new(&output.output_dir, output.experiment.clone())?;
            writer.write_forecast(&results)?;

            // 6. Print summary
            let out = ProjectOutput {
                experiment: output.experiment.to_string(),
                site: site_name,
                steps,
                scenarios: results
                    .iter()
                    .map(|r| ScenarioOutput {
                        scenario: r.scenario.clone(),
                        total_energy_mwh: r.summary.total_energy_mwh,
                        mean_power_w: r.summary.mean_power_w,
                        peak_power_w: r.summary.peak_power_w,
                        households_served: r.summary.households_served,
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::Sites { plant, output } => {
            // 1. Read sites
            let sites = SiteReader::new(&plant.sites)
                .read()
                .context("failed to read site CSV")?;

            // 2. Assess each at nominal conditions
            let reports = sites
                .into_iter()
                .map(|site| {
                    let name = site.location_name.clone();
                    let model = power_model(&plant, site)?;
                    SiteReport::assess(&model)
                        .with_context(|| format!("failed to assess site \"{name}\""))
                })
                .collect::<Result<Vec<_>>>()?;

            // 3. Write sites JSON
            let writer = ResultWriter::new(&output.output_dir, output.experiment.clone())?;
            writer.write_sites(&reports)?;

            // 4. Print summary
            let out = SitesOutput {
                experiment: output.experiment.to_string(),
                n_sites: reports.len(),
                total_power_w: reports.iter().map(|r| r.power.total_w()).sum(),
                total_households: reports.iter().map(|r| r.households_served).sum(),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
