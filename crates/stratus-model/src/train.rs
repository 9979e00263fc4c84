//! Seeded mini-batch training with a chronological validation split.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use stratus_series::{Scaler, SeriesView, Window};
use tracing::{debug, info, instrument};

use crate::config::ForecastConfig;
use crate::error::TrainingError;
use crate::model::ForecastModel;
use crate::network::{Network, NetworkShape};
use crate::optim::Adam;
use crate::result::{EpochLoss, TrainingMetadata};

/// Global gradient norm above which a batch gradient is rescaled.
const MAX_GRAD_NORM: f64 = 5.0;

/// One z-scored window: flattened input and target.
struct Sample {
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Check every window against the config; returns the shared feature count.
fn check_windows(config: &ForecastConfig, windows: &[Window<'_>]) -> Result<usize, TrainingError> {
    let Some(first) = windows.first() else {
        return Err(TrainingError::EmptyWindows);
    };
    let n_features = first.input().n_features();
    for (window, w) in windows.iter().enumerate() {
        for view in [w.input(), w.target()] {
            if view.n_features() != n_features {
                return Err(TrainingError::FeatureCount {
                    window,
                    expected: n_features,
                    got: view.n_features(),
                });
            }
        }
        if w.input().steps() != config.window_len {
            return Err(TrainingError::WindowShape {
                window,
                part: "input",
                expected: config.window_len,
                got: w.input().steps(),
            });
        }
        if w.target().steps() != config.horizon {
            return Err(TrainingError::WindowShape {
                window,
                part: "target",
                expected: config.horizon,
                got: w.target().steps(),
            });
        }
    }
    Ok(n_features)
}

fn to_samples(scaler: &Scaler, windows: &[Window<'_>]) -> Vec<Sample> {
    windows
        .iter()
        .map(|w| Sample {
            x: scaler.transform(w.input().as_slice()),
            y: scaler.transform(w.target().as_slice()),
        })
        .collect()
}

fn mean_loss(network: &Network, samples: &[Sample]) -> f64 {
    let losses: Vec<f64> = samples
        .par_iter()
        .map(|s| {
            let y = network.predict(&s.x);
            y.iter().zip(&s.y).map(|(a, b)| (a - b).powi(2)).sum::<f64>() / y.len() as f64
        })
        .collect();
    losses.iter().sum::<f64>() / samples.len() as f64
}

fn clip(grad: &mut [f64]) {
    let norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
    if norm.is_finite() && norm > MAX_GRAD_NORM {
        let scale = MAX_GRAD_NORM / norm;
        for g in grad.iter_mut() {
            *g *= scale;
        }
    }
}

/// Per-output mean squared residual on `windows`, in physical units.
fn residual_variance(network: &Network, scaler: &Scaler, windows: &[Window<'_>]) -> Vec<f64> {
    let residuals: Vec<Vec<f64>> = windows
        .par_iter()
        .map(|w| {
            let pred = scaler.inverse(&network.predict(&scaler.transform(w.input().as_slice())));
            pred.iter()
                .zip(w.target().as_slice())
                .map(|(p, t)| (p - t).powi(2))
                .collect()
        })
        .collect();
    let n_out = network.shape().n_outputs();
    let mut variance = vec![0.0; n_out];
    for r in &residuals {
        for (v, e) in variance.iter_mut().zip(r) {
            *v += e;
        }
    }
    for v in &mut variance {
        *v /= residuals.len() as f64;
    }
    variance
}

/// Train a forecast model on chronologically ordered windows.
///
/// The last `round(n × validation_fraction)` windows are held out for
/// validation; the scaler is fitted on the training windows only. A
/// [`ChaCha8Rng`] seeded from the config drives weight initialisation and
/// the per-epoch shuffle. Per-sample gradients are computed in parallel
/// and summed in window order, so identical inputs give bit-identical models
/// regardless of thread count.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`TrainingError::Config`] | The config fails validation |
/// | [`TrainingError::EmptyWindows`] | `windows` is empty |
/// | [`TrainingError::FeatureCount`] | Windows disagree on the number of variables |
/// | [`TrainingError::WindowShape`] | A window's input or target length differs from the config |
/// | [`TrainingError::EmptySplit`] | Training or validation side would have zero windows |
/// | [`TrainingError::NonFiniteLoss`] | The loss became NaN or infinite |
#[instrument(skip_all, fields(n_windows = windows.len(), window_len = config.window_len, horizon = config.horizon))]
pub fn train(config: &ForecastConfig, windows: &[Window<'_>]) -> Result<ForecastModel, TrainingError> {
    config.validate()?;
    let n_features = check_windows(config, windows)?;

    let n_windows = windows.len();
    let n_validation = ((n_windows as f64) * config.validation_fraction).round() as usize;
    let n_train = n_windows.saturating_sub(n_validation);
    if n_train == 0 || n_validation == 0 {
        return Err(TrainingError::EmptySplit {
            n_windows,
            n_train,
            n_validation,
        });
    }
    let (train_windows, validation_windows) = windows.split_at(n_train);

    let views: Vec<SeriesView<'_>> = train_windows
        .iter()
        .flat_map(|w| [w.input(), w.target()])
        .collect();
    let scaler = Scaler::fit(n_features, &views).ok_or(TrainingError::EmptyWindows)?;
    let train_set = to_samples(&scaler, train_windows);
    let validation_set = to_samples(&scaler, validation_windows);

    let shape = NetworkShape {
        architecture: config.architecture,
        n_features,
        window_len: config.window_len,
        horizon: config.horizon,
        hidden_size: config.hidden_size,
        layers: config.layers,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut network = Network::init(shape, &mut rng);
    let mut adam = Adam::new(shape.n_params(), config.learning_rate);

    info!(
        n_train,
        n_validation,
        n_features,
        n_params = shape.n_params(),
        architecture = ?config.architecture,
        epochs = config.epochs,
        "training forecast model"
    );

    let mut order: Vec<usize> = (0..n_train).collect();
    let mut history = Vec::with_capacity(config.epochs);
    for epoch in 0..config.epochs {
        order.shuffle(&mut rng);
        let mut epoch_loss = 0.0;

        for batch in order.chunks(config.batch_size) {
            let per_sample: Vec<(Vec<f64>, f64)> = batch
                .par_iter()
                .map(|&i| network.gradient(&train_set[i].x, &train_set[i].y))
                .collect();

            let mut grad = vec![0.0; shape.n_params()];
            let mut batch_loss = 0.0;
            for (g, loss) in &per_sample {
                batch_loss += loss;
                for (acc, v) in grad.iter_mut().zip(g) {
                    *acc += v;
                }
            }
            if !batch_loss.is_finite() {
                return Err(TrainingError::NonFiniteLoss { epoch });
            }
            epoch_loss += batch_loss;

            let scale = 1.0 / batch.len() as f64;
            for g in &mut grad {
                *g *= scale;
            }
            clip(&mut grad);
            adam.step(network.params_mut(), &grad);
        }

        let train_loss = epoch_loss / n_train as f64;
        let validation_loss = mean_loss(&network, &validation_set);
        if !validation_loss.is_finite() {
            return Err(TrainingError::NonFiniteLoss { epoch });
        }
        debug!(epoch, train_loss, validation_loss, "epoch complete");
        history.push(EpochLoss {
            epoch,
            train_loss,
            validation_loss,
        });
    }

    let residual_variance = config
        .uncertainty
        .then(|| residual_variance(&network, &scaler, validation_windows));
    let last = history.last().copied().unwrap_or(EpochLoss {
        epoch: 0,
        train_loss: f64::NAN,
        validation_loss: f64::NAN,
    });

    let metadata = TrainingMetadata {
        n_windows,
        n_train,
        n_validation,
        n_features,
        n_params: shape.n_params(),
        epochs_run: history.len(),
        final_train_loss: last.train_loss,
        final_validation_loss: last.validation_loss,
        residual_variance,
        history,
    };

    info!(
        train_loss = metadata.final_train_loss,
        validation_loss = metadata.final_validation_loss,
        "forecast model training complete"
    );

    Ok(ForecastModel {
        config: config.clone(),
        network,
        scaler,
        variables: None,
        metadata,
    })
}
