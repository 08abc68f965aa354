// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Training and evaluation controller.
//!
//! [`train`] validates both splits, learns the normalizer from the training
//! split only, fits the network with Adam over shuffled mini-batches on the
//! autodiff backend, and scores the held-out split. The test split is used for
//! monitoring and the final report; it never influences a parameter update.

#![allow(clippy::cast_precision_loss)]

use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::{Distribution, ElementConversion, Tensor};
use ndarray::{Array2, ArrayView2, Axis};

use crate::catalog::ClassCatalog;
use crate::classifier::SignClassifier;
use crate::dataset::Dataset;
use crate::error::{Result, SignError};
use crate::info;
use crate::landmarks::FEATURE_DIM;
use crate::metrics::ClassificationReport;
use crate::nn::{
    Device, InferBackend, ModelSpec, SignNet, TrainBackend, labels_tensor, lock_backend_rng,
    to_array, to_tensor,
};
use crate::normalizer::Scaler;
use crate::results::argmax;

/// Training hyper-parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Full passes over the training split.
    pub epochs: usize,
    /// Samples per gradient step.
    pub batch_size: usize,
    /// Adam step size.
    pub learning_rate: f32,
    /// Adam first and second moment decay.
    pub betas: (f32, f32),
    /// Adam denominator epsilon.
    pub epsilon: f32,
    /// Reshuffle the training split every epoch.
    pub shuffle: bool,
    /// Seed for weight init, dropout and shuffling.
    pub seed: u64,
    /// Print one line per epoch.
    pub verbose: bool,
    /// Hidden layer stack.
    pub model: ModelSpec,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            batch_size: 16,
            learning_rate: 0.001,
            betas: (0.9, 0.999),
            epsilon: 1e-7,
            shuffle: true,
            seed: 42,
            verbose: true,
            model: ModelSpec::reference(),
        }
    }
}

impl TrainConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of epochs.
    #[must_use]
    pub const fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the mini-batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the Adam learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable per-epoch shuffling.
    #[must_use]
    pub const fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Enable or disable per-epoch logging.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Replace the hidden layer stack.
    #[must_use]
    pub fn with_model(mut self, model: ModelSpec) -> Self {
        self.model = model;
        self
    }

    /// Check hyper-parameters.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for zero epochs or batch size, a
    /// non-positive learning rate, or betas outside [0, 1).
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(SignError::ConfigError("epochs must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(SignError::ConfigError("batch size must be at least 1".to_string()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(SignError::ConfigError(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        let (b1, b2) = self.betas;
        if !(0.0..1.0).contains(&b1) || !(0.0..1.0).contains(&b2) {
            return Err(SignError::ConfigError(format!(
                "Adam betas must be in [0, 1), got ({b1}, {b2})"
            )));
        }
        self.model.validate()
    }
}

/// Loss and accuracy after one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    /// One-based epoch number.
    pub epoch: usize,
    /// Mean training loss (with dropout active).
    pub loss: f32,
    /// Training accuracy (with dropout active).
    pub accuracy: f32,
    /// Held-out loss.
    pub val_loss: f32,
    /// Held-out accuracy.
    pub val_accuracy: f32,
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// The trained bundle.
    pub classifier: SignClassifier,
    /// Per-epoch statistics.
    pub history: Vec<EpochStats>,
    /// Report on the held-out split.
    pub report: ClassificationReport,
}

fn check_split(name: &str, split: &Dataset, num_classes: usize) -> Result<()> {
    if split.is_empty() {
        return Err(SignError::ConfigError(format!(
            "{name} split is empty; no images with a detected hand were found"
        )));
    }
    split.check_labels(num_classes).map_err(|e| match e {
        SignError::ConfigError(msg) => SignError::ConfigError(format!("{name} split: {msg}")),
        other => other,
    })
}

/// Train a classifier and evaluate it on the held-out split.
///
/// # Errors
///
/// Returns a configuration error if either split is empty, a label is outside
/// the catalog, or a hyper-parameter is invalid; a numeric error if the
/// normalizer cannot be fit or the loss diverges. All checks run before the
/// first parameter update.
pub fn train(
    catalog: &ClassCatalog,
    train_split: &Dataset,
    test_split: &Dataset,
    config: &TrainConfig,
) -> Result<TrainingOutcome> {
    config.validate()?;
    check_split("training", train_split, catalog.len())?;
    check_split("test", test_split, catalog.len())?;

    let scaler = Scaler::fit(&train_split.features())?;
    let x_train = scaler.apply(&train_split.features());
    let x_test = scaler.apply(&test_split.features());

    let device = Device::default();
    let _rng = lock_backend_rng(config.seed);
    let mut model: SignNet<TrainBackend> =
        config.model.init(FEATURE_DIM, catalog.len(), &device)?;
    let (beta_1, beta_2) = config.betas;
    let mut optim = AdamConfig::new()
        .with_beta_1(beta_1)
        .with_beta_2(beta_2)
        .with_epsilon(config.epsilon)
        .init::<TrainBackend, SignNet<TrainBackend>>();
    let loss_fn = CrossEntropyLossConfig::new().init(&device);

    let mut order: Vec<usize> = (0..train_split.len()).collect();
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        if config.shuffle {
            order = permutation(train_split.len(), &device);
        }

        let mut loss_sum = 0.0_f32;
        let mut correct = 0_usize;
        for batch in order.chunks(config.batch_size) {
            let x = x_train.select(Axis(0), batch);
            let y: Vec<usize> = batch.iter().map(|&i| train_split.labels()[i]).collect();

            let logits = model.forward(to_tensor(&x.view(), &device));
            let loss = loss_fn.forward(logits.clone(), labels_tensor(&y, &device));
            let value: f32 = loss.clone().into_scalar().elem();
            if !value.is_finite() {
                return Err(SignError::NumericError(format!(
                    "training loss became {value} in epoch {epoch}"
                )));
            }
            loss_sum += value * y.len() as f32;
            correct += count_correct(&to_array(logits), &y);

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(f64::from(config.learning_rate), model, grads);
        }

        let (val_loss, val_accuracy) = score(&model.valid(), &x_test.view(), test_split.labels());
        let stats = EpochStats {
            epoch,
            loss: loss_sum / train_split.len() as f32,
            accuracy: correct as f32 / train_split.len() as f32,
            val_loss,
            val_accuracy,
        };
        if config.verbose {
            info!(
                "Epoch {}/{} - loss: {:.4} - accuracy: {:.4} - val_loss: {:.4} - val_accuracy: {:.4}",
                stats.epoch,
                config.epochs,
                stats.loss,
                stats.accuracy,
                stats.val_loss,
                stats.val_accuracy
            );
        }
        history.push(stats);
    }

    let classifier =
        SignClassifier::new(catalog.clone(), scaler, config.model.clone(), model.valid())?;
    let report = evaluate(&classifier, test_split)?;

    Ok(TrainingOutcome {
        classifier,
        history,
        report,
    })
}

/// Score a trained classifier on a labeled split.
///
/// # Errors
///
/// Returns a configuration error if the split is empty or has labels outside
/// the classifier's catalog.
pub fn evaluate(classifier: &SignClassifier, split: &Dataset) -> Result<ClassificationReport> {
    check_split("evaluation", split, classifier.classes().len())?;
    let predicted = classifier.predict_batch(&split.features());
    ClassificationReport::compute(split.labels(), &predicted, classifier.classes())
}

/// Uniformly shuffled `0..n`, drawn from the backend RNG.
fn permutation(n: usize, device: &Device) -> Vec<usize> {
    Tensor::<InferBackend, 1>::random([n], Distribution::Default, device)
        .argsort(0)
        .into_data()
        .iter::<i64>()
        .map(|i| usize::try_from(i).unwrap_or_default())
        .collect()
}

fn count_correct(scores: &Array2<f32>, labels: &[usize]) -> usize {
    scores
        .axis_iter(Axis(0))
        .zip(labels)
        .filter(|(row, label)| argmax(row) == **label)
        .count()
}

fn score(model: &SignNet<InferBackend>, x: &ArrayView2<'_, f32>, labels: &[usize]) -> (f32, f32) {
    let device = Device::default();
    let logits = model.forward(to_tensor(x, &device));
    let loss: f32 = CrossEntropyLossConfig::new()
        .init(&device)
        .forward(logits.clone(), labels_tensor(labels, &device))
        .into_scalar()
        .elem();
    let accuracy = count_correct(&to_array(logits), labels) as f32 / labels.len().max(1) as f32;
    (loss, accuracy)
}
