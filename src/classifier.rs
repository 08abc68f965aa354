// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The trained classifier bundle.
//!
//! A [`SignClassifier`] owns everything inference needs: the class catalog it
//! was trained on, the normalizer divisor learned from training data, the
//! network architecture and its weights. It is produced by training and loaded
//! read-only by the inference loop.
//!
//! On disk a bundle is two files side by side:
//!
//! ```text
//! sign_model.json          manifest: version, catalog, divisor, architecture
//! sign_model_weights.json  Burn record of the network parameters
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, PrettyJsonFileRecorder};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::catalog::ClassCatalog;
use crate::error::{Result, SignError};
use crate::landmarks::{FEATURE_DIM, FeatureVector};
use crate::nn::{Device, InferBackend, ModelSpec, SignNet, to_array, to_tensor};
use crate::normalizer::Scaler;
use crate::results::{Prediction, Probs, argmax};

/// Current on-disk bundle format.
pub const FORMAT_VERSION: u32 = 2;

/// Suffix appended to the manifest stem for the weights file.
const WEIGHTS_SUFFIX: &str = "_weights";

type WeightsRecorder = PrettyJsonFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    classes: ClassCatalog,
    scaler: Scaler,
    model: ModelSpec,
    /// Weights file name, relative to the manifest.
    weights: String,
}

/// Trained classifier: catalog, normalizer and network in one artifact.
#[derive(Debug, Clone)]
pub struct SignClassifier {
    classes: ClassCatalog,
    scaler: Scaler,
    model: ModelSpec,
    network: SignNet<InferBackend>,
}

impl SignClassifier {
    /// Assemble a bundle.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the network does not take 63 inputs or
    /// its output width differs from the catalog size.
    pub fn new(
        classes: ClassCatalog,
        scaler: Scaler,
        model: ModelSpec,
        network: SignNet<InferBackend>,
    ) -> Result<Self> {
        let bundle = Self {
            classes,
            scaler,
            model,
            network,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    fn validate(&self) -> Result<()> {
        self.model.validate()?;
        if self.network.depth() != self.model.hidden.len() {
            return Err(SignError::ConfigError(format!(
                "network has {} hidden layers but the architecture lists {}",
                self.network.depth(),
                self.model.hidden.len()
            )));
        }
        if self.network.input_dim() != FEATURE_DIM {
            return Err(SignError::ConfigError(format!(
                "classifier expects {} features, landmarks produce {FEATURE_DIM}",
                self.network.input_dim()
            )));
        }
        if self.network.output_dim() != self.classes.len() {
            return Err(SignError::ConfigError(format!(
                "classifier has {} outputs but the catalog lists {} classes",
                self.network.output_dim(),
                self.classes.len()
            )));
        }
        Ok(())
    }

    /// Class catalog the network was trained on.
    #[must_use]
    pub const fn classes(&self) -> &ClassCatalog {
        &self.classes
    }

    /// Normalizer learned from the training split.
    #[must_use]
    pub const fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    /// Hidden-layer architecture.
    #[must_use]
    pub const fn model(&self) -> &ModelSpec {
        &self.model
    }

    /// Network module.
    #[must_use]
    pub const fn network(&self) -> &SignNet<InferBackend> {
        &self.network
    }

    /// Classify one raw (unnormalized) feature vector.
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        let input = self.scaler.apply_features(features).insert_axis(Axis(0));
        let row = self.probs_normalized(&input.view()).index_axis_move(Axis(0), 0);
        let probs = Probs::new(row);
        let class_index = probs.top1();
        let label = self.classes.name(class_index).unwrap_or_default().to_string();
        Prediction {
            class_index,
            label,
            probs,
        }
    }

    /// Probability rows for a raw feature matrix (one sample per row).
    #[must_use]
    pub fn predict_probs(&self, features: &ArrayView2<'_, f32>) -> Array2<f32> {
        let input = self.scaler.apply(features);
        self.probs_normalized(&input.view())
    }

    /// Predicted class index for every row of a raw feature matrix.
    #[must_use]
    pub fn predict_batch(&self, features: &ArrayView2<'_, f32>) -> Vec<usize> {
        self.predict_probs(features)
            .axis_iter(Axis(0))
            .map(|row| argmax(&row))
            .collect()
    }

    fn probs_normalized(&self, input: &ArrayView2<'_, f32>) -> Array2<f32> {
        if input.nrows() == 0 {
            return Array2::zeros((0, self.classes.len()));
        }
        let device = Device::default();
        to_array(self.network.probs(to_tensor(input, &device)))
    }

    /// Path of the weights file that accompanies the manifest at `path`.
    #[must_use]
    pub fn weights_path(path: &Path) -> PathBuf {
        weights_stem(path).with_extension("json")
    }

    /// Write the manifest to `path` and the weights next to it.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                SignError::io(format!("Failed to create directory {}", parent.display()), e)
            })?;
        }

        let stem = weights_stem(path);
        self.network
            .clone()
            .save_file(stem.clone(), &WeightsRecorder::new())
            .map_err(|e| {
                SignError::SerializationError(format!(
                    "Failed to write weights {}: {e:?}",
                    stem.display()
                ))
            })?;

        let manifest = Manifest {
            version: FORMAT_VERSION,
            classes: self.classes.clone(),
            scaler: self.scaler,
            model: self.model.clone(),
            weights: file_name(&Self::weights_path(path)),
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(path, json)
            .map_err(|e| SignError::io(format!("Failed to write {}", path.display()), e))
    }

    /// Read and validate a bundle written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns an error if a file is unreadable or malformed, the manifest is
    /// from another format version, or the weights do not fit the catalog.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| SignError::io(format!("Failed to read {}", path.display()), e))?;
        let manifest: Manifest = serde_json::from_str(&json)?;
        if manifest.version != FORMAT_VERSION {
            return Err(SignError::SerializationError(format!(
                "unsupported classifier format version {} (expected {FORMAT_VERSION})",
                manifest.version
            )));
        }

        let weights = path
            .with_file_name(&manifest.weights)
            .with_extension("");
        let device = Device::default();
        let network = manifest
            .model
            .layers::<InferBackend>(FEATURE_DIM, manifest.classes.len(), &device)?
            .load_file(weights.clone(), &WeightsRecorder::new(), &device)
            .map_err(|e| {
                SignError::SerializationError(format!(
                    "Failed to load weights {}: {e:?}",
                    weights.display()
                ))
            })?;

        Self::new(manifest.classes, manifest.scaler, manifest.model, network)
    }
}

/// `dir/sign_model.json` -> `dir/sign_model_weights` (the recorder adds `.json`).
fn weights_stem(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "model".into(), |s| s.to_string_lossy());
    path.with_file_name(format!("{stem}{WEIGHTS_SUFFIX}"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::constant_logits;

    fn catalog() -> ClassCatalog {
        ClassCatalog::new(["A", "B", "C"]).unwrap()
    }

    fn bias_only(logits: [f32; 3]) -> SignClassifier {
        SignClassifier::new(
            catalog(),
            Scaler::from_divisor(1.0).unwrap(),
            ModelSpec { hidden: Vec::new() },
            constant_logits(FEATURE_DIM, &logits),
        )
        .unwrap()
    }

    fn reference(classes: usize, seed: u64) -> SignNet<InferBackend> {
        ModelSpec::reference()
            .build(FEATURE_DIM, classes, seed, &Default::default())
            .unwrap()
    }

    fn sample_inputs() -> Array2<f32> {
        #[allow(clippy::cast_precision_loss)]
        Array2::from_shape_fn((4, FEATURE_DIM), |(i, j)| ((i * 7 + j) as f32 * 0.13).cos())
    }

    #[test]
    fn test_ties_resolve_to_lower_index() {
        let features = FeatureVector::from_slice(&[0.5; FEATURE_DIM]).unwrap();

        let prediction = bias_only([0.5, 0.5, 0.1]).predict(&features);
        assert_eq!(prediction.class_index, 0);
        assert_eq!(prediction.label, "A");

        let prediction = bias_only([0.1, 0.5, 0.5]).predict(&features);
        assert_eq!(prediction.class_index, 1);
        assert_eq!(prediction.label, "B");
    }

    #[test]
    fn test_prediction_is_distribution() {
        let classifier = SignClassifier::new(
            catalog(),
            Scaler::from_divisor(0.9).unwrap(),
            ModelSpec::reference(),
            reference(3, 7),
        )
        .unwrap();
        let features = FeatureVector::from_slice(&[0.3; FEATURE_DIM]).unwrap();

        let prediction = classifier.predict(&features);
        assert!(prediction.probs.data.iter().all(|&p| p >= 0.0));
        assert!((prediction.probs.data.sum() - 1.0).abs() < 1e-5);
        assert!(prediction.confidence() > 0.0);

        let probs = classifier.predict_probs(&sample_inputs().view());
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
        assert_eq!(classifier.predict_batch(&Array2::zeros((0, FEATURE_DIM)).view()), Vec::<usize>::new());
    }

    #[test]
    fn test_output_width_must_match_catalog() {
        let scaler = Scaler::from_divisor(1.0).unwrap();
        let result = SignClassifier::new(catalog(), scaler, ModelSpec::reference(), reference(4, 1));
        assert!(matches!(result, Err(SignError::ConfigError(_))));

        let narrow = ModelSpec::reference()
            .build(10, 3, 1, &Default::default())
            .unwrap();
        let result = SignClassifier::new(catalog(), scaler, ModelSpec::reference(), narrow);
        assert!(result.is_err());

        let result = SignClassifier::new(catalog(), scaler, ModelSpec { hidden: Vec::new() }, reference(3, 1));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_load_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("signs.json");
        let classifier = SignClassifier::new(
            catalog(),
            Scaler::from_divisor(0.8).unwrap(),
            ModelSpec::reference(),
            reference(3, 21),
        )
        .unwrap();

        classifier.save(&path).unwrap();
        assert!(SignClassifier::weights_path(&path).is_file());
        assert!(dir.path().join("models").join("signs_weights.json").is_file());

        let loaded = SignClassifier::load(&path).unwrap();
        assert_eq!(loaded.classes(), classifier.classes());
        assert_eq!(loaded.model(), classifier.model());
        assert!((loaded.scaler().divisor() - 0.8).abs() < 1e-6);

        let inputs = sample_inputs();
        let before = classifier.predict_probs(&inputs.view());
        let after = loaded.predict_probs(&inputs.view());
        assert!(before.iter().zip(&after).all(|(a, b)| (a - b).abs() < 1e-6));
    }

    #[test]
    fn test_load_rejects_other_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signs.json");
        bias_only([0.2, 0.3, 0.5]).save(&path).unwrap();

        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        value["version"] = serde_json::json!(99);
        fs::write(&path, value.to_string()).unwrap();

        assert!(matches!(
            SignClassifier::load(&path),
            Err(SignError::SerializationError(_))
        ));
    }

    #[test]
    fn test_load_missing_weights_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signs.json");
        bias_only([0.2, 0.3, 0.5]).save(&path).unwrap();
        fs::remove_file(SignClassifier::weights_path(&path)).unwrap();

        assert!(matches!(
            SignClassifier::load(&path),
            Err(SignError::SerializationError(_))
        ));
    }

    #[test]
    fn test_missing_manifest_keeps_io_source() {
        use std::error::Error;

        let err = SignClassifier::load("does/not/exist.json").unwrap_err();
        assert!(matches!(err, SignError::Io { .. }));
        assert!(err.source().is_some());
    }
}
