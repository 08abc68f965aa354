// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Feed-forward sign classifier network on Burn.
//!
//! [`SignNet`] is a stack of ReLU dense blocks, each followed by dropout, and a
//! linear output layer producing one logit per class. Dropout is only active on
//! an autodiff backend, so the same module trains on [`TrainBackend`] and
//! serves predictions on [`InferBackend`] after `valid()`.
//!
//! Parameter initialization, dropout masks and batch shuffling all draw from
//! the backend's global RNG. Seeded work holds [`lock_backend_rng`] so that
//! concurrent runs cannot interleave their draws.

use std::sync::{Mutex, MutexGuard, PoisonError};

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig};
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignError};

/// CPU backend used for inference.
pub type InferBackend = NdArray<f32>;

/// CPU backend with gradient tracking used for training.
pub type TrainBackend = Autodiff<InferBackend>;

/// Device of both backends.
pub type Device = NdArrayDevice;

static BACKEND_RNG: Mutex<()> = Mutex::new(());

/// Take exclusive use of the backend RNG and reseed it.
///
/// Hold the guard for as long as the seeded sequence of draws must stay
/// reproducible.
pub fn lock_backend_rng(seed: u64) -> MutexGuard<'static, ()> {
    let guard = BACKEND_RNG.lock().unwrap_or_else(PoisonError::into_inner);
    InferBackend::seed(seed);
    guard
}

/// One hidden block: `Dense(units, ReLU)` followed by dropout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HiddenLayer {
    /// Output width.
    pub units: usize,
    /// Fraction of activations dropped while fitting, in [0, 1).
    #[serde(default)]
    pub dropout: f64,
}

impl HiddenLayer {
    /// Dense block with dropout.
    #[must_use]
    pub const fn new(units: usize, dropout: f64) -> Self {
        Self { units, dropout }
    }
}

/// Hidden-layer stack of a classifier. The output layer sized to the class
/// catalog is appended when the network is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Hidden blocks in order.
    pub hidden: Vec<HiddenLayer>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::reference()
    }
}

impl ModelSpec {
    /// Dense(256) -> Dropout(0.3) -> Dense(128) -> Dropout(0.3) -> Dense(64).
    #[must_use]
    pub fn reference() -> Self {
        Self {
            hidden: vec![
                HiddenLayer::new(256, 0.3),
                HiddenLayer::new(128, 0.3),
                HiddenLayer::new(64, 0.0),
            ],
        }
    }

    /// Check widths and dropout rates.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for zero-width layers or dropout rates
    /// outside [0, 1).
    pub fn validate(&self) -> Result<()> {
        for (i, layer) in self.hidden.iter().enumerate() {
            if layer.units == 0 {
                return Err(SignError::ConfigError(format!(
                    "hidden layer {i} has zero units"
                )));
            }
            if !(0.0..1.0).contains(&layer.dropout) {
                return Err(SignError::ConfigError(format!(
                    "dropout rate {} in layer {i} is outside [0, 1)",
                    layer.dropout
                )));
            }
        }
        Ok(())
    }

    /// Build a freshly initialized network with seeded Glorot-uniform weights.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the architecture is invalid or either
    /// dimension is zero.
    pub fn build<B: Backend>(
        &self,
        input_dim: usize,
        num_classes: usize,
        seed: u64,
        device: &B::Device,
    ) -> Result<SignNet<B>> {
        let _rng = lock_backend_rng(seed);
        self.init(input_dim, num_classes, device)
    }

    /// Initialize from the current backend RNG state. Callers hold the lock.
    pub(crate) fn init<B: Backend>(
        &self,
        input_dim: usize,
        num_classes: usize,
        device: &B::Device,
    ) -> Result<SignNet<B>> {
        let network = self.layers(input_dim, num_classes, device)?;
        // Parameters are lazy; draw them now, in declaration order.
        let _ = network.forward(Tensor::zeros([1, input_dim], device));
        Ok(network)
    }

    /// Network skeleton whose parameters are drawn on first use, or replaced
    /// by a loaded record before that.
    pub(crate) fn layers<B: Backend>(
        &self,
        input_dim: usize,
        num_classes: usize,
        device: &B::Device,
    ) -> Result<SignNet<B>> {
        self.validate()?;
        if num_classes == 0 || input_dim == 0 {
            return Err(SignError::ConfigError(
                "network needs at least one input and one class".to_string(),
            ));
        }

        let glorot = Initializer::XavierUniform { gain: 1.0 };
        let mut width = input_dim;
        let hidden = self
            .hidden
            .iter()
            .map(|layer| {
                let block = HiddenBlock {
                    linear: LinearConfig::new(width, layer.units)
                        .with_initializer(glorot.clone())
                        .init(device),
                    dropout: DropoutConfig::new(layer.dropout).init(),
                };
                width = layer.units;
                block
            })
            .collect();
        let output = LinearConfig::new(width, num_classes)
            .with_initializer(glorot)
            .init(device);

        Ok(SignNet { hidden, output })
    }
}

/// `Dense(ReLU)` followed by dropout.
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

/// Feed-forward classifier: hidden blocks and a linear logit layer.
#[derive(Module, Debug)]
pub struct SignNet<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    output: Linear<B>,
}

impl<B: Backend> SignNet<B> {
    /// Assemble a network from explicit layers.
    #[must_use]
    pub const fn new(hidden: Vec<HiddenBlock<B>>, output: Linear<B>) -> Self {
        Self { hidden, output }
    }

    /// Logits with shape `(batch, classes)`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.hidden.iter().fold(input, |x, block| {
            block.dropout.forward(relu(block.linear.forward(x)))
        });
        self.output.forward(x)
    }

    /// Class probabilities with shape `(batch, classes)`; every row sums to 1.
    pub fn probs(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward(input), 1)
    }

    /// Input width.
    pub fn input_dim(&self) -> usize {
        let first = self.hidden.first().map_or(&self.output, |block| &block.linear);
        first.weight.val().dims()[0]
    }

    /// Output width (number of classes).
    pub fn output_dim(&self) -> usize {
        self.output.weight.val().dims()[1]
    }

    /// Number of hidden blocks.
    pub fn depth(&self) -> usize {
        self.hidden.len()
    }
}

/// Row-major feature matrix as a tensor.
pub fn to_tensor<B: Backend>(x: &ArrayView2<'_, f32>, device: &B::Device) -> Tensor<B, 2> {
    let (rows, cols) = x.dim();
    let values: Vec<f32> = x.iter().copied().collect();
    Tensor::from_data(TensorData::new(values, [rows, cols]), device)
}

/// Class labels as an integer tensor.
pub fn labels_tensor<B: Backend>(labels: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    #[allow(clippy::cast_possible_wrap)]
    let values: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
    Tensor::from_data(TensorData::new(values, [labels.len()]), device)
}

/// Copy a 2-D tensor back into an array.
pub fn to_array<B: Backend>(tensor: Tensor<B, 2>) -> Array2<f32> {
    let [rows, cols] = tensor.dims();
    let values: Vec<f32> = tensor.into_data().iter::<f32>().collect();
    // `dims` and the element count always agree.
    Array2::from_shape_vec((rows, cols), values).unwrap_or_else(|_| Array2::zeros((rows, cols)))
}

/// Network with no hidden layers whose output ignores the input and always
/// produces `logits`.
#[cfg(test)]
pub(crate) fn constant_logits(input_dim: usize, logits: &[f32]) -> SignNet<InferBackend> {
    use burn::module::Param;

    let device = Device::default();
    let output = Linear {
        weight: Param::from_tensor(Tensor::zeros([input_dim, logits.len()], &device)),
        bias: Some(Param::from_tensor(Tensor::from_data(
            TensorData::new(logits.to_vec(), [logits.len()]),
            &device,
        ))),
    };
    SignNet::new(Vec::new(), output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::module::AutodiffModule;
    use burn::nn::loss::CrossEntropyLossConfig;
    use burn::optim::{AdamConfig, GradientsParams, Optimizer};
    use burn::tensor::ElementConversion;
    use ndarray::array;

    #[test]
    fn test_reference_network_shape() {
        let net = ModelSpec::reference()
            .build::<InferBackend>(63, 3, 1, &Default::default())
            .unwrap();
        assert_eq!(net.input_dim(), 63);
        assert_eq!(net.output_dim(), 3);
        assert_eq!(net.depth(), 3);
        let expected = 63 * 256 + 256 + 256 * 128 + 128 + 128 * 64 + 64 + 64 * 3 + 3;
        assert_eq!(net.num_params(), expected);
    }

    #[test]
    fn test_probs_are_distribution() {
        let device = Default::default();
        let net = ModelSpec::reference()
            .build::<InferBackend>(63, 4, 9, &device)
            .unwrap();
        #[allow(clippy::cast_precision_loss)]
        let x = Array2::from_shape_fn((5, 63), |(i, j)| ((i * 63 + j) as f32 * 0.37).sin());
        let probs = to_array(net.probs(to_tensor(&x.view(), &device)));

        assert_eq!(probs.dim(), (5, 4));
        for row in probs.rows() {
            assert!(row.iter().all(|&p| p >= 0.0));
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_same_seed_same_weights() {
        let device = Default::default();
        let spec = ModelSpec::reference();
        let x = array![[0.1_f32; 63]];
        let a = spec.build::<InferBackend>(63, 3, 5, &device).unwrap();
        let b = spec.build::<InferBackend>(63, 3, 5, &device).unwrap();
        let c = spec.build::<InferBackend>(63, 3, 6, &device).unwrap();

        let out = |net: &SignNet<InferBackend>| to_array(net.forward(to_tensor(&x.view(), &device)));
        assert_eq!(out(&a), out(&b));
        assert_ne!(out(&a), out(&c));
    }

    #[test]
    fn test_invalid_architectures_rejected() {
        let device = Default::default();
        let spec = ModelSpec {
            hidden: vec![HiddenLayer::new(8, 1.0)],
        };
        assert!(spec.build::<InferBackend>(63, 3, 0, &device).is_err());

        let spec = ModelSpec {
            hidden: vec![HiddenLayer::new(0, 0.0)],
        };
        assert!(spec.build::<InferBackend>(63, 3, 0, &device).is_err());
        assert!(ModelSpec::reference().build::<InferBackend>(63, 0, 0, &device).is_err());
    }

    #[test]
    fn test_constant_logits() {
        let device = Device::default();
        let net = constant_logits(4, &[1.0, 2.0]);
        let logits = to_array(net.forward(to_tensor(&array![[3.0, -1.0, 0.5, 9.0]].view(), &device)));
        assert_eq!(logits, array![[1.0, 2.0]]);
        assert_eq!(net.input_dim(), 4);
        assert_eq!(net.output_dim(), 2);
    }

    #[test]
    fn test_adam_steps_reduce_loss() {
        let device = Device::default();
        let spec = ModelSpec {
            hidden: vec![HiddenLayer::new(8, 0.0)],
        };
        let _rng = lock_backend_rng(3);
        let mut net: SignNet<TrainBackend> = spec.init(2, 2, &device).unwrap();
        let mut optim = AdamConfig::new().init::<TrainBackend, SignNet<TrainBackend>>();
        let loss_fn = CrossEntropyLossConfig::new().init(&device);

        let x = array![[1.0, 0.0], [0.0, 1.0], [0.9, 0.1], [0.1, 0.9]];
        let labels = [0, 1, 0, 1];
        let loss_of = |net: &SignNet<TrainBackend>| {
            let logits = net.forward(to_tensor(&x.view(), &device));
            loss_fn.forward(logits, labels_tensor(&labels, &device))
        };

        let before: f32 = loss_of(&net).into_scalar().elem();
        for _ in 0..50 {
            let loss = loss_of(&net);
            let grads = GradientsParams::from_grads(loss.backward(), &net);
            net = optim.step(0.05, net, grads);
        }
        let after: f32 = loss_of(&net).into_scalar().elem();
        assert!(after < before);

        // The validation copy carries the same weights without gradients.
        assert_eq!(net.valid().output_dim(), 2);
    }
}
