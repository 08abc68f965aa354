// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Feature normalization.
//!
//! A single global divisor, the largest absolute feature value seen in the
//! training matrix, scales every feature vector into [-1, 1]. The divisor is
//! learned once and travels with the trained classifier; it is never
//! recomputed from test data or live frames.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SignError};
use crate::landmarks::FeatureVector;

/// Learned normalization state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    divisor: f32,
}

impl Scaler {
    /// Learn the divisor from training features.
    ///
    /// # Errors
    ///
    /// Returns a numeric error if the matrix is empty, holds a NaN or
    /// infinite value, or its largest absolute value is zero.
    pub fn fit(train_features: &ArrayView2<'_, f32>) -> Result<Self> {
        if train_features.is_empty() {
            return Err(SignError::NumericError(
                "cannot fit normalizer on an empty feature matrix".to_string(),
            ));
        }
        // f32::max skips NaN, so check before folding.
        if let Some(((row, col), v)) = train_features.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(SignError::NumericError(format!(
                "training feature {col} of sample {row} is {v}"
            )));
        }
        let divisor = train_features
            .iter()
            .fold(0.0_f32, |acc, &v| acc.max(v.abs()));
        Self::from_divisor(divisor)
    }

    /// Rebuild a scaler from a stored divisor.
    ///
    /// # Errors
    ///
    /// Returns a numeric error if the divisor is zero, negative or not finite.
    pub fn from_divisor(divisor: f32) -> Result<Self> {
        if !divisor.is_finite() || divisor <= 0.0 {
            return Err(SignError::NumericError(format!(
                "normalizer divisor must be positive and finite, got {divisor}"
            )));
        }
        Ok(Self { divisor })
    }

    /// The learned divisor.
    #[must_use]
    pub const fn divisor(&self) -> f32 {
        self.divisor
    }

    /// Scale a feature matrix (one sample per row).
    #[must_use]
    pub fn apply(&self, features: &ArrayView2<'_, f32>) -> Array2<f32> {
        features.mapv(|v| v / self.divisor)
    }

    /// Scale one feature vector.
    #[must_use]
    pub fn apply_vector(&self, features: &ArrayView1<'_, f32>) -> Array1<f32> {
        features.mapv(|v| v / self.divisor)
    }

    /// Scale one extracted feature vector.
    #[must_use]
    pub fn apply_features(&self, features: &FeatureVector) -> Array1<f32> {
        features.as_slice().iter().map(|v| v / self.divisor).collect()
    }
}
