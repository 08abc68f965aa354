// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Landmark extraction: image in, optional 63-value feature vector out.

use image::DynamicImage;

use crate::detector::{DetectOptions, PoseDetector};
use crate::landmarks::{FeatureVector, LandmarkSet};
use crate::verbose;

/// Thin wrapper over a [`PoseDetector`] that flattens the first detected hand.
///
/// # Example
///
/// ```no_run
/// use sign_caption::{DetectOptions, HandLandmarkModel, LandmarkExtractor};
///
/// let model = HandLandmarkModel::load("hand_landmark.onnx")?;
/// let mut extractor = LandmarkExtractor::new(model, DetectOptions::single_shot());
/// let image = image::open("sign.jpg")?;
/// if let Some(features) = extractor.extract(&image) {
///     println!("{} features", features.len());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct LandmarkExtractor<D> {
    detector: D,
    options: DetectOptions,
}

impl<D: PoseDetector> LandmarkExtractor<D> {
    /// Create an extractor with the given detector and options.
    pub const fn new(detector: D, options: DetectOptions) -> Self {
        Self { detector, options }
    }

    /// Detection options used on every call.
    pub const fn options(&self) -> &DetectOptions {
        &self.options
    }

    /// Mutable access to the wrapped detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Give back the wrapped detector.
    pub fn into_inner(self) -> D {
        self.detector
    }

    /// Detect the first hand and return its landmarks.
    ///
    /// Detector failures are treated like "no hand": they are logged and
    /// reported as `None`.
    pub fn landmarks(&mut self, image: &DynamicImage) -> Option<LandmarkSet> {
        match self.detector.detect(image, &self.options) {
            // Detector ordering is authoritative; take the first hand as-is.
            Ok(hands) => hands.into_iter().next(),
            Err(e) => {
                verbose!("hand detector failed: {e}");
                None
            }
        }
    }

    /// Extract a feature vector from the first detected hand, if any.
    pub fn extract(&mut self, image: &DynamicImage) -> Option<FeatureVector> {
        self.landmarks(image).map(|set| set.to_features())
    }

    /// Reset detector tracking state.
    pub fn reset(&mut self) {
        self.detector.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SignError};
    use crate::landmarks::{FEATURE_DIM, Landmark, NUM_LANDMARKS};

    /// Reports `hands` copies of a fixed pose, or fails when `hands` is `None`.
    struct FixedDetector {
        hands: Option<usize>,
    }

    impl PoseDetector for FixedDetector {
        fn detect(&mut self, _image: &DynamicImage, _options: &DetectOptions) -> Result<Vec<LandmarkSet>> {
            let hands = self
                .hands
                .ok_or_else(|| SignError::DetectorError("session crashed".to_string()))?;
            let sets = (0..hands)
                .map(|h| {
                    #[allow(clippy::cast_precision_loss)]
                    let points = [Landmark::new(0.1 * (h + 1) as f32, 0.2, 0.3); NUM_LANDMARKS];
                    LandmarkSet::new(points)
                })
                .collect();
            Ok(sets)
        }
    }

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(8, 8)
    }

    #[test]
    fn test_no_hand_is_none() {
        let mut extractor =
            LandmarkExtractor::new(FixedDetector { hands: Some(0) }, DetectOptions::single_shot());
        assert!(extractor.extract(&blank()).is_none());
    }

    #[test]
    fn test_detector_failure_is_none() {
        let mut extractor =
            LandmarkExtractor::new(FixedDetector { hands: None }, DetectOptions::single_shot());
        assert!(extractor.extract(&blank()).is_none());
    }

    #[test]
    fn test_first_hand_selected() {
        let mut extractor =
            LandmarkExtractor::new(FixedDetector { hands: Some(2) }, DetectOptions::single_shot());
        let features = extractor.extract(&blank()).unwrap();

        assert_eq!(features.len(), FEATURE_DIM);
        assert!((features.as_slice()[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_extraction_repeatable() {
        let mut extractor =
            LandmarkExtractor::new(FixedDetector { hands: Some(1) }, DetectOptions::single_shot());
        let image = blank();
        assert_eq!(extractor.extract(&image), extractor.extract(&image));
    }
}
