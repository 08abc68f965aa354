// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Hand pose detector interface.
//!
//! The detector is an injected capability: anything that maps an image to
//! zero or more 21-point hand poses can drive the extractor. The bundled
//! implementation is [`crate::hand_landmark::HandLandmarkModel`]; tests use
//! deterministic fakes.

use std::fmt;
use std::str::FromStr;

use image::DynamicImage;

use crate::error::Result;
use crate::landmarks::LandmarkSet;

/// How the detector treats consecutive calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DetectionMode {
    /// Every image is independent (offline dataset extraction).
    #[default]
    SingleShot,
    /// Consecutive frames of one video stream; the detector may track.
    Streaming,
}

impl DetectionMode {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SingleShot => "single-shot",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DetectionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single-shot" | "single" | "static" | "image" => Ok(Self::SingleShot),
            "streaming" | "stream" | "video" | "tracking" => Ok(Self::Streaming),
            _ => Err(format!(
                "invalid detection mode '{s}', expected one of: single-shot, streaming"
            )),
        }
    }
}

/// Options passed to every detector call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectOptions {
    /// Single-shot or streaming.
    pub mode: DetectionMode,
    /// Maximum number of hands to report. The pipeline always asks for 1.
    pub max_hands: usize,
    /// Minimum hand-presence confidence (0.0 to 1.0).
    pub min_confidence: f32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self::single_shot()
    }
}

impl DetectOptions {
    /// Offline extraction: independent images, permissive threshold.
    #[must_use]
    pub const fn single_shot() -> Self {
        Self {
            mode: DetectionMode::SingleShot,
            max_hands: 1,
            min_confidence: 0.5,
        }
    }

    /// Live extraction: consecutive frames, stricter threshold since false
    /// positives stay on screen.
    #[must_use]
    pub const fn streaming() -> Self {
        Self {
            mode: DetectionMode::Streaming,
            max_hands: 1,
            min_confidence: 0.7,
        }
    }

    /// Set the minimum hand-presence confidence.
    #[must_use]
    pub const fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}

/// A hand pose detector.
pub trait PoseDetector {
    /// Detect hands in `image`.
    ///
    /// Returns at most `options.max_hands` landmark sets in the detector's own
    /// order (most confident first). An empty list means no hand.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector itself fails to run.
    fn detect(&mut self, image: &DynamicImage, options: &DetectOptions) -> Result<Vec<LandmarkSet>>;

    /// Forget any tracking state carried between streaming calls.
    fn reset(&mut self) {}
}

impl<D: PoseDetector + ?Sized> PoseDetector for Box<D> {
    fn detect(&mut self, image: &DynamicImage, options: &DetectOptions) -> Result<Vec<LandmarkSet>> {
        (**self).detect(image, options)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

impl<D: PoseDetector + ?Sized> PoseDetector for &mut D {
    fn detect(&mut self, image: &DynamicImage, options: &DetectOptions) -> Result<Vec<LandmarkSet>> {
        (**self).detect(image, options)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_str() {
        assert_eq!(
            "single-shot".parse::<DetectionMode>().unwrap(),
            DetectionMode::SingleShot
        );
        assert_eq!(
            "tracking".parse::<DetectionMode>().unwrap(),
            DetectionMode::Streaming
        );
        assert!("sometimes".parse::<DetectionMode>().is_err());
    }

    #[test]
    fn test_streaming_threshold_is_stricter() {
        let offline = DetectOptions::single_shot();
        let live = DetectOptions::streaming();

        assert_eq!(offline.max_hands, 1);
        assert_eq!(live.max_hands, 1);
        assert!(live.min_confidence > offline.min_confidence);
        assert_eq!(live.mode, DetectionMode::Streaming);
    }

    #[test]
    fn test_with_min_confidence() {
        let opts = DetectOptions::streaming().with_min_confidence(0.9);
        assert!((opts.min_confidence - 0.9).abs() < f32::EPSILON);
    }
}
