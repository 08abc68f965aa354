// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Result types produced by the classifier and the inference loop.

use std::collections::BTreeMap;
use std::fmt;

use image::DynamicImage;
use ndarray::{Array1, ArrayView1};

use crate::landmarks::LandmarkSet;

/// Timing information for one frame (in milliseconds).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Speed {
    /// Time spent acquiring the frame from the source.
    pub read: Option<f64>,
    /// Time spent in the hand detector.
    pub extract: Option<f64>,
    /// Time spent normalizing and classifying.
    pub classify: Option<f64>,
}

impl Speed {
    /// Create a new Speed instance with all timings.
    #[must_use]
    pub const fn new(read: f64, extract: f64, classify: f64) -> Self {
        Self {
            read: Some(read),
            extract: Some(extract),
            classify: Some(classify),
        }
    }

    /// Sum of all recorded stages in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.read.unwrap_or(0.0) + self.extract.unwrap_or(0.0) + self.classify.unwrap_or(0.0)
    }
}

/// Index of the largest value; the lowest index wins exact ties.
#[must_use]
pub fn argmax(values: &ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] || values[best].is_nan() {
            best = i;
        }
    }
    best
}

/// Classification probabilities over the class catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Probs {
    /// Probability per class with shape (`num_classes`,).
    pub data: Array1<f32>,
}

impl Probs {
    /// Wrap a probability vector.
    #[must_use]
    pub const fn new(data: Array1<f32>) -> Self {
        Self { data }
    }

    /// Index of the most probable class.
    ///
    /// Exact ties resolve to the lowest index.
    #[must_use]
    pub fn top1(&self) -> usize {
        argmax(&self.data.view())
    }

    /// Indices of the `k` most probable classes, best first.
    ///
    /// The sort is stable, so equal probabilities keep index order.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.data.len()).collect();
        indices.sort_by(|&a, &b| {
            self.data[b]
                .partial_cmp(&self.data[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        indices.truncate(k);
        indices
    }

    /// Probability of the top-1 class.
    #[must_use]
    pub fn top1conf(&self) -> f32 {
        self.data.get(self.top1()).copied().unwrap_or(0.0)
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when there are no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Output of [`SignClassifier::predict`](crate::SignClassifier::predict).
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted class index (argmax, lowest index on ties).
    pub class_index: usize,
    /// Predicted class name.
    pub label: String,
    /// Full distribution over the catalog.
    pub probs: Probs,
}

impl Prediction {
    /// Probability of the predicted class.
    #[must_use]
    pub fn confidence(&self) -> f32 {
        self.probs.top1conf()
    }
}

/// A labeled frame: what the classifier saw and what it said.
#[derive(Debug, Clone)]
pub struct Caption {
    /// Predicted class index.
    pub class_index: usize,
    /// Predicted class name.
    pub label: String,
    /// Probability of the predicted class.
    pub confidence: f32,
    /// Full distribution over the catalog.
    pub probs: Probs,
    /// `language -> text` for the predicted class.
    pub translations: BTreeMap<String, String>,
    /// Landmarks of the hand that was classified, image-normalized.
    pub landmarks: LandmarkSet,
}

impl Caption {
    /// Translation in one language.
    #[must_use]
    pub fn text(&self, language: &str) -> Option<&str> {
        self.translations.get(language).map(String::as_str)
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.label, self.confidence)?;
        for (language, text) in &self.translations {
            write!(f, " {language}={text}")?;
        }
        Ok(())
    }
}

/// One cycle of the inference loop.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Zero-based frame index within the stream.
    pub frame_idx: usize,
    /// The frame as read from the source.
    pub frame: DynamicImage,
    /// Caption when a hand was found, `None` for a pass-through frame.
    pub caption: Option<Caption>,
    /// Label that has been consistent over recent frames, if any.
    pub stable: Option<String>,
    /// Word whose sign sequence was completed on this frame, if any.
    pub word: Option<String>,
    /// Per-stage timings.
    pub speed: Speed,
}

impl Decision {
    /// True when this frame carries a caption.
    #[must_use]
    pub const fn is_labeled(&self) -> bool {
        self.caption.is_some()
    }

    /// One-line description for console output.
    #[must_use]
    pub fn verbose(&self) -> String {
        let mut line = match &self.caption {
            Some(caption) => format!("frame {}: {caption}", self.frame_idx),
            None => format!("frame {}: (no hands)", self.frame_idx),
        };
        if let Some(stable) = &self.stable {
            line.push_str(&format!(" [stable {stable}]"));
        }
        if let Some(word) = &self.word {
            line.push_str(&format!(" [word {word}]"));
        }
        line.push_str(&format!(", {:.1}ms", self.speed.total()));
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_speed_total() {
        let speed = Speed::new(1.0, 2.5, 0.5);
        assert!((speed.total() - 4.0).abs() < 1e-9);
        assert!((Speed::default().total()).abs() < 1e-9);
    }

    #[test]
    fn test_argmax_tie_breaks_low() {
        assert_eq!(argmax(&array![0.2, 0.4, 0.4].view()), 1);
        assert_eq!(argmax(&array![0.5, 0.5].view()), 0);
        assert_eq!(argmax(&array![f32::NAN, 0.1].view()), 1);
    }

    #[test]
    fn test_probs_top1_lowest_index_on_tie() {
        let probs = Probs::new(array![0.1, 0.45, 0.45]);
        assert_eq!(probs.top1(), 1);
        assert!((probs.top1conf() - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_probs_top_k_stable() {
        let probs = Probs::new(array![0.3, 0.1, 0.3, 0.3]);
        assert_eq!(probs.top_k(3), vec![0, 2, 3]);
        assert_eq!(probs.top_k(10).len(), 4);
    }

    #[test]
    fn test_decision_verbose_line() {
        let decision = Decision {
            frame_idx: 4,
            frame: DynamicImage::new_rgb8(2, 2),
            caption: None,
            stable: None,
            word: None,
            speed: Speed::default(),
        };
        assert!(!decision.is_labeled());
        assert!(decision.verbose().contains("no hands"));

        let decision = Decision {
            stable: Some("C".to_string()),
            word: Some("cab".to_string()),
            ..decision
        };
        assert!(decision.verbose().contains("[stable C] [word cab]"));
    }
}
