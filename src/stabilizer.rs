// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Temporal consistency filter over recent per-frame predictions.

use std::collections::VecDeque;

/// Default number of labeled frames remembered.
pub const DEFAULT_WINDOW: usize = 10;
/// Default number of agreeing frames required.
pub const DEFAULT_MIN_CONSISTENT: usize = 3;
/// Default minimum mean confidence of the agreeing frames.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;
/// Default age, in frames, after which a prediction no longer counts
/// (one second at 30 fps).
pub const DEFAULT_MAX_AGE: usize = 30;

/// Reports a label once it has been predicted consistently.
///
/// The stabilizer keeps the last `window` labeled predictions that are younger
/// than `max_age` frames. A label is stable when it occurs at least
/// `min_consistent` times among them and the mean confidence of those
/// occurrences is at least `min_confidence`. Frames without a prediction still
/// advance the clock, so a gap in detections lets old agreement expire.
///
/// ```
/// use sign_caption::Stabilizer;
///
/// let mut stabilizer = Stabilizer::default();
/// assert_eq!(stabilizer.push(0, "A", 0.9), None);
/// assert_eq!(stabilizer.push(1, "A", 0.9), None);
/// assert_eq!(stabilizer.push(2, "A", 0.9).as_deref(), Some("A"));
/// // A long gap without a hand: the earlier frames have expired.
/// assert_eq!(stabilizer.push(100, "A", 0.9), None);
/// ```
#[derive(Debug, Clone)]
pub struct Stabilizer {
    window: usize,
    min_consistent: usize,
    min_confidence: f32,
    max_age: usize,
    history: VecDeque<Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    frame_idx: usize,
    label: String,
    confidence: f32,
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MIN_CONSISTENT, DEFAULT_MIN_CONFIDENCE)
    }
}

impl Stabilizer {
    /// Create a stabilizer with the default age limit. `window` and
    /// `min_consistent` are clamped to at least 1.
    #[must_use]
    pub fn new(window: usize, min_consistent: usize, min_confidence: f32) -> Self {
        let window = window.max(1);
        Self {
            window,
            min_consistent: min_consistent.clamp(1, window),
            min_confidence,
            max_age: DEFAULT_MAX_AGE,
            history: VecDeque::with_capacity(window),
        }
    }

    /// Set how many frames a prediction stays relevant, at least 1.
    #[must_use]
    pub fn with_max_age(mut self, max_age: usize) -> Self {
        self.max_age = max_age.max(1);
        self
    }

    /// Record the prediction made on frame `frame_idx` and return its label if
    /// it is now stable. Frame indices must not decrease between calls.
    pub fn push(&mut self, frame_idx: usize, label: &str, confidence: f32) -> Option<String> {
        self.expire(frame_idx);
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(Entry {
            frame_idx,
            label: label.to_string(),
            confidence,
        });

        let (count, total) = self
            .history
            .iter()
            .filter(|e| e.label == label)
            .fold((0usize, 0.0f32), |(n, sum), e| (n + 1, sum + e.confidence));

        #[allow(clippy::cast_precision_loss)]
        let mean = total / count as f32;
        (count >= self.min_consistent && mean >= self.min_confidence).then(|| label.to_string())
    }

    /// Drop predictions that are `max_age` or more frames older than `frame_idx`.
    pub fn expire(&mut self, frame_idx: usize) {
        while let Some(front) = self.history.front()
            && frame_idx.saturating_sub(front.frame_idx) >= self.max_age
        {
            self.history.pop_front();
        }
    }

    /// Number of remembered predictions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True when nothing has been recorded since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_min_consistent() {
        let mut s = Stabilizer::new(10, 3, 0.5);
        assert_eq!(s.push(0, "A", 0.9), None);
        assert_eq!(s.push(1, "B", 0.9), None);
        assert_eq!(s.push(2, "A", 0.9), None);
        assert_eq!(s.push(3, "A", 0.9), Some("A".to_string()));
        // B is not yet stable even though A is
        assert_eq!(s.push(4, "B", 0.9), None);
    }

    #[test]
    fn test_low_confidence_never_stable() {
        let mut s = Stabilizer::new(10, 2, 0.7);
        for i in 0..5 {
            assert_eq!(s.push(i, "C", 0.5), None);
        }
    }

    #[test]
    fn test_window_forgets_old_frames() {
        let mut s = Stabilizer::new(3, 3, 0.0);
        s.push(0, "A", 1.0);
        s.push(1, "A", 1.0);
        s.push(2, "B", 1.0);
        assert_eq!(s.len(), 3);
        // oldest A falls out, only two A remain in the window
        assert_eq!(s.push(3, "A", 1.0), None);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_old_predictions_expire_across_gaps() {
        let mut s = Stabilizer::new(10, 3, 0.5).with_max_age(30);
        for i in 0..3 {
            s.push(i, "B", 0.9);
        }
        assert_eq!(s.push(3, "B", 0.9).as_deref(), Some("B"));

        // 500 frames without a hand, then B again.
        assert_eq!(s.push(504, "B", 0.9), None);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_agreement_inside_age_limit_survives_gap() {
        let mut s = Stabilizer::new(10, 3, 0.5).with_max_age(30);
        s.push(0, "B", 0.9);
        s.push(10, "B", 0.9);
        assert_eq!(s.push(29, "B", 0.9).as_deref(), Some("B"));
        // frame 0 is now 30 frames old
        assert_eq!(s.push(30, "A", 0.9), None);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_expire_without_push() {
        let mut s = Stabilizer::new(5, 1, 0.0).with_max_age(2);
        s.push(0, "A", 1.0);
        s.expire(1);
        assert_eq!(s.len(), 1);
        s.expire(2);
        assert!(s.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut s = Stabilizer::new(5, 1, 0.0);
        assert_eq!(s.push(0, "A", 0.1).as_deref(), Some("A"));
        s.reset();
        assert!(s.is_empty());
    }

    #[test]
    fn test_parameters_clamped() {
        let mut s = Stabilizer::new(0, 0, 0.0).with_max_age(0);
        assert_eq!(s.push(0, "A", 0.2).as_deref(), Some("A"));
        assert_eq!(s.len(), 1);
        assert_eq!(s.push(1, "A", 0.2).as_deref(), Some("A"));
        assert_eq!(s.len(), 1);
    }
}
