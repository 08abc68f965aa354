// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The live inference loop.
//!
//! [`DecisionStream`] is a lazy producer: every call to `next` reads one frame,
//! extracts landmarks, classifies and yields one [`Decision`]. Frames without a
//! hand are passed through with no caption. The stream ends when the frame
//! source is exhausted or fails.
//!
//! [`run_stream`] is the driver. It owns the stop signal, checks it at the top
//! of each cycle and hands every decision to a [`DecisionSink`].

#![allow(clippy::cast_precision_loss)]

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::catalog::{SignConfig, TranslationTable};
use crate::classifier::SignClassifier;
use crate::detector::{DetectOptions, PoseDetector};
use crate::error::Result;
use crate::extractor::LandmarkExtractor;
use crate::landmarks::LandmarkSet;
use crate::results::{Caption, Decision, Speed};
use crate::sequence::WordTracker;
use crate::source::FrameSource;
use crate::stabilizer::{
    DEFAULT_MAX_AGE, DEFAULT_MIN_CONFIDENCE, DEFAULT_MIN_CONSISTENT, DEFAULT_WINDOW, Stabilizer,
};

/// Inference loop settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    /// Detector options for live frames.
    pub detect: DetectOptions,
    /// Labeled frames remembered by the stabilizer.
    pub window: usize,
    /// Agreeing frames needed before a label is stable.
    pub min_consistent: usize,
    /// Minimum mean confidence for a stable label.
    pub min_caption_confidence: f32,
    /// Frames after which a prediction stops counting toward stability.
    pub max_age: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            detect: DetectOptions::streaming(),
            window: DEFAULT_WINDOW,
            min_consistent: DEFAULT_MIN_CONSISTENT,
            min_caption_confidence: DEFAULT_MIN_CONFIDENCE,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl StreamConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set detector options.
    #[must_use]
    pub const fn with_detect(mut self, detect: DetectOptions) -> Self {
        self.detect = detect;
        self
    }

    /// Set the stabilizer window.
    #[must_use]
    pub const fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set the number of agreeing frames.
    #[must_use]
    pub const fn with_min_consistent(mut self, min_consistent: usize) -> Self {
        self.min_consistent = min_consistent;
        self
    }

    /// Set the stable caption confidence threshold.
    #[must_use]
    pub const fn with_min_caption_confidence(mut self, confidence: f32) -> Self {
        self.min_caption_confidence = confidence;
        self
    }

    /// Set the prediction age limit in frames.
    #[must_use]
    pub const fn with_max_age(mut self, max_age: usize) -> Self {
        self.max_age = max_age;
        self
    }
}

/// Lazy sequence of decisions over a frame source.
pub struct DecisionStream<S, D> {
    source: S,
    extractor: LandmarkExtractor<D>,
    classifier: SignClassifier,
    translations: TranslationTable,
    stabilizer: Stabilizer,
    words: WordTracker,
    frame_idx: usize,
    finished: bool,
}

impl<S, D> fmt::Debug for DecisionStream<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionStream")
            .field("classes", self.classifier.classes())
            .field("frame_idx", &self.frame_idx)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<S: FrameSource, D: PoseDetector> DecisionStream<S, D> {
    /// Build a stream.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the sign configuration's catalog
    /// differs from the one the classifier was trained on, if a class has no
    /// translation, or if a word sequence uses an unknown sign.
    pub fn new(
        source: S,
        detector: D,
        classifier: SignClassifier,
        signs: SignConfig,
        config: StreamConfig,
    ) -> Result<Self> {
        classifier.classes().ensure_matches(&signs.classes)?;
        signs.validate()?;

        Ok(Self {
            source,
            extractor: LandmarkExtractor::new(detector, config.detect),
            classifier,
            translations: signs.translations,
            stabilizer: Stabilizer::new(
                config.window,
                config.min_consistent,
                config.min_caption_confidence,
            )
            .with_max_age(config.max_age),
            words: WordTracker::new(signs.sequences),
            frame_idx: 0,
            finished: false,
        })
    }

    /// The classifier in use.
    pub const fn classifier(&self) -> &SignClassifier {
        &self.classifier
    }

    /// Index of the next frame to be read.
    pub const fn frame_idx(&self) -> usize {
        self.frame_idx
    }

    /// Swap in a freshly opened source and start over.
    ///
    /// Tracking state, stabilizer and word history and the frame counter are
    /// reset.
    pub fn restart(&mut self, source: S) {
        self.source = source;
        self.extractor.reset();
        self.stabilizer.reset();
        self.words.reset();
        self.frame_idx = 0;
        self.finished = false;
    }

    /// Give back the frame source and detector.
    pub fn into_parts(self) -> (S, D) {
        (self.source, self.extractor.into_inner())
    }

    fn caption(&self, landmarks: LandmarkSet) -> Caption {
        let prediction = self.classifier.predict(&landmarks.to_features());
        let translations = self
            .translations
            .lookup(&prediction.label)
            .cloned()
            .unwrap_or_default();
        Caption {
            class_index: prediction.class_index,
            confidence: prediction.confidence(),
            label: prediction.label,
            probs: prediction.probs,
            translations,
            landmarks,
        }
    }
}

impl<S: FrameSource, D: PoseDetector> Iterator for DecisionStream<S, D> {
    type Item = Result<Decision>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let start = Instant::now();
        let frame = match self.source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };
        let read = elapsed_ms(start);

        let start = Instant::now();
        let landmarks = self.extractor.landmarks(&frame);
        let extract = elapsed_ms(start);

        let start = Instant::now();
        let caption = landmarks.map(|set| self.caption(set));
        let stable = caption
            .as_ref()
            .and_then(|c| self.stabilizer.push(self.frame_idx, &c.label, c.confidence));
        let word = self.words.observe(stable.as_deref());
        let classify = caption.as_ref().map(|_| elapsed_ms(start));

        let decision = Decision {
            frame_idx: self.frame_idx,
            frame,
            caption,
            stable,
            word,
            speed: Speed {
                read: Some(read),
                extract: Some(extract),
                classify,
            },
        };
        self.frame_idx += 1;
        Some(Ok(decision))
    }
}

impl<S: FrameSource, D: PoseDetector> std::iter::FusedIterator for DecisionStream<S, D> {}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Shared stop signal for the inference loop.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Takes effect at the top of the next cycle.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the driver should do after a decision was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next frame.
    Continue,
    /// End the loop.
    Stop,
}

/// Consumer of decisions (console, window, files).
pub trait DecisionSink {
    /// Handle one decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails; the loop ends with that error.
    fn handle(&mut self, decision: &Decision) -> Result<Flow>;
}

impl<K: DecisionSink + ?Sized> DecisionSink for &mut K {
    fn handle(&mut self, decision: &Decision) -> Result<Flow> {
        (**self).handle(decision)
    }
}

impl<K: DecisionSink + ?Sized> DecisionSink for Box<K> {
    fn handle(&mut self, decision: &Decision) -> Result<Flow> {
        (**self).handle(decision)
    }
}

/// Every sink sees every decision; any `Stop` stops the loop.
impl<K: DecisionSink> DecisionSink for Vec<K> {
    fn handle(&mut self, decision: &Decision) -> Result<Flow> {
        let mut flow = Flow::Continue;
        for sink in self.iter_mut() {
            if sink.handle(decision)? == Flow::Stop {
                flow = Flow::Stop;
            }
        }
        Ok(flow)
    }
}

/// Sink that discards decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DecisionSink for NullSink {
    fn handle(&mut self, _decision: &Decision) -> Result<Flow> {
        Ok(Flow::Continue)
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Stop flag set or a sink returned [`Flow::Stop`].
    Stopped,
    /// The frame source had no more frames.
    SourceExhausted,
    /// The frame source failed.
    SourceFailed(String),
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::SourceExhausted => write!(f, "source exhausted"),
            Self::SourceFailed(e) => write!(f, "source failed: {e}"),
        }
    }
}

/// Totals over one run of the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    /// Frames processed.
    pub frames: usize,
    /// Frames that carried a caption.
    pub labeled: usize,
    /// Mean confidence over labeled frames.
    pub mean_confidence: Option<f32>,
    /// Mean per-stage timings in milliseconds.
    pub speed: Speed,
    /// How the loop ended.
    pub end: EndReason,
}

impl fmt::Display for StreamSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames, {} with a hand ({})",
            self.frames, self.labeled, self.end
        )?;
        if let Some(conf) = self.mean_confidence {
            write!(f, ", mean confidence {conf:.2}")?;
        }
        write!(
            f,
            ". Speed: {:.1}ms read, {:.1}ms extract, {:.1}ms classify per frame",
            self.speed.read.unwrap_or(0.0),
            self.speed.extract.unwrap_or(0.0),
            self.speed.classify.unwrap_or(0.0)
        )
    }
}

#[derive(Default)]
struct Totals {
    frames: usize,
    labeled: usize,
    confidence: f64,
    read: f64,
    extract: f64,
    classify: f64,
}

impl Totals {
    fn add(&mut self, decision: &Decision) {
        self.frames += 1;
        if let Some(caption) = &decision.caption {
            self.labeled += 1;
            self.confidence += f64::from(caption.confidence);
        }
        self.read += decision.speed.read.unwrap_or(0.0);
        self.extract += decision.speed.extract.unwrap_or(0.0);
        self.classify += decision.speed.classify.unwrap_or(0.0);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn finish(self, end: EndReason) -> StreamSummary {
        let mean = |total: f64, n: usize| (n > 0).then(|| total / n as f64);
        StreamSummary {
            frames: self.frames,
            labeled: self.labeled,
            mean_confidence: mean(self.confidence, self.labeled).map(|c| c as f32),
            speed: Speed {
                read: mean(self.read, self.frames),
                extract: mean(self.extract, self.frames),
                classify: mean(self.classify, self.labeled),
            },
            end,
        }
    }
}

/// Drive a decision sequence into a sink until stopped or the source ends.
///
/// The stop flag is checked before every frame is acquired. A sink returning
/// [`Flow::Stop`] also sets the flag. A source failure ends the loop and is
/// reported in [`StreamSummary::end`], not as an error.
///
/// # Errors
///
/// Returns the first error raised by the sink.
pub fn run_stream<I, K>(decisions: I, sink: &mut K, stop: &StopFlag) -> Result<StreamSummary>
where
    I: IntoIterator<Item = Result<Decision>>,
    K: DecisionSink + ?Sized,
{
    let mut decisions = decisions.into_iter();
    let mut totals = Totals::default();

    let end = loop {
        if stop.is_stopped() {
            break EndReason::Stopped;
        }
        let decision = match decisions.next() {
            None => break EndReason::SourceExhausted,
            Some(Err(e)) => break EndReason::SourceFailed(e.to_string()),
            Some(Ok(decision)) => decision,
        };

        totals.add(&decision);
        if sink.handle(&decision)? == Flow::Stop {
            stop.stop();
            break EndReason::Stopped;
        }
    };

    Ok(totals.finish(end))
}
