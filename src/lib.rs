// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Sign Caption
//!
//! Hand-sign gesture classification from hand landmarks, with live bilingual
//! captions.
//!
//! A hand-landmark detector turns each image into 21 three-dimensional
//! keypoints. These are flattened into a 63-value feature vector, scaled by a
//! divisor learned from the training set and classified by a small
//! feed-forward network. The live loop captions every frame that shows a hand
//! with the sign name and its translations.
//!
//! ## Features
//!
//! - **Pluggable detector** - anything implementing [`PoseDetector`]; an ONNX
//!   hand-landmark model ([`HandLandmarkModel`]) is included
//! - **Training** - dataset builder, a Burn MLP with dropout trained with Adam,
//!   per-class precision/recall/F1 report
//! - **One artifact** - [`SignClassifier`] bundles the class catalog, the
//!   normalizer and the network, saved as a JSON manifest and weight record
//! - **Words** - [`WordTracker`] spells configured words from stable signs
//! - **Live loop** - [`DecisionStream`] yields one [`Decision`] per frame;
//!   [`run_stream`] drives it into sinks until stopped
//! - **Sources** - images, directories, globs, video files and webcams
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use std::path::Path;
//! use sign_caption::{
//!     Dataset, DetectOptions, HandLandmarkModel, LandmarkExtractor, SignConfig, TrainConfig,
//!     train,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let signs = SignConfig::default();
//!     let model = HandLandmarkModel::load("hand_landmark.onnx")?;
//!     let mut extractor = LandmarkExtractor::new(model, DetectOptions::single_shot());
//!
//!     let train_split = Dataset::build(Path::new("data/train"), &signs.classes, &mut extractor)?;
//!     let test_split = Dataset::build(Path::new("data/test"), &signs.classes, &mut extractor)?;
//!
//!     let outcome = train(&signs.classes, &train_split, &test_split, &TrainConfig::default())?;
//!     println!("{}", outcome.report);
//!     outcome.classifier.save("sign_model.json")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Live Captions
//!
//! ```no_run
//! use sign_caption::{
//!     DecisionStream, HandLandmarkModel, SignClassifier, SignConfig, SourceIterator,
//!     StopFlag, StreamConfig, run_stream, sink::ConsoleSink,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let classifier = SignClassifier::load("sign_model.json")?;
//! let detector = HandLandmarkModel::load("hand_landmark.onnx")?;
//! let frames = SourceIterator::new("frames/".into())?;
//!
//! let stream = DecisionStream::new(
//!     frames,
//!     detector,
//!     classifier,
//!     SignConfig::default(),
//!     StreamConfig::default(),
//! )?;
//! let summary = run_stream(stream, &mut ConsoleSink::new(), &StopFlag::new())?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Train from data/train and data/test, one directory per sign
//! sign-caption train --data data --detector hand_landmark.onnx --output sign_model.json
//!
//! # Score a saved classifier
//! sign-caption evaluate --model sign_model.json --data data/test --detector hand_landmark.onnx
//!
//! # Caption the default webcam in a window
//! sign-caption run --model sign_model.json --detector hand_landmark.onnx --show --font NotoSans.ttf
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`landmarks`] | [`LandmarkSet`], [`FeatureVector`] and the hand skeleton |
//! | [`detector`] | [`PoseDetector`] trait and [`DetectOptions`] |
//! | [`hand_landmark`] | ONNX [`HandLandmarkModel`] |
//! | [`extractor`] | [`LandmarkExtractor`]: image to optional feature vector |
//! | [`catalog`] | [`ClassCatalog`], [`TranslationTable`], [`SignConfig`] |
//! | [`dataset`] | [`Dataset`] builder over `root/<sign>/*` |
//! | [`normalizer`] | [`Scaler`] (global max-abs divisor) |
//! | [`nn`] | Burn classifier network and backends |
//! | [`classifier`] | [`SignClassifier`] bundle |
//! | [`train`] | [`train()`] and [`evaluate()`] |
//! | [`metrics`] | [`ClassificationReport`] |
//! | [`stabilizer`] | [`Stabilizer`]: temporal agreement over recent frames |
//! | [`sequence`] | [`WordTracker`]: words spelled by stable signs |
//! | [`stream`] | [`DecisionStream`], [`run_stream`], sinks and stop flag |
//! | [`source`] | Frame sources |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `annotate` | Skeleton and caption overlays (default) |
//! | `visualize` | Real-time window display (default) |
//! | `video` | Video files and capture devices |
//! | `cuda` | NVIDIA CUDA for the hand-landmark model |
//! | `coreml` | Apple `CoreML` for the hand-landmark model |

// Modules
#[cfg(feature = "annotate")]
pub mod annotate;
pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod dataset;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod hand_landmark;
pub mod io;
pub mod landmarks;
pub mod metrics;
pub mod nn;
pub mod normalizer;
pub mod preprocessing;
pub mod results;
pub mod sequence;
pub mod sink;
pub mod source;
pub mod stabilizer;
pub mod stream;
pub mod train;
pub mod visualizer;

// Re-export main types for convenience
pub use catalog::{ClassCatalog, SignConfig, TranslationTable};
pub use classifier::SignClassifier;
pub use dataset::{ClassTally, Dataset};
pub use detector::{DetectOptions, DetectionMode, PoseDetector};
pub use error::{Result, SignError};
pub use extractor::LandmarkExtractor;
pub use hand_landmark::HandLandmarkModel;
pub use landmarks::{FEATURE_DIM, FeatureVector, Landmark, LandmarkSet, NUM_LANDMARKS};
pub use metrics::ClassificationReport;
pub use nn::{HiddenLayer, InferBackend, ModelSpec, SignNet, TrainBackend};
pub use normalizer::Scaler;
pub use results::{Caption, Decision, Prediction, Probs, Speed};
pub use source::{FrameSource, Frames, Source, SourceIterator, TryFrames};
pub use sequence::{SequenceTable, WordTracker};
pub use stabilizer::Stabilizer;
pub use stream::{
    DecisionSink, DecisionStream, EndReason, Flow, StopFlag, StreamConfig, StreamSummary,
    run_stream,
};
pub use train::{EpochStats, TrainConfig, TrainingOutcome, evaluate, train};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
