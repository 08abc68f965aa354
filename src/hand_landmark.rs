// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX hand-landmark model.
//!
//! Runs a single-hand landmark network through ONNX Runtime. The network takes
//! a `1x224x224x3` RGB tensor in [0, 1] and returns 63 landmark coordinates in
//! input pixels plus a hand-presence score. Landmarks are mapped back to
//! image-normalized coordinates before they leave this module.
//!
//! In streaming mode the model tracks: the hand found in one frame defines a
//! square region of interest that is cropped from the next frame. When the
//! hand is lost inside the region, the region is dropped and the full frame is
//! tried once more.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::detector::{DetectOptions, DetectionMode, PoseDetector};
use crate::error::{Result, SignError};
use crate::landmarks::{FEATURE_DIM, Landmark, LandmarkSet, NUM_LANDMARKS};
use crate::preprocessing::preprocess_nhwc;
use crate::verbose;

/// Side of the square network input.
pub const INPUT_SIZE: usize = 224;

/// Extra context around the tracked hand, as a fraction of its larger side.
const ROI_MARGIN: f32 = 0.5;

/// Square crop in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Side length.
    pub size: u32,
}

impl Roi {
    /// Square region around normalized landmarks, expanded by the margin and
    /// clamped to the image. `None` if the hand is degenerate.
    #[must_use]
    pub fn around(landmarks: &LandmarkSet, width: u32, height: u32) -> Option<Self> {
        let (x0, y0, x1, y1) = landmarks.bounds();
        let (w, h) = (width as f32, height as f32);
        let (cx, cy) = ((x0 + x1) * 0.5 * w, (y0 + y1) * 0.5 * h);
        let side = ((x1 - x0) * w).max((y1 - y0) * h) * (1.0 + 2.0 * ROI_MARGIN);
        let side = side.min(w).min(h);
        if !side.is_finite() || side < 2.0 {
            return None;
        }

        let left = (cx - side * 0.5).clamp(0.0, w - side);
        let top = (cy - side * 0.5).clamp(0.0, h - side);
        Some(Self {
            x: left as u32,
            y: top as u32,
            size: side as u32,
        })
    }
}

/// Hand-landmark detector backed by an ONNX Runtime session.
///
/// # Example
///
/// ```no_run
/// use sign_caption::{DetectOptions, HandLandmarkModel, PoseDetector};
///
/// let mut model = HandLandmarkModel::load("hand_landmark.onnx")?;
/// let image = image::open("hand.jpg")?;
/// let hands = model.detect(&image, &DetectOptions::single_shot())?;
/// println!("{} hand(s)", hands.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct HandLandmarkModel {
    session: Session,
    input_name: String,
    landmarks_output: String,
    presence_output: Option<String>,
    roi: Option<Roi>,
}

impl std::fmt::Debug for HandLandmarkModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandLandmarkModel")
            .field("input_name", &self.input_name)
            .field("landmarks_output", &self.landmarks_output)
            .field("presence_output", &self.presence_output)
            .field("roi", &self.roi)
            .finish_non_exhaustive()
    }
}

impl HandLandmarkModel {
    /// Load a model, letting ONNX Runtime pick the thread count.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or the session cannot be built.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_threads(path, 0)
    }

    /// Load a model with an explicit intra-op thread count (0 = automatic).
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or the session cannot be built.
    pub fn load_with_threads<P: AsRef<Path>>(path: P, num_threads: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SignError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        #[allow(unused_mut)]
        let mut builder = Session::builder().map_err(|e| {
            SignError::ModelLoadError(format!("Failed to create session builder: {e}"))
        })?;

        #[cfg(feature = "coreml")]
        {
            use ort::execution_providers::CoreMLExecutionProvider;
            builder = builder
                .with_execution_providers([CoreMLExecutionProvider::default().build()])
                .map_err(|e| SignError::ModelLoadError(format!("Failed to register CoreML EP: {e}")))?;
        }

        #[cfg(feature = "cuda")]
        {
            use ort::execution_providers::CUDAExecutionProvider;
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| SignError::ModelLoadError(format!("Failed to register CUDA EP: {e}")))?;
        }

        let session = builder
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| SignError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(num_threads)
            .map_err(|e| SignError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
            .commit_from_file(path)
            .map_err(|e| SignError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| SignError::ModelLoadError("model has no inputs".to_string()))?;
        let mut output_names = session.outputs.iter().map(|o| o.name.clone());
        let landmarks_output = output_names
            .next()
            .ok_or_else(|| SignError::ModelLoadError("model has no outputs".to_string()))?;
        let presence_output = output_names.next();

        verbose!(
            "Loaded hand landmark model {} (input '{input_name}', outputs '{landmarks_output}'{})",
            path.display(),
            presence_output
                .as_ref()
                .map(|p| format!(", '{p}'"))
                .unwrap_or_default()
        );

        Ok(Self {
            session,
            input_name,
            landmarks_output,
            presence_output,
            roi: None,
        })
    }

    /// Region tracked from the previous streaming frame.
    #[must_use]
    pub const fn roi(&self) -> Option<Roi> {
        self.roi
    }

    /// Run the network on one image.
    ///
    /// Returns `(coordinates, presence)` with coordinates in input pixels.
    fn run_inference(&mut self, input: &Array4<f32>) -> Result<(Vec<f32>, f32)> {
        let input_contiguous = input.as_standard_layout();
        let input_tensor = TensorRef::from_array_view(&input_contiguous)
            .map_err(|e| SignError::DetectorError(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| SignError::DetectorError(format!("Hand landmark inference failed: {e}")))?;

        let coords = outputs
            .get(self.landmarks_output.as_str())
            .ok_or_else(|| {
                SignError::DetectorError(format!("Output '{}' not found", self.landmarks_output))
            })?
            .try_extract_tensor::<f32>()
            .map_err(|e| SignError::DetectorError(format!("Failed to extract landmarks: {e}")))?
            .1
            .to_vec();

        let presence = match &self.presence_output {
            Some(name) => outputs
                .get(name.as_str())
                .and_then(|v| v.try_extract_tensor::<f32>().ok())
                .and_then(|(_, data)| data.first().copied())
                .map_or(0.0, presence_probability),
            None => 1.0,
        };

        Ok((coords, presence))
    }

    /// Detect one hand in `image`; coordinates normalized to the full frame
    /// whose size is `frame`, after offsetting by `origin`.
    fn detect_in(
        &mut self,
        image: &DynamicImage,
        origin: (u32, u32),
        frame: (u32, u32),
        min_confidence: f32,
    ) -> Result<Option<LandmarkSet>> {
        let prep = preprocess_nhwc(image, INPUT_SIZE)?;
        let (coords, presence) = self.run_inference(&prep.tensor)?;
        if presence < min_confidence {
            return Ok(None);
        }
        if coords.len() < FEATURE_DIM {
            return Err(SignError::DetectorError(format!(
                "expected {FEATURE_DIM} landmark values, model returned {}",
                coords.len()
            )));
        }

        let (frame_w, frame_h) = (frame.0 as f32, frame.1 as f32);
        let mut points = [Landmark::default(); NUM_LANDMARKS];
        for (point, xyz) in points.iter_mut().zip(coords.chunks_exact(3)) {
            let (x, y) = prep.letterbox.unproject(xyz[0], xyz[1]);
            *point = Landmark::new(
                (x + origin.0 as f32) / frame_w,
                (y + origin.1 as f32) / frame_h,
                prep.letterbox.unproject_depth(xyz[2]) / frame_w,
            );
        }
        Ok(Some(LandmarkSet::new(points)))
    }
}

/// Presence heads export either a probability or a logit.
fn presence_probability(raw: f32) -> f32 {
    if (0.0..=1.0).contains(&raw) {
        raw
    } else {
        1.0 / (1.0 + (-raw).exp())
    }
}

impl PoseDetector for HandLandmarkModel {
    fn detect(&mut self, image: &DynamicImage, options: &DetectOptions) -> Result<Vec<LandmarkSet>> {
        if options.max_hands == 0 {
            return Ok(Vec::new());
        }
        let (width, height) = image.dimensions();

        let tracked = match (options.mode, self.roi) {
            (DetectionMode::Streaming, Some(roi)) => {
                let crop = image.crop_imm(roi.x, roi.y, roi.size, roi.size);
                let found =
                    self.detect_in(&crop, (roi.x, roi.y), (width, height), options.min_confidence)?;
                if found.is_none() {
                    verbose!("hand lost in tracked region, retrying full frame");
                    self.roi = None;
                }
                found
            }
            _ => None,
        };

        let hand = match tracked {
            Some(hand) => Some(hand),
            None => self.detect_in(image, (0, 0), (width, height), options.min_confidence)?,
        };

        self.roi = match (options.mode, &hand) {
            (DetectionMode::Streaming, Some(hand)) => Roi::around(hand, width, height),
            _ => None,
        };

        Ok(hand.into_iter().collect())
    }

    fn reset(&mut self) {
        self.roi = None;
    }
}
