// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Hand landmark sets and the flattened feature vectors built from them.
//!
//! A hand pose is exactly 21 ordered 3-D keypoints. The index of each keypoint
//! identifies an anatomical joint (0 = wrist, 4 = thumb tip, 8 = index tip, ...),
//! so the order is never changed after detection.

use ndarray::Array1;

use crate::error::{Result, SignError};

/// Number of landmarks in a hand pose.
pub const NUM_LANDMARKS: usize = 21;

/// Length of a flattened feature vector (21 landmarks x 3 coordinates).
pub const FEATURE_DIM: usize = NUM_LANDMARKS * 3;

/// Bone pairs of the 21-point hand skeleton (pairs of landmark indices).
pub const HAND_CONNECTIONS: [[usize; 2]; 21] = [
    [0, 1],   // wrist to thumb cmc
    [1, 2],   // thumb cmc to thumb mcp
    [2, 3],   // thumb mcp to thumb ip
    [3, 4],   // thumb ip to thumb tip
    [0, 5],   // wrist to index mcp
    [5, 6],   // index mcp to index pip
    [6, 7],   // index pip to index dip
    [7, 8],   // index dip to index tip
    [5, 9],   // index mcp to middle mcp
    [9, 10],  // middle mcp to middle pip
    [10, 11], // middle pip to middle dip
    [11, 12], // middle dip to middle tip
    [9, 13],  // middle mcp to ring mcp
    [13, 14], // ring mcp to ring pip
    [14, 15], // ring pip to ring dip
    [15, 16], // ring dip to ring tip
    [13, 17], // ring mcp to pinky mcp
    [0, 17],  // wrist to pinky mcp
    [17, 18], // pinky mcp to pinky pip
    [18, 19], // pinky pip to pinky dip
    [19, 20], // pinky dip to pinky tip
];

/// A single 3-D keypoint in detector-normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    /// Horizontal position, typically in [0, 1] of the image width.
    pub x: f32,
    /// Vertical position, typically in [0, 1] of the image height.
    pub y: f32,
    /// Depth relative to the wrist, detector-defined scale.
    pub z: f32,
}

impl Landmark {
    /// Create a new landmark.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Exactly 21 ordered hand landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Landmark; NUM_LANDMARKS],
}

impl LandmarkSet {
    /// Create a landmark set from a fixed-size array.
    #[must_use]
    pub const fn new(points: [Landmark; NUM_LANDMARKS]) -> Self {
        Self { points }
    }

    /// Create a landmark set from a slice.
    ///
    /// # Errors
    ///
    /// Returns an error unless the slice holds exactly 21 landmarks.
    pub fn from_slice(points: &[Landmark]) -> Result<Self> {
        let points: [Landmark; NUM_LANDMARKS] = points.try_into().map_err(|_| {
            SignError::DetectorError(format!(
                "expected {NUM_LANDMARKS} landmarks, got {}",
                points.len()
            ))
        })?;
        Ok(Self { points })
    }

    /// Create a landmark set from 63 interleaved `x, y, z` values.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly 63 values are given.
    pub fn from_flat(values: &[f32]) -> Result<Self> {
        if values.len() != FEATURE_DIM {
            return Err(SignError::DetectorError(format!(
                "expected {FEATURE_DIM} landmark coordinates, got {}",
                values.len()
            )));
        }
        let mut points = [Landmark::default(); NUM_LANDMARKS];
        for (point, xyz) in points.iter_mut().zip(values.chunks_exact(3)) {
            *point = Landmark::new(xyz[0], xyz[1], xyz[2]);
        }
        Ok(Self { points })
    }

    /// Landmarks in joint order.
    #[must_use]
    pub const fn points(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.points
    }

    /// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` of the x/y coordinates.
    #[must_use]
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        self.points.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }

    /// Flatten into a feature vector.
    #[must_use]
    pub fn to_features(&self) -> FeatureVector {
        FeatureVector::from(self)
    }
}

/// Flattened landmark coordinates: `[x0, y0, z0, x1, y1, z1, ..., x20, y20, z20]`.
///
/// Always exactly 63 values. Absence of a hand is `Option::None` at the call
/// site, never a zero vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_DIM]);

impl FeatureVector {
    /// Create a feature vector from a slice of 63 values.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly 63 values are given.
    pub fn from_slice(values: &[f32]) -> Result<Self> {
        let values: [f32; FEATURE_DIM] = values.try_into().map_err(|_| {
            SignError::ConfigError(format!(
                "feature vector must have {FEATURE_DIM} values, got {}",
                values.len()
            ))
        })?;
        Ok(Self(values))
    }

    /// Feature values in order.
    #[must_use]
    pub const fn as_slice(&self) -> &[f32; FEATURE_DIM] {
        &self.0
    }

    /// Copy into an `ndarray` vector.
    #[must_use]
    pub fn to_array(&self) -> Array1<f32> {
        Array1::from_vec(self.0.to_vec())
    }

    /// Number of features (always 63).
    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn len(&self) -> usize {
        FEATURE_DIM
    }

    /// Always false: a feature vector is never empty.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl From<&LandmarkSet> for FeatureVector {
    fn from(set: &LandmarkSet) -> Self {
        let mut values = [0.0; FEATURE_DIM];
        for (chunk, p) in values.chunks_exact_mut(3).zip(set.points.iter()) {
            chunk[0] = p.x;
            chunk[1] = p.y;
            chunk[2] = p.z;
        }
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn ramp_set() -> LandmarkSet {
        let values: Vec<f32> = (0..FEATURE_DIM).map(|i| i as f32 * 0.01).collect();
        LandmarkSet::from_flat(&values).unwrap()
    }

    #[test]
    fn test_flatten_order() {
        let set = ramp_set();
        let features = set.to_features();

        assert_eq!(features.len(), FEATURE_DIM);
        // landmark 2 is (0.06, 0.07, 0.08)
        assert!((features.as_slice()[6] - 0.06).abs() < 1e-6);
        assert!((features.as_slice()[7] - 0.07).abs() < 1e-6);
        assert!((features.as_slice()[8] - 0.08).abs() < 1e-6);
        assert_eq!(set.points()[2], Landmark::new(0.06, 0.07, 0.08));
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let set = ramp_set();
        assert_eq!(set.to_features(), set.to_features());
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        assert!(LandmarkSet::from_slice(&[Landmark::default(); 20]).is_err());
        assert!(LandmarkSet::from_flat(&[0.0; 62]).is_err());
        assert!(FeatureVector::from_slice(&[0.0; 64]).is_err());
        assert!(FeatureVector::from_slice(&[0.0; FEATURE_DIM]).is_ok());
    }

    #[test]
    fn test_bounds() {
        let mut points = [Landmark::new(0.5, 0.5, 0.0); NUM_LANDMARKS];
        points[3] = Landmark::new(0.2, 0.9, 0.0);
        points[7] = Landmark::new(0.8, 0.1, 0.0);
        let (x0, y0, x1, y1) = LandmarkSet::new(points).bounds();

        assert!((x0 - 0.2).abs() < 1e-6);
        assert!((y0 - 0.1).abs() < 1e-6);
        assert!((x1 - 0.8).abs() < 1e-6);
        assert!((y1 - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_skeleton_indices_in_range() {
        assert!(
            HAND_CONNECTIONS
                .iter()
                .all(|[a, b]| *a < NUM_LANDMARKS && *b < NUM_LANDMARKS)
        );
    }
}
