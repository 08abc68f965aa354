// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::landmarks::NUM_LANDMARKS;

/// Color type for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// White color.
    pub const WHITE: Self = Self(255, 255, 255);
    /// Black color.
    pub const BLACK: Self = Self(0, 0, 0);
    /// Caption background.
    pub const CAPTION_BG: Self = Self(17, 31, 104);

    /// Create a new color from RGB values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Get a color from the pose palette by index.
    #[must_use]
    pub const fn from_pose_index(index: usize) -> Self {
        let color = POSE_COLORS[index % POSE_COLORS.len()];
        Self(color[0], color[1], color[2])
    }

    /// Color of the finger a landmark belongs to.
    #[must_use]
    pub const fn for_landmark(index: usize) -> Self {
        Self::from_pose_index(FINGER_COLOR_INDICES[index % NUM_LANDMARKS])
    }

    /// As an `image` pixel.
    #[must_use]
    pub const fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.0, self.1, self.2])
    }
}

/// Ultralytics Pose Color Palette
pub const POSE_COLORS: [[u8; 3]; 20] = [
    [255, 128, 0],   // #ff8000
    [255, 153, 51],  // #ff9933
    [255, 178, 102], // #ffb266
    [230, 230, 0],   // #e6e600
    [255, 153, 255], // #ff99ff
    [153, 204, 255], // #99ccff
    [255, 102, 255], // #ff66ff
    [255, 51, 255],  // #ff33ff
    [102, 178, 255], // #66b2ff
    [51, 153, 255],  // #3399ff
    [255, 153, 153], // #ff9999
    [255, 102, 102], // #ff6666
    [255, 51, 51],   // #ff3333
    [153, 255, 153], // #99ff99
    [102, 255, 102], // #66ff66
    [51, 255, 51],   // #33ff33
    [0, 255, 0],     // #00ff00
    [0, 0, 255],     // #0000ff
    [255, 0, 0],     // #ff0000
    [255, 255, 255], // #ffffff
];

/// `POSE_COLORS` index per landmark: wrist white, then one color per finger
/// (thumb, index, middle, ring, pinky).
pub const FINGER_COLOR_INDICES: [usize; NUM_LANDMARKS] = [
    19, 0, 0, 0, 0, 9, 9, 9, 9, 16, 16, 16, 16, 7, 7, 7, 7, 12, 12, 12, 12,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finger_colors() {
        assert_eq!(Color::for_landmark(0), Color::WHITE);
        assert_eq!(Color::for_landmark(4), Color::for_landmark(1));
        assert_ne!(Color::for_landmark(8), Color::for_landmark(12));
    }
}
