// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame overlays: hand skeleton, keypoints and caption text.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use std::fs;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;

use crate::error::{Result, SignError};
use crate::landmarks::{HAND_CONNECTIONS, LandmarkSet};
use crate::results::Decision;
use crate::visualizer::Color;

/// Maximum number of caption lines (sign, then translations).
pub const MAX_CAPTION_LINES: usize = 3;

/// Draws decisions onto frames.
///
/// Without a font only the skeleton is drawn. Captions in scripts such as
/// Devanagari need a font that covers them.
#[derive(Default)]
pub struct Annotator {
    font: Option<FontVec>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl Annotator {
    /// Skeleton-only annotator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotator that also draws captions with the given TrueType/OpenType font.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a font.
    pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            SignError::io(format!("Failed to read font {}", path.display()), e)
        })?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            SignError::ConfigError(format!("Invalid font file {}: {e}", path.display()))
        })?;
        Ok(Self { font: Some(font) })
    }

    /// Whether caption text will be drawn.
    #[must_use]
    pub const fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Annotate a decision's frame.
    #[must_use]
    pub fn annotate(&self, decision: &Decision) -> DynamicImage {
        let mut img = decision.frame.to_rgb8();

        if let Some(caption) = &decision.caption {
            draw_hand(&mut img, &caption.landmarks);
        }

        if let Some(font) = &self.font {
            let lines = caption_lines(decision);
            let scale = PxScale::from((img.height() as f32 / 18.0).clamp(14.0, 48.0));
            let margin = (scale.y * 0.3) as i32;
            let mut y = margin;
            for line in &lines {
                let (w, h) = text_size(scale, font, line);
                let line_h = h.max(1) + 2 * margin as u32;
                draw_filled_rect_mut(
                    &mut img,
                    Rect::at(0, y - margin).of_size(w + 2 * margin as u32, line_h),
                    Color::CAPTION_BG.to_rgb(),
                );
                draw_text_mut(&mut img, Color::WHITE.to_rgb(), margin, y, scale, font, line);
                y += line_h as i32;
            }
        }

        DynamicImage::ImageRgb8(img)
    }
}

/// Caption text for a decision: `"<sign> <confidence>"` followed by its
/// translations in language-code order, at most [`MAX_CAPTION_LINES`] lines.
#[must_use]
pub fn caption_lines(decision: &Decision) -> Vec<String> {
    let Some(caption) = &decision.caption else {
        return Vec::new();
    };

    let mut head = format!("{} {:.2}", caption.label, caption.confidence);
    if decision.stable.as_deref() == Some(caption.label.as_str()) {
        head.push_str(" *");
    }
    std::iter::once(head)
        .chain(caption.translations.iter().map(|(lang, text)| format!("{lang}: {text}")))
        .take(MAX_CAPTION_LINES)
        .collect()
}

/// Draw bones and keypoints of one hand (landmarks normalized to the image).
pub fn draw_hand(img: &mut RgbImage, hand: &LandmarkSet) {
    let (w, h) = (img.width() as f32, img.height() as f32);
    let points: Vec<(f32, f32)> = hand.points().iter().map(|p| (p.x * w, p.y * h)).collect();
    let radius = ((w.min(h) / 120.0) as i32).max(2);

    for [a, b] in HAND_CONNECTIONS {
        draw_line_segment_mut(img, points[a], points[b], Color::for_landmark(b).to_rgb());
    }
    for (i, &(x, y)) in points.iter().enumerate() {
        if (0.0..w).contains(&x) && (0.0..h).contains(&y) {
            draw_filled_circle_mut(img, (x as i32, y as i32), radius, Color::for_landmark(i).to_rgb());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Landmark, NUM_LANDMARKS};
    use crate::results::{Caption, Probs, Speed};
    use ndarray::array;
    use std::collections::BTreeMap;

    fn decision(with_hand: bool) -> Decision {
        let mut points = [Landmark::new(0.5, 0.5, 0.0); NUM_LANDMARKS];
        points[8] = Landmark::new(0.6, 0.2, 0.0);
        let caption = with_hand.then(|| Caption {
            class_index: 0,
            label: "A".to_string(),
            confidence: 0.91,
            probs: Probs::new(array![0.91, 0.05, 0.04]),
            translations: BTreeMap::from([
                ("en".to_string(), "Apple".to_string()),
                ("hi".to_string(), "सेब".to_string()),
                ("fr".to_string(), "Pomme".to_string()),
            ]),
            landmarks: LandmarkSet::new(points),
        });
        Decision {
            frame_idx: 0,
            frame: DynamicImage::new_rgb8(64, 48),
            caption,
            stable: Some("A".to_string()),
            word: None,
            speed: Speed::default(),
        }
    }

    #[test]
    fn test_caption_lines() {
        let lines = caption_lines(&decision(true));
        assert_eq!(lines.len(), MAX_CAPTION_LINES);
        assert_eq!(lines[0], "A 0.91 *");
        assert_eq!(lines[1], "en: Apple");
        assert_eq!(lines[2], "fr: Pomme");
        assert!(caption_lines(&decision(false)).is_empty());
    }

    #[test]
    fn test_skeleton_drawn_without_font() {
        let annotator = Annotator::new();
        assert!(!annotator.has_font());

        let out = annotator.annotate(&decision(true)).to_rgb8();
        assert_eq!(out.dimensions(), (64, 48));
        assert_ne!(out.get_pixel(32, 24).0, [0, 0, 0]);

        let untouched = annotator.annotate(&decision(false)).to_rgb8();
        assert!(untouched.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_bad_font_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font.ttf");
        fs::write(&path, b"not a font").unwrap();
        assert!(Annotator::with_font_file(&path).is_err());
        assert!(Annotator::with_font_file(dir.path().join("missing.ttf")).is_err());
    }
}
