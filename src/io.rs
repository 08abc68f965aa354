// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Saving annotated frames: numbered run directories, image files and video.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::{Result, SignError};

#[cfg(feature = "video")]
use video_rs::{Encoder, Time, encode::Settings as EncoderSettings};

/// Find the first free run directory: `base/prefix`, then `base/prefix2`, ...
#[must_use]
pub fn find_next_run_dir<P: AsRef<Path>>(base: P, prefix: &str) -> PathBuf {
    let base = base.as_ref();

    let first = base.join(prefix);
    if !first.exists() {
        return first;
    }

    (2..)
        .map(|i| base.join(format!("{prefix}{i}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Wraps the `video-rs` encoder.
#[cfg(feature = "video")]
pub struct VideoWriter {
    encoder: Encoder,
    frame_duration: Time,
    position: Time,
    width: usize,
    height: usize,
}

#[cfg(feature = "video")]
impl VideoWriter {
    /// Create an H.264 writer for frames of the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot be initialized.
    pub fn new<P: AsRef<Path>>(path: P, width: usize, height: usize, fps: f32) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            create_dir(parent)?;
        }

        let settings = EncoderSettings::preset_h264_yuv420p(width, height, false);
        let encoder = Encoder::new(path, settings).map_err(|e| {
            SignError::VideoError(format!("Failed to create video encoder: {e}"))
        })?;

        Ok(Self {
            encoder,
            frame_duration: Time::from_secs_f64(1.0 / f64::from(fps)),
            position: Time::zero(),
            width,
            height,
        })
    }

    /// Append one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the frame size differs.
    pub fn write_frame(&mut self, frame: &DynamicImage) -> Result<()> {
        let rgb = frame.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        if width != self.width || height != self.height {
            return Err(SignError::VideoError(format!(
                "Frame dimensions {width}x{height} do not match video dimensions {}x{}",
                self.width, self.height
            )));
        }

        let frame = ndarray::Array3::from_shape_vec((height, width, 3), rgb.into_raw())
            .map_err(|e| SignError::VideoError(e.to_string()))?;
        self.encoder
            .encode(&frame, self.position)
            .map_err(|e| SignError::VideoError(format!("Failed to encode frame: {e}")))?;
        self.position = self.position.aligned_with(self.frame_duration).add();
        Ok(())
    }

    /// Flush and close the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails to finish.
    pub fn finish(mut self) -> Result<()> {
        self.encoder
            .finish()
            .map_err(|e| SignError::VideoError(format!("Failed to finish video encoding: {e}")))
    }
}

/// Writes annotated frames into a run directory.
///
/// Frames go to `frame_000000.jpg`, `frame_000001.jpg`, ... unless video
/// output was requested, in which case they are encoded into `caption.mp4`.
pub struct FrameSaver {
    dir: PathBuf,
    video: bool,
    saved: usize,
    #[cfg(feature = "video")]
    writer: Option<VideoWriter>,
}

impl std::fmt::Debug for FrameSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSaver")
            .field("dir", &self.dir)
            .field("video", &self.video)
            .field("saved", &self.saved)
            .finish_non_exhaustive()
    }
}

impl FrameSaver {
    /// Create a saver writing into `dir` (created on first save).
    ///
    /// # Errors
    ///
    /// Returns [`SignError::FeatureNotEnabled`] when video output is requested
    /// without the `video` feature.
    pub fn new<P: Into<PathBuf>>(dir: P, video: bool) -> Result<Self> {
        if video && !cfg!(feature = "video") {
            return Err(SignError::FeatureNotEnabled(
                "video output requires the 'video' feature".to_string(),
            ));
        }
        Ok(Self {
            dir: dir.into(),
            video,
            saved: 0,
            #[cfg(feature = "video")]
            writer: None,
        })
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of frames written so far.
    #[must_use]
    pub const fn saved(&self) -> usize {
        self.saved
    }

    /// Save one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, image or video cannot be written.
    pub fn save(&mut self, frame_idx: usize, frame: &DynamicImage) -> Result<()> {
        create_dir(&self.dir)?;

        #[cfg(feature = "video")]
        if self.video {
            if self.writer.is_none() {
                let (w, h) = (frame.width() as usize, frame.height() as usize);
                self.writer = Some(VideoWriter::new(self.dir.join("caption.mp4"), w, h, 30.0)?);
            }
            if let Some(writer) = &mut self.writer {
                writer.write_frame(frame)?;
            }
            self.saved += 1;
            return Ok(());
        }

        let path = self.dir.join(format!("frame_{frame_idx:06}.jpg"));
        frame.to_rgb8().save(&path).map_err(|e| {
            SignError::ImageError(format!("Failed to save {}: {e}", path.display()))
        })?;
        self.saved += 1;
        Ok(())
    }

    /// Finish any open video.
    ///
    /// # Errors
    ///
    /// Returns an error if the video encoder fails to finish.
    #[allow(clippy::missing_const_for_fn)]
    pub fn finish(self) -> Result<()> {
        #[cfg(feature = "video")]
        if let Some(writer) = self.writer {
            writer.finish()?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        SignError::io(format!("Failed to create directory {}", dir.display()), e)
    })
}
