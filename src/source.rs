// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame sources for the inference loop.
//!
//! [`Source`] names where frames come from (image files, directories, video
//! files, webcams). [`SourceIterator`] opens it and yields frames in order.
//! The inference loop only needs the [`FrameSource`] trait, so tests and
//! embedding applications can feed frames directly.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::{Result, SignError};

/// Represents different input sources for the inference loop.
#[derive(Debug, Clone)]
pub enum Source {
    /// Path to an image file.
    Image(PathBuf),
    /// In-memory image.
    ImageBuffer(DynamicImage),
    /// List of image paths.
    ImageList(Vec<PathBuf>),
    /// Path to a video file.
    Video(PathBuf),
    /// Webcam device index.
    Webcam(u32),
    /// Directory containing images.
    Directory(PathBuf),
    /// Glob pattern for images.
    Glob(String),
}

impl Source {
    /// Check if this source is a single image.
    #[must_use]
    pub const fn is_image(&self) -> bool {
        matches!(self, Self::Image(_) | Self::ImageBuffer(_))
    }

    /// Check if this source is a video or camera.
    #[must_use]
    pub const fn is_video(&self) -> bool {
        matches!(self, Self::Video(_) | Self::Webcam(_))
    }

    /// Check if this source is a directory, list or glob pattern.
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, Self::Directory(_) | Self::Glob(_) | Self::ImageList(_))
    }

    /// Get the path if this source has one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Image(p) | Self::Video(p) | Self::Directory(p) => Some(p),
            _ => None,
        }
    }
}

/// Convert from a string path to Source.
impl From<&str> for Source {
    fn from(s: &str) -> Self {
        if let Ok(idx) = s.parse::<u32>() {
            return Self::Webcam(idx);
        }

        if s.contains('*') {
            return Self::Glob(s.to_string());
        }

        let path = PathBuf::from(s);
        if path.is_dir() {
            return Self::Directory(path);
        }

        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if matches!(
                ext.as_str(),
                "mp4" | "avi" | "mov" | "mkv" | "wmv" | "flv" | "webm" | "m4v" | "mpeg" | "mpg"
            ) {
                return Self::Video(path);
            }
        }

        Self::Image(path)
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::from(path.to_string_lossy().as_ref())
    }
}

impl From<DynamicImage> for Source {
    fn from(img: DynamicImage) -> Self {
        Self::ImageBuffer(img)
    }
}

impl From<u32> for Source {
    fn from(idx: u32) -> Self {
        Self::Webcam(idx)
    }
}

/// A producer of frames.
///
/// `Ok(None)` means the source is exhausted; `Err` means it failed. Both end
/// the inference loop.
pub trait FrameSource {
    /// Block until the next frame is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the device or file cannot be read.
    fn read_frame(&mut self) -> Result<Option<DynamicImage>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        (**self).read_frame()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        (**self).read_frame()
    }
}

/// Adapts any iterator of images into a [`FrameSource`].
#[derive(Debug, Clone)]
pub struct Frames<I>(pub I);

impl<I: Iterator<Item = DynamicImage>> FrameSource for Frames<I> {
    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        Ok(self.0.next())
    }
}

/// Adapts an iterator of fallible reads into a [`FrameSource`].
#[derive(Debug, Clone)]
pub struct TryFrames<I>(pub I);

impl<I: Iterator<Item = Result<DynamicImage>>> FrameSource for TryFrames<I> {
    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        self.0.next().transpose()
    }
}

/// Iterator over frames from a source.
pub struct SourceIterator {
    source: Source,
    current_frame: usize,
    image_paths: Vec<PathBuf>,
    #[cfg(feature = "video")]
    decoder: Option<video_rs::decode::Decoder>,
}

impl std::fmt::Debug for SourceIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceIterator")
            .field("source", &self.source)
            .field("current_frame", &self.current_frame)
            .finish_non_exhaustive()
    }
}

impl SourceIterator {
    /// Create a new source iterator.
    ///
    /// Video files and webcams are opened here, so a missing camera fails
    /// before the first frame is requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened.
    pub fn new(source: Source) -> Result<Self> {
        let image_paths = match &source {
            Source::Directory(path) => Self::collect_images_from_dir(path)?,
            Source::Glob(pattern) => Self::collect_images_from_glob(pattern)?,
            Source::Image(path) => vec![path.clone()],
            Source::ImageList(paths) => paths.clone(),
            _ => vec![],
        };

        #[cfg(feature = "video")]
        let decoder = match &source {
            Source::Video(path) => Some(open_decoder(path)?),
            Source::Webcam(idx) => Some(open_decoder(&webcam_device(*idx))?),
            _ => None,
        };

        #[cfg(not(feature = "video"))]
        {
            if source.is_video() {
                return Err(SignError::FeatureNotEnabled(
                    "Video and webcam sources require the 'video' feature".to_string(),
                ));
            }
        }

        Ok(Self {
            source,
            current_frame: 0,
            image_paths,
            #[cfg(feature = "video")]
            decoder,
        })
    }

    /// The source being read.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    /// Collect image paths from a directory.
    fn collect_images_from_dir(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(SignError::ImageError(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| SignError::io(format!("Failed to list {}", dir.display()), e))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_image_file(path))
            .collect();

        paths.sort();
        Ok(paths)
    }

    /// Collect image paths from a `dir/*.ext` pattern.
    fn collect_images_from_glob(pattern: &str) -> Result<Vec<PathBuf>> {
        let Some(star_pos) = pattern.find('*') else {
            return Ok(vec![PathBuf::from(pattern)]);
        };

        let dir_part = &pattern[..star_pos];
        let dir = if dir_part.is_empty() {
            Path::new(".")
        } else {
            Path::new(dir_part.trim_end_matches('/').trim_end_matches('\\'))
        };
        let ext_filter: Option<String> = pattern[star_pos..]
            .strip_prefix("*.")
            .map(str::to_lowercase);

        if !dir.is_dir() {
            return Err(SignError::ImageError(format!(
                "Directory not found: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| SignError::io(format!("Failed to list {}", dir.display()), e))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                ext_filter.as_ref().map_or_else(
                    || is_image_file(path),
                    |ext| {
                        path.extension()
                            .is_some_and(|e| e.to_string_lossy().to_lowercase() == *ext)
                    },
                )
            })
            .collect();

        paths.sort();
        Ok(paths)
    }

    /// Get the next image from the source.
    fn next_image(&mut self) -> Option<Result<DynamicImage>> {
        let path = self.image_paths.get(self.current_frame)?;
        self.current_frame += 1;

        Some(image::open(path).map_err(|e| {
            SignError::ImageError(format!("Failed to load {}: {e}", path.display()))
        }))
    }

    /// Get the next video frame.
    #[cfg(feature = "video")]
    fn next_video_frame(&mut self) -> Option<Result<DynamicImage>> {
        let decoder = self.decoder.as_mut()?;
        match decoder.decode() {
            Ok((_ts, frame)) => {
                self.current_frame += 1;
                Some(video_frame_to_image(&frame))
            }
            // Decoder errors past the first frame are end of stream.
            Err(_) if self.current_frame > 0 => None,
            Err(e) => Some(Err(SignError::CameraError(format!(
                "Failed to read first frame: {e}"
            )))),
        }
    }

    #[cfg(not(feature = "video"))]
    #[allow(clippy::unused_self)]
    fn next_video_frame(&mut self) -> Option<Result<DynamicImage>> {
        Some(Err(SignError::FeatureNotEnabled(
            "Video support requires 'video' feature".to_string(),
        )))
    }
}

impl Iterator for SourceIterator {
    type Item = Result<DynamicImage>;

    fn next(&mut self) -> Option<Self::Item> {
        match &self.source {
            Source::Image(_) | Source::Directory(_) | Source::Glob(_) | Source::ImageList(_) => {
                self.next_image()
            }
            Source::ImageBuffer(img) => {
                if self.current_frame == 0 {
                    self.current_frame = 1;
                    Some(Ok(img.clone()))
                } else {
                    None
                }
            }
            Source::Video(_) | Source::Webcam(_) => self.next_video_frame(),
        }
    }
}

impl FrameSource for SourceIterator {
    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        self.next().transpose()
    }
}

/// Check if a path is an image file based on extension.
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        matches!(
            ext.as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "gif" | "webp" | "tiff" | "tif"
        )
    })
}

/// Platform capture device for a webcam index.
#[cfg(feature = "video")]
fn webcam_device(idx: u32) -> PathBuf {
    PathBuf::from(format!("/dev/video{idx}"))
}

#[cfg(feature = "video")]
fn open_decoder(path: &Path) -> Result<video_rs::decode::Decoder> {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        if let Err(e) = video_rs::init() {
            crate::warn!("Failed to initialize video-rs: {e}");
        }
    });

    video_rs::decode::Decoder::new(path).map_err(|e| {
        SignError::CameraError(format!("Failed to open {}: {e}", path.display()))
    })
}

/// Convert a `video_rs` frame (HWC RGB) to a `DynamicImage`.
#[cfg(feature = "video")]
fn video_frame_to_image(arr: &video_rs::Frame) -> Result<DynamicImage> {
    let shape = arr.shape();
    let height = u32::try_from(shape[0])
        .map_err(|_| SignError::ImageError("Image height exceeds u32::MAX".to_string()))?;
    let width = u32::try_from(shape[1])
        .map_err(|_| SignError::ImageError("Image width exceeds u32::MAX".to_string()))?;

    let rgb_data: Vec<u8> = arr.iter().copied().collect();
    let img_buffer = image::RgbImage::from_raw(width, height, rgb_data).ok_or_else(|| {
        SignError::ImageError("Failed to create image from video frame".to_string())
    })?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_string() {
        assert!(matches!(Source::from("image.jpg"), Source::Image(_)));
        assert!(matches!(Source::from("video.mp4"), Source::Video(_)));
        assert!(matches!(Source::from("0"), Source::Webcam(0)));
        assert!(matches!(Source::from("*.jpg"), Source::Glob(_)));
    }

    #[test]
    fn test_source_checks() {
        let img = Source::Image(PathBuf::from("test.jpg"));
        assert!(img.is_image());
        assert!(!img.is_video());

        let cam = Source::Webcam(1);
        assert!(cam.is_video());

        let dir = Source::Directory(PathBuf::from("./images"));
        assert!(dir.is_batch());
    }

    #[test]
    fn test_directory_frames_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("b.png", 20_u8), ("a.png", 10), ("notes.txt", 0)] {
            let path = dir.path().join(name);
            if name.ends_with(".png") {
                image::RgbImage::from_pixel(2, 2, image::Rgb([shade; 3]))
                    .save(&path)
                    .unwrap();
            } else {
                std::fs::write(&path, "skip me").unwrap();
            }
        }

        let mut frames = SourceIterator::new(Source::from(dir.path().to_path_buf())).unwrap();
        let first = frames.read_frame().unwrap().unwrap();
        assert_eq!(first.to_rgb8().get_pixel(0, 0).0, [10; 3]);
        assert!(frames.read_frame().unwrap().is_some());
        assert!(frames.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_missing_image_is_error() {
        let mut frames = SourceIterator::new(Source::Image(PathBuf::from("missing.png"))).unwrap();
        assert!(frames.read_frame().is_err());
    }

    #[test]
    fn test_frames_adapter() {
        let mut frames = Frames(vec![DynamicImage::new_rgb8(1, 1)].into_iter());
        assert!(frames.read_frame().unwrap().is_some());
        assert!(frames.read_frame().unwrap().is_none());
    }
}
