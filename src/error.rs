// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the sign captioning library.

use std::fmt;

/// Result type alias for sign captioning operations.
pub type Result<T> = std::result::Result<T, SignError>;

/// Main error type for the sign captioning library.
///
/// "No hand detected" is never an error: it travels as `None` through the
/// extractor, dataset builder and inference loop.
#[derive(Debug)]
pub enum SignError {
    /// Invalid configuration (class catalog, translations, splits, hyper-parameters).
    ConfigError(String),
    /// Degenerate numeric state (zero normalizer divisor, non-finite loss).
    NumericError(String),
    /// Error loading the hand-landmark model.
    ModelLoadError(String),
    /// Error while running the hand-landmark model.
    DetectorError(String),
    /// Dataset root missing or unreadable.
    DatasetError(String),
    /// Frame source could not be opened or read.
    CameraError(String),
    /// Error processing images.
    ImageError(String),
    /// Filesystem error, with what was being attempted.
    Io {
        /// What was being attempted, e.g. `Failed to read model.json`.
        context: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Model bundle or sign configuration (de)serialization error.
    SerializationError(String),
    /// Visualizer error.
    VisualizerError(String),
    /// Video/stream processing error.
    VideoError(String),
    /// Feature not enabled.
    FeatureNotEnabled(String),
}

impl fmt::Display for SignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::NumericError(msg) => write!(f, "Numeric error: {msg}"),
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::DetectorError(msg) => write!(f, "Detector error: {msg}"),
            Self::DatasetError(msg) => write!(f, "Dataset error: {msg}"),
            Self::CameraError(msg) => write!(f, "Camera error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::Io { context, source } if context.is_empty() => write!(f, "IO error: {source}"),
            Self::Io { context, source } => write!(f, "IO error: {context}: {source}"),
            Self::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            Self::VisualizerError(msg) => write!(f, "Visualizer error: {msg}"),
            Self::VideoError(msg) => write!(f, "Video error: {msg}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
        }
    }
}

impl std::error::Error for SignError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl SignError {
    /// Wrap an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<std::io::Error> for SignError {
    fn from(source: std::io::Error) -> Self {
        Self::io(String::new(), source)
    }
}

impl From<image::ImageError> for SignError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<serde_json::Error> for SignError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SignError::ConfigError("empty class catalog".to_string());
        assert_eq!(err.to_string(), "Config error: empty class catalog");

        let err = SignError::NumericError("divisor is zero".to_string());
        assert_eq!(err.to_string(), "Numeric error: divisor is zero");
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;

        let err = SignError::from(std::io::Error::other("boom"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "IO error: boom");
        assert!(SignError::CameraError("gone".to_string()).source().is_none());
    }

    #[test]
    fn test_io_context_keeps_source() {
        use std::error::Error;

        let err = SignError::io("Failed to read signs.json", std::io::Error::other("denied"));
        assert_eq!(err.to_string(), "IO error: Failed to read signs.json: denied");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("denied"));
    }
}
