// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface: argument parsing, console logging and the
//! `train`, `run` and `evaluate` commands.

/// CLI arguments.
pub mod args;

/// `evaluate` command.
pub mod evaluate;

/// Console logging macros.
pub mod logging;

/// `run` command.
pub mod run;

/// `train` command.
pub mod train;

use crate::catalog::SignConfig;
use crate::error::Result;
use crate::hand_landmark::HandLandmarkModel;
use crate::{verbose, warn};

/// Load the sign configuration, or the built-in A/B/C table when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn load_signs(path: Option<&str>) -> Result<SignConfig> {
    match path {
        Some(path) => {
            let signs = SignConfig::load(path)?;
            verbose!("Loaded {} signs from {path}", signs.classes.len());
            Ok(signs)
        }
        None => {
            warn!("'signs' argument is missing. Using the built-in A/B/C sign table.");
            Ok(SignConfig::default())
        }
    }
}

/// Load the hand-landmark model.
///
/// # Errors
///
/// Returns an error if the model cannot be loaded.
pub fn load_detector(path: &str) -> Result<HandLandmarkModel> {
    let model = HandLandmarkModel::load(path)?;
    verbose!("Loaded hand-landmark model {path}");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_signs() {
        let signs = load_signs(None).unwrap();
        assert_eq!(signs.classes.names(), ["A", "B", "C"]);
        assert!(signs.validate().is_ok());
    }

    #[test]
    fn test_missing_signs_file() {
        assert!(load_signs(Some("does/not/exist.json")).is_err());
    }

    #[test]
    fn test_missing_detector() {
        assert!(load_detector("does/not/exist.onnx").is_err());
    }
}
