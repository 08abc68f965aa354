// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::Path;

use crate::classifier::SignClassifier;
use crate::cli::args::EvaluateArgs;
use crate::cli::load_detector;
use crate::dataset::Dataset;
use crate::detector::DetectOptions;
use crate::error::Result;
use crate::extractor::LandmarkExtractor;
use crate::train::evaluate;
use crate::{info, section};

/// Score a saved classifier on a labeled directory and print the report.
///
/// # Errors
///
/// Returns an error if the classifier, detector or dataset cannot be loaded,
/// or the directory yields no samples.
pub fn run_evaluation(args: &EvaluateArgs) -> Result<()> {
    let classifier = SignClassifier::load(&args.model)?;
    let detector = load_detector(&args.detector)?;
    let mut extractor = LandmarkExtractor::new(
        detector,
        DetectOptions::single_shot().with_min_confidence(args.conf),
    );

    section!("Extracting landmarks from {}", args.data);
    let split = Dataset::build(Path::new(&args.data), classifier.classes(), &mut extractor)?;

    let report = evaluate(&classifier, &split)?;
    section!("Classification report");
    info!("{report}");
    Ok(())
}
