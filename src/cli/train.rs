// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::Path;
use std::time::Instant;

use crate::cli::args::TrainArgs;
use crate::classifier::SignClassifier;
use crate::cli::{load_detector, load_signs};
use crate::dataset::Dataset;
use crate::detector::DetectOptions;
use crate::error::Result;
use crate::extractor::LandmarkExtractor;
use crate::train::{TrainConfig, train};
use crate::{VERSION, info, section, success, verbose};

/// Build both splits, train, print the report and save the classifier.
///
/// # Errors
///
/// Returns the first dataset, configuration, numeric or I/O error.
pub fn run_training(args: &TrainArgs) -> Result<()> {
    let signs = load_signs(args.signs.as_deref())?;
    let detector = load_detector(&args.detector)?;
    let mut extractor = LandmarkExtractor::new(
        detector,
        DetectOptions::single_shot().with_min_confidence(args.conf),
    );

    verbose!(
        "sign-caption {VERSION} 🚀 training on {} classes: {}",
        signs.classes.len(),
        signs.classes.names().join(", ")
    );

    let root = Path::new(&args.data);
    let start = Instant::now();
    section!("Extracting landmarks from {}", root.join("train").display());
    let train_split = Dataset::build(&root.join("train"), &signs.classes, &mut extractor)?;
    section!("Extracting landmarks from {}", root.join("test").display());
    let test_split = Dataset::build(&root.join("test"), &signs.classes, &mut extractor)?;
    verbose!(
        "{} training and {} test samples in {:.1}s",
        train_split.len(),
        test_split.len(),
        start.elapsed().as_secs_f64()
    );

    let config = TrainConfig::new()
        .with_epochs(args.epochs)
        .with_batch_size(args.batch)
        .with_learning_rate(args.lr)
        .with_seed(args.seed)
        .with_verbose(args.verbose);

    section!("Training");
    let outcome = train(&signs.classes, &train_split, &test_split, &config)?;

    section!("Classification report (test split)");
    info!("{}", outcome.report);

    outcome.classifier.save(&args.output)?;
    success!(
        "Saved classifier to {} (weights {})",
        args.output,
        SignClassifier::weights_path(Path::new(&args.output)).display()
    );
    Ok(())
}
