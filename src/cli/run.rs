// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::classifier::SignClassifier;
use crate::cli::args::RunArgs;
use crate::cli::{load_detector, load_signs};
use crate::detector::DetectOptions;
use crate::error::{Result, SignError};
use crate::source::{Source, SourceIterator};
use crate::stream::{DecisionSink, DecisionStream, EndReason, StopFlag, StreamConfig, run_stream};
use crate::sink::ConsoleSink;
use crate::{VERSION, success, verbose, warn};

#[cfg(feature = "annotate")]
use crate::annotate::Annotator;
#[cfg(feature = "annotate")]
use crate::io::{FrameSaver, find_next_run_dir};
#[cfg(feature = "annotate")]
use crate::sink::SaveSink;
#[cfg(feature = "visualize")]
use crate::sink::ViewerSink;

/// Run the live captioning loop.
///
/// # Errors
///
/// Returns an error if configuration, models or the source cannot be opened,
/// if a sink fails, or if the source fails mid-run.
pub fn run_captioning(args: &RunArgs) -> Result<()> {
    let classifier = SignClassifier::load(&args.model)?;
    let signs = load_signs(args.signs.as_deref())?;
    let detector = load_detector(&args.detector)?;

    let source = Source::from(args.source.as_str());
    verbose!(
        "sign-caption {VERSION} 🚀 {} signs, source {source:?}",
        classifier.classes().len()
    );
    let frames = SourceIterator::new(source)?;

    let config = StreamConfig::new()
        .with_detect(DetectOptions::streaming().with_min_confidence(args.conf));
    let stream = DecisionStream::new(frames, detector, classifier, signs, config)?;

    let mut sinks: Vec<Box<dyn DecisionSink>> = vec![Box::new(ConsoleSink::new())];

    #[cfg(feature = "annotate")]
    let annotator = || -> Result<Annotator> {
        match &args.font {
            Some(font) => Annotator::with_font_file(font),
            None => Ok(Annotator::new()),
        }
    };
    #[cfg(feature = "annotate")]
    if args.font.is_none() && (args.show || args.save) {
        warn!("No --font given, captions will not be drawn on frames");
    }

    #[cfg(feature = "visualize")]
    if args.show {
        sinks.push(Box::new(ViewerSink::new("sign-caption", annotator()?)));
    }
    #[cfg(not(feature = "visualize"))]
    if args.show {
        warn!("--show requires the 'visualize' feature, ignoring");
    }

    #[cfg(feature = "annotate")]
    let save_dir = if args.save {
        let dir = find_next_run_dir("runs/caption", "run");
        sinks.push(Box::new(SaveSink::new(
            annotator()?,
            FrameSaver::new(&dir, args.save_video)?,
        )));
        Some(dir)
    } else {
        None
    };
    #[cfg(not(feature = "annotate"))]
    if args.save {
        warn!("--save requires the 'annotate' feature, ignoring");
    }

    let stop = StopFlag::new();
    let summary = run_stream(stream, &mut sinks, &stop)?;
    // closes any open video
    drop(sinks);

    verbose!("{summary}");
    #[cfg(feature = "annotate")]
    if let Some(dir) = save_dir {
        success!("Results saved to {}", dir.display());
    }

    match summary.end {
        EndReason::SourceFailed(e) => Err(SignError::CameraError(format!("frame source failed: {e}"))),
        EndReason::Stopped | EndReason::SourceExhausted => Ok(()),
    }
}
