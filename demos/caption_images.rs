// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Caption a folder of images with a trained classifier and save the overlays.
//!
//! ```bash
//! cargo run --example caption_images -- sign_model.json hand_landmark.onnx frames/ NotoSans.ttf
//! ```
//!
//! Frames without a hand are saved unchanged; frames with a hand get the
//! skeleton and, when a font is given, the sign and its translations.

use std::env;

use sign_caption::annotate::Annotator;
use sign_caption::io::{FrameSaver, find_next_run_dir};
use sign_caption::sink::SaveSink;
use sign_caption::{
    DecisionStream, HandLandmarkModel, Result, SignClassifier, SignConfig, Source,
    SourceIterator, StopFlag, StreamConfig, run_stream,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let [model, detector, frames, rest @ ..] = args.as_slice() else {
        eprintln!("usage: caption_images <model.json> <hand_landmark.onnx> <frames> [font]");
        std::process::exit(2);
    };

    // 1. Load the classifier bundle and the detector
    let classifier = SignClassifier::load(model)?;
    let detector = HandLandmarkModel::load(detector)?;

    // 2. Build the decision stream over the image folder
    let stream = DecisionStream::new(
        SourceIterator::new(Source::from(frames.as_str()))?,
        detector,
        classifier,
        SignConfig::default(),
        StreamConfig::default(),
    )?;

    // 3. Annotate and save every frame
    let annotator = match rest.first() {
        Some(font) => Annotator::with_font_file(font)?,
        None => Annotator::new(),
    };
    let out_dir = find_next_run_dir("runs/caption", "demo");
    let mut sink = SaveSink::new(annotator, FrameSaver::new(&out_dir, false)?);

    let summary = run_stream(stream, &mut sink, &StopFlag::new())?;
    let dir = sink.finish()?;

    println!("{summary}");
    println!("Saved annotated frames to {}", dir.display());
    Ok(())
}
