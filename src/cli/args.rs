// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    sign-caption train --data dataset --detector hand_landmark.onnx --output model.json
    sign-caption evaluate --model model.json --data dataset/test --detector hand_landmark.onnx
    sign-caption run --model model.json --detector hand_landmark.onnx --source 0 --show
    sign-caption run -m model.json -d hand_landmark.onnx -s frames/ --save --font NotoSans.ttf

Dataset layout:
    <data>/train/<sign>/*.jpg and <data>/test/<sign>/*.jpg, one directory per sign
    listed in the sign configuration (--signs, default A/B/C)."#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the dataset, train a classifier and save it
    Train(TrainArgs),
    /// Caption a live camera, video or image sequence
    Run(RunArgs),
    /// Score a saved classifier on a labeled directory
    Evaluate(EvaluateArgs),
}

/// Arguments for the train command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset root containing `train/` and `test/`
    #[arg(long)]
    pub data: String,

    /// Hand-landmark ONNX model
    #[arg(short, long)]
    pub detector: String,

    /// Sign configuration JSON (classes and translations)
    #[arg(long)]
    pub signs: Option<String>,

    /// Training epochs
    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    /// Mini-batch size
    #[arg(long, default_value_t = 16)]
    pub batch: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 0.001)]
    pub lr: f32,

    /// Seed for weight init, shuffling and dropout
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Minimum hand presence confidence while extracting
    #[arg(long, default_value_t = 0.5)]
    pub conf: f32,

    /// Where to write the trained classifier
    #[arg(short, long, default_value = "sign_model.json")]
    pub output: String,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the run command.
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Trained classifier (JSON)
    #[arg(short, long)]
    pub model: String,

    /// Hand-landmark ONNX model
    #[arg(short, long)]
    pub detector: String,

    /// Frame source (webcam index, video, image, directory or glob)
    #[arg(short, long, default_value = "0")]
    pub source: String,

    /// Sign configuration JSON (classes and translations)
    #[arg(long)]
    pub signs: Option<String>,

    /// Minimum hand presence confidence
    #[arg(long, default_value_t = 0.7)]
    pub conf: f32,

    /// Font for caption text (needs Devanagari glyphs for Hindi)
    #[arg(long)]
    pub font: Option<String>,

    /// Display results in a window
    #[arg(long, default_value_t = false)]
    pub show: bool,

    /// Save annotated frames to runs/caption/run
    #[arg(long, default_value_t = false)]
    pub save: bool,

    /// Encode saved frames as a video instead of images
    #[arg(long, default_value_t = false)]
    pub save_video: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the evaluate command.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Trained classifier (JSON)
    #[arg(short, long)]
    pub model: String,

    /// Labeled directory with one subdirectory per sign
    #[arg(long)]
    pub data: String,

    /// Hand-landmark ONNX model
    #[arg(short, long)]
    pub detector: String,

    /// Minimum hand presence confidence while extracting
    #[arg(long, default_value_t = 0.5)]
    pub conf: f32,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_args_defaults() {
        let args = Cli::parse_from([
            "app",
            "train",
            "--data",
            "dataset",
            "--detector",
            "hand.onnx",
        ]);
        match args.command {
            Commands::Train(train_args) => {
                assert_eq!(train_args.data, "dataset");
                assert_eq!(train_args.epochs, 20);
                assert_eq!(train_args.batch, 16);
                assert!((train_args.lr - 0.001).abs() < f32::EPSILON);
                assert_eq!(train_args.output, "sign_model.json");
                assert!(train_args.signs.is_none());
                assert!(train_args.verbose);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_run_args_custom() {
        let args = Cli::parse_from([
            "app",
            "run",
            "-m",
            "model.json",
            "-d",
            "hand.onnx",
            "--source",
            "video.mp4",
            "--conf",
            "0.8",
            "--show",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Run(run_args) => {
                assert_eq!(run_args.model, "model.json");
                assert_eq!(run_args.source, "video.mp4");
                assert!((run_args.conf - 0.8).abs() < f32::EPSILON);
                assert!(run_args.show);
                assert!(!run_args.save);
                assert!(!run_args.verbose);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_run_defaults_to_webcam() {
        let args = Cli::parse_from(["app", "run", "-m", "m.json", "-d", "h.onnx"]);
        match args.command {
            Commands::Run(run_args) => assert_eq!(run_args.source, "0"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_requires_data() {
        assert!(Cli::try_parse_from(["app", "evaluate", "-m", "m.json", "-d", "h.onnx"]).is_err());
    }
}
