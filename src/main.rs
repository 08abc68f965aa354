// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;

use sign_caption::cli::args::{Cli, Commands};
use sign_caption::cli::logging::set_verbose;
use sign_caption::cli::{evaluate, run, train};
use sign_caption::error;

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Train(args) => {
            set_verbose(args.verbose);
            train::run_training(args)
        }
        Commands::Run(args) => {
            set_verbose(args.verbose);
            run::run_captioning(args)
        }
        Commands::Evaluate(args) => {
            set_verbose(args.verbose);
            evaluate::run_evaluation(args)
        }
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
