// StudioFE batch binary: every run is headless, driven by command-line flags.

use clap::Parser;
use std::process::ExitCode;

use studiofe::cli::{self, CliArgs};
use studiofe::logger;

fn main() -> ExitCode {
    // Session log (overwrites the previous run's log)
    logger::init();

    let args = CliArgs::parse();
    logger::set_echo(args.verbose);
    studiofe::log_info!("CLI run with {} input pattern(s)", args.input.len());
    let code = cli::run(args);
    studiofe::log_info!("CLI finished");
    code
}
