use std::env;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use xlsxcsv::cli::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse_from(cli::normalize_legacy_args(env::args_os()));
    cli::init_logging(cli.verbose, cli.quiet);

    match cli::run(&cli) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
