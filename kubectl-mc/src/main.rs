use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use kubectl_mc::cli::{self, Cli};
use kubectl_mc::{logging, Error};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => err.exit(),
        Err(err) => {
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };
    logging::init(cli.connection.verbosity);

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<Error>().map_or(false, Error::is_usage) {
                eprintln!("See 'kubectl-mc get -h' for help and examples");
            }
            ExitCode::FAILURE
        }
    }
}
