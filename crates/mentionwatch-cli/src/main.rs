mod bootstrap_helpers;
mod cli_args;
mod startup;
mod watch_config_file;

use std::process::ExitCode;

use clap::Parser;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;
use crate::startup::run_cli;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run_cli(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error[{}]: {error}", error.code());
            ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(1))
        }
    }
}
