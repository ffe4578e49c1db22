// scopy-cli: command-line frontend for scopy
// Argument parsing, logger setup, diagnostics and exit codes

mod cli;

use std::process::ExitCode;

use clap::Parser;
use scopy_core::{Config, Credentials, IdentitySwitcher, OsCredentials, Result, run};

use cli::Cli;

fn init_logging(cli: &Cli) {
    // RUST_LOG, when set, overrides -v
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn execute(cli: &Cli) -> Result<()> {
    let request = cli.to_request()?;

    // Act as the invoking user for everything outside the two protected opens,
    // including reading the configuration.
    let creds = OsCredentials::new();
    IdentitySwitcher::new(&creds).lower()?;
    let config = Config::load(creds.identity().elevated)?;

    let report = run(&request, &creds, &config)?;
    log::info!(
        "wrote {} bytes to {} ({})",
        report.bytes,
        report.destination.display(),
        report.permission
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("scopy: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
