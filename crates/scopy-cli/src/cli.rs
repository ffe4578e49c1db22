//! CLI argument parsing with clap.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use scopy_core::{CopyRequest, Result};

const CLI_AFTER_HELP: &str = "\
The source must have an access control file at <SOURCE>.acl, owned by the
source's owner and readable only by that owner. Each line grants one user:

    <username> r    read only
    <username> w    write only (cannot copy)
    <username> b    read and write

The copy is created as the invoking user; its mode reflects the grant.";

/// scopy - copy a protected file you have been granted access to
#[derive(Parser, Debug)]
#[command(
    name = "scopy",
    version,
    about = "Copy a protected file you have been granted access to",
    after_help = CLI_AFTER_HELP
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// File to copy; its ACL is read from <SOURCE>.acl
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Where to write the copy
    #[arg(value_name = "DEST")]
    pub destination: PathBuf,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }

    pub fn to_request(&self) -> Result<CopyRequest> {
        CopyRequest::new(&self.source, &self.destination)
    }
}
