//! Error taxonomy for the copy flow.
//!
//! Every failure aborts the invocation. Nothing here is retried or downgraded;
//! the variants only exist so the frontend can print a precise diagnostic and
//! exit with a code scripts can branch on.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScopyError>;

#[derive(Debug, Error)]
pub enum ScopyError {
    /// Malformed invocation, detected before any privileged action.
    #[error("bad input: {0}")]
    Usage(String),

    /// Switching the effective user id failed. Continuing would leave the
    /// process at an unknown privilege level.
    #[error("failed to change effective uid while {action}: {source}")]
    Identity {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("unable to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("irregular file '{}': {reason}", path.display())]
    IrregularFile { path: PathBuf, reason: &'static str },

    #[error("source is owned by uid {source_owner} but its access control file is owned by uid {acl_owner}")]
    OwnershipMismatch { source_owner: u32, acl_owner: u32 },

    #[error("access control file is readable by {scope} (mode {mode:04o})")]
    AclExposed { scope: &'static str, mode: u32 },

    #[error("access control file is incorrectly formatted at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("access control file grants nobody access")]
    EmptyAcl,

    #[error("access control file has more than {max} entries")]
    AclCapacity { max: usize },

    #[error("{user} doesn't have permission to {action}")]
    NotAuthorized { user: String, action: &'static str },

    #[error("cannot write destination '{}': {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration '{}': {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl ScopyError {
    /// Process exit code for this failure. Zero is reserved for success and
    /// 2 matches clap's own usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            ScopyError::Usage(_) => 2,
            ScopyError::Identity { .. } => 3,
            ScopyError::Io { .. } => 4,
            ScopyError::IrregularFile { .. } => 5,
            ScopyError::OwnershipMismatch { .. } => 6,
            ScopyError::AclExposed { .. } => 7,
            ScopyError::Format { .. } => 8,
            ScopyError::EmptyAcl => 9,
            ScopyError::AclCapacity { .. } => 10,
            ScopyError::NotAuthorized { .. } => 11,
            ScopyError::Destination { .. } => 12,
            ScopyError::Config { .. } => 13,
        }
    }

    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        ScopyError::Format {
            line,
            reason: reason.into(),
        }
    }
}
