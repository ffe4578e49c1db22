//! scopy-core: privilege-separated copying of ACL-protected files.
//!
//! A setuid `scopy` lets a user copy a file they cannot read directly,
//! provided the file's owner has listed them in `<file>.acl`. This crate
//! holds everything except the command line:
//!
//! - [`identity`] switches between the invoking user and the installed owner
//! - [`acl`] parses access control files
//! - [`validate`] checks the opened source and ACL descriptors
//! - [`authorize`] matches the invoking user against the ACL
//! - [`copy`] writes the destination as the invoking user
//! - [`flow`] ties the above together
//!
//! ```no_run
//! use scopy_core::{Config, CopyRequest, Credentials, IdentitySwitcher, OsCredentials, run};
//!
//! fn main() -> scopy_core::Result<()> {
//!     let creds = OsCredentials::new();
//!     IdentitySwitcher::new(&creds).lower()?;
//!     let config = Config::load(creds.identity().elevated)?;
//!     let request = CopyRequest::new("/srv/reports/q3.txt", "q3.txt")?;
//!     let report = run(&request, &creds, &config)?;
//!     println!("copied {} bytes", report.bytes);
//!     Ok(())
//! }
//! ```

pub mod acl;
pub mod authorize;
pub mod config;
pub mod copy;
pub mod error;
pub mod flow;
pub mod identity;
pub mod validate;

pub use acl::{Acl, AclEntry, Permission};
pub use authorize::{Authorization, authorize};
pub use config::{Config, DuplicatePolicy};
pub use error::{Result, ScopyError};
pub use flow::{CopyReport, CopyRequest, run};
pub use identity::{Credentials, Identity, IdentitySwitcher, OsCredentials};
