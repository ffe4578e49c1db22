//! The complete copy flow, from invocation to finished destination.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::acl::{self, Permission};
use crate::authorize::authorize;
use crate::config::Config;
use crate::copy::copy_to;
use crate::error::{Result, ScopyError};
use crate::identity::{Credentials, IdentitySwitcher};
use crate::validate::{self, acl_open_error, inspect, source_open_error};

/// A checked source/destination pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    source: PathBuf,
    destination: PathBuf,
}

impl CopyRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let destination = destination.into();
        if source.as_os_str().is_empty() {
            return Err(ScopyError::Usage("source file name is empty".to_string()));
        }
        if destination.as_os_str().is_empty() {
            return Err(ScopyError::Usage(
                "destination file name is empty".to_string(),
            ));
        }
        Ok(Self {
            source,
            destination,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReport {
    pub user: String,
    pub permission: Permission,
    pub bytes: u64,
    pub destination: PathBuf,
}

/// Authorize the invoking user against the source's ACL and, if they may
/// read it, copy the source to the destination.
///
/// The installed owner's identity is held only while the source and its ACL
/// are opened. Everything after that, including creating the destination,
/// runs as the invoking user.
pub fn run<C: Credentials + ?Sized>(
    request: &CopyRequest,
    creds: &C,
    config: &Config,
) -> Result<CopyReport> {
    let switcher = IdentitySwitcher::new(creds);
    switcher.lower()?;

    let acl_path = acl::acl_path_for(request.source());

    let guard = switcher.raise()?;
    let source = validate::open_source(request.source());
    let acl_file = validate::open_acl(&acl_path);
    guard.release()?;

    let source = source.map_err(|e| source_open_error(request.source(), e))?;
    let acl_file = acl_file.map_err(|e| acl_open_error(&acl_path, e))?;

    let source = inspect(request.source(), source)?;
    let acl_file = inspect(&acl_path, acl_file)?;
    validate::validate(&source, &acl_file)?;
    debug!(
        "{} and {} passed integrity checks",
        source.path.display(),
        acl_file.path.display()
    );

    let acl = acl::parse(BufReader::new(&acl_file.file), &acl_path, config)?;

    let user = switcher.invoking_user()?;
    let permission = authorize(&user, &acl).require_read(&user)?;

    let bytes = copy_to(&source.file, request.destination(), permission)?;
    info!(
        "{} copied {} to {}",
        user,
        request.source().display(),
        request.destination().display()
    );

    Ok(CopyReport {
        user,
        permission,
        bytes,
        destination: request.destination().to_path_buf(),
    })
}
