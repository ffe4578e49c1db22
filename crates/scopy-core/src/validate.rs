//! Integrity checks on the opened source and ACL descriptors.
//!
//! Metadata is always taken from an open [`File`] (fstat), never by path, so
//! the file that was checked is the file that gets read.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use nix::fcntl::OFlag;

use crate::error::{Result, ScopyError};

const S_IRGRP: u32 = 0o040;
const S_IROTH: u32 = 0o004;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Symlink,
    Directory,
    Other,
}

/// Ownership and type of an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub owner: u32,
    pub kind: FileKind,
    /// Full `st_mode`, including the type bits
    pub mode: u32,
}

impl FileMeta {
    pub fn permission_bits(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// A protected file opened under the elevated identity, with the metadata
/// read from its descriptor.
#[derive(Debug)]
pub struct Opened {
    pub path: PathBuf,
    pub file: File,
    pub meta: FileMeta,
}

/// Open the source file read-only.
pub fn open_source(path: &Path) -> io::Result<File> {
    debug!("opening source {}", path.display());
    File::open(path)
}

/// Open the ACL read-only, refusing to follow a symlink in the last path
/// component.
pub fn open_acl(path: &Path) -> io::Result<File> {
    debug!("opening acl {}", path.display());
    OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NOFOLLOW.bits())
        .open(path)
}

/// Map a failure of [`open_source`].
pub fn source_open_error(path: &Path, e: io::Error) -> ScopyError {
    ScopyError::Io {
        path: path.to_path_buf(),
        source: e,
    }
}

/// Map a failure of [`open_acl`]. `ELOOP` from its `O_NOFOLLOW` open means
/// the ACL path is a symlink.
pub fn acl_open_error(path: &Path, e: io::Error) -> ScopyError {
    if e.raw_os_error() == Some(nix::libc::ELOOP) {
        ScopyError::IrregularFile {
            path: path.to_path_buf(),
            reason: "access control file is a symbolic link",
        }
    } else {
        source_open_error(path, e)
    }
}

/// Read metadata from an open descriptor.
pub fn inspect(path: &Path, file: File) -> Result<Opened> {
    let md = file.metadata().map_err(|source| ScopyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ft = md.file_type();
    let kind = if ft.is_symlink() {
        FileKind::Symlink
    } else if ft.is_file() {
        FileKind::Regular
    } else if ft.is_dir() {
        FileKind::Directory
    } else {
        FileKind::Other
    };
    Ok(Opened {
        path: path.to_path_buf(),
        file,
        meta: FileMeta {
            owner: md.uid(),
            kind,
            mode: md.mode(),
        },
    })
}

/// Check that the source and its ACL may be trusted together.
///
/// Checks run in order and stop at the first violation:
/// 1. the ACL is not a symlink and the source is a regular file
/// 2. both are owned by the same user
/// 3. the ACL is not readable by group or others
pub fn validate(source: &Opened, acl: &Opened) -> Result<()> {
    if acl.meta.kind == FileKind::Symlink {
        warn!("refusing symlinked acl {}", acl.path.display());
        return Err(ScopyError::IrregularFile {
            path: acl.path.clone(),
            reason: "access control file is a symbolic link",
        });
    }
    if source.meta.kind != FileKind::Regular {
        warn!("refusing irregular source {}", source.path.display());
        return Err(ScopyError::IrregularFile {
            path: source.path.clone(),
            reason: "source is not a regular file",
        });
    }

    if source.meta.owner != acl.meta.owner {
        warn!(
            "owner mismatch: source uid {} acl uid {}",
            source.meta.owner, acl.meta.owner
        );
        return Err(ScopyError::OwnershipMismatch {
            source_owner: source.meta.owner,
            acl_owner: acl.meta.owner,
        });
    }

    let scope = if acl.meta.mode & S_IRGRP != 0 {
        Some("group")
    } else if acl.meta.mode & S_IROTH != 0 {
        Some("others")
    } else {
        None
    };
    if let Some(scope) = scope {
        warn!("acl {} is readable by {}", acl.path.display(), scope);
        return Err(ScopyError::AclExposed {
            scope,
            mode: acl.meta.permission_bits(),
        });
    }

    Ok(())
}
