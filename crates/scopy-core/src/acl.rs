//! Access control file parsing.
//!
//! An ACL lives next to the file it protects, at `<source>.acl`. Each line is
//! `<username> <permission>`, where the permission is one of:
//! - `r` read only
//! - `w` write only
//! - `b` both read and write
//!
//! Parsing is all or nothing: one malformed line rejects the whole file.
//! Diagnostics carry a line number and the kind of violation, never text
//! from the file, since the caller may not be allowed to see it.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::config::{Config, DuplicatePolicy};
use crate::error::{Result, ScopyError};

/// Suffix appended to a source path to locate its ACL.
pub const ACL_SUFFIX: &str = ".acl";

/// Path of the ACL protecting `source`.
pub fn acl_path_for(source: &Path) -> PathBuf {
    let mut path = OsString::from(source.as_os_str());
    path.push(ACL_SUFFIX);
    PathBuf::from(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    ReadWrite,
}

impl Permission {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(Permission::Read),
            'w' => Some(Permission::Write),
            'b' => Some(Permission::ReadWrite),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Permission::Read => 'r',
            Permission::Write => 'w',
            Permission::ReadWrite => 'b',
        }
    }

    pub fn allows_read(&self) -> bool {
        matches!(self, Permission::Read | Permission::ReadWrite)
    }

    pub fn allows_write(&self) -> bool {
        matches!(self, Permission::Write | Permission::ReadWrite)
    }

    /// Owner mode bits granted on a copy made under this permission.
    pub fn mode(&self) -> u32 {
        match self {
            Permission::Read => 0o400,
            Permission::Write => 0o200,
            Permission::ReadWrite => 0o600,
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::ReadWrite => "read-write",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub name: String,
    pub permission: Permission,
}

/// Parsed access control list, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    entries: Vec<AclEntry>,
}

impl Acl {
    pub fn entries(&self) -> &[AclEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse an ACL from `reader`, which was opened from `path`.
///
/// # Errors
///
/// - `Format` if any line is not exactly two whitespace-separated fields, the
///   name is longer than `config.max_name_len`, the permission is not a single
///   `b`, `r` or `w`, the content is not UTF-8, or (under
///   [`DuplicatePolicy::Reject`]) a name repeats
/// - `AclCapacity` if there are more than `config.max_entries` lines
/// - `EmptyAcl` if there are no lines at all
/// - `Io` if reading `path` fails
pub fn parse<R: BufRead>(reader: R, path: &Path, config: &Config) -> Result<Acl> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => ScopyError::format(line_no, "not valid UTF-8"),
            _ => ScopyError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        if entries.len() == config.max_entries {
            return Err(ScopyError::AclCapacity {
                max: config.max_entries,
            });
        }

        let entry = parse_line(&line, line_no, config)?;
        if config.duplicates == DuplicatePolicy::Reject && !seen.insert(entry.name.clone()) {
            return Err(ScopyError::format(line_no, "duplicate user name"));
        }
        entries.push(entry);
    }

    if entries.is_empty() {
        return Err(ScopyError::EmptyAcl);
    }
    Ok(Acl { entries })
}

fn parse_line(line: &str, line_no: usize, config: &Config) -> Result<AclEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [name, perm] = fields[..] else {
        return Err(ScopyError::format(line_no, "expected 2 fields"));
    };

    if name.len() > config.max_name_len {
        return Err(ScopyError::format(
            line_no,
            format!("user name longer than {} bytes", config.max_name_len),
        ));
    }

    let mut chars = perm.chars();
    let permission = match (chars.next(), chars.next()) {
        (Some(c), None) => Permission::from_char(c),
        _ => None,
    }
    .ok_or_else(|| ScopyError::format(line_no, "unrecognized permission"))?;

    Ok(AclEntry {
        name: name.to_string(),
        permission,
    })
}
