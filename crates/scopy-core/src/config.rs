//! Runtime configuration.
//!
//! The configuration file lives at a fixed, system-owned path so the invoking
//! user can never point the program at a more permissive policy. A missing
//! file means defaults.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use log::debug;
use nix::unistd::Uid;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScopyError};

/// Location of the system configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/scopy.toml";

// ============================================================================
// Default Functions
// ============================================================================

fn default_max_entries() -> usize {
    16
}

fn default_max_name_len() -> usize {
    31
}

// ============================================================================
// Configuration Types
// ============================================================================

/// What to do when a user name appears on more than one ACL line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The earliest line for a name decides.
    #[default]
    FirstMatch,
    /// A repeated name makes the whole file malformed.
    Reject,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::FirstMatch => "first-match",
            DuplicatePolicy::Reject => "reject",
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Hard cap on ACL entries; a longer file is a capacity failure
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Longest accepted user name, in bytes
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_name_len: default_max_name_len(),
            duplicates: DuplicatePolicy::default(),
        }
    }
}

impl Config {
    /// Load the system configuration from [`DEFAULT_CONFIG_PATH`].
    ///
    /// Call this as the invoking user; `installed_owner` is the elevated
    /// identity, which together with root may own the file.
    pub fn load(installed_owner: Uid) -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH), installed_owner)
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    ///
    /// The file is vetted on its open descriptor: it must be a regular file
    /// owned by root or by `installed_owner`, and must not be writable by
    /// group or others.
    pub fn load_from(path: &Path, installed_owner: Uid) -> Result<Self> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no configuration at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(config_error(path, format!("cannot open: {}", e))),
        };

        let meta = file
            .metadata()
            .map_err(|e| config_error(path, format!("cannot stat: {}", e)))?;
        if !meta.is_file() {
            return Err(config_error(path, "not a regular file"));
        }
        let trusted_owner = meta.uid() == 0 || meta.uid() == installed_owner.as_raw();
        if !trusted_owner {
            return Err(config_error(
                path,
                format!("owned by untrusted uid {}", meta.uid()),
            ));
        }
        if meta.mode() & 0o022 != 0 {
            return Err(config_error(
                path,
                format!("writable by group or others (mode {:04o})", meta.mode() & 0o7777),
            ));
        }

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| config_error(path, format!("cannot read: {}", e)))?;
        Self::from_toml(&contents).map_err(|reason| config_error(path, reason))
    }

    /// Parse and check a TOML document.
    pub fn from_toml(contents: &str) -> std::result::Result<Self, String> {
        let config: Config = toml::from_str(contents).map_err(|e| e.to_string())?;
        if config.max_entries == 0 {
            return Err("max_entries must be at least 1".to_string());
        }
        if config.max_name_len == 0 {
            return Err("max_name_len must be at least 1".to_string());
        }
        Ok(config)
    }
}

fn config_error(path: &Path, reason: impl Into<String>) -> ScopyError {
    ScopyError::Config {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_entries, 16);
        assert_eq!(config.max_name_len, 31);
        assert_eq!(config.duplicates, DuplicatePolicy::FirstMatch);
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_all_fields() {
        let config = Config::from_toml(
            r#"
max_entries = 64
max_name_len = 8
duplicates = "reject"
"#,
        )
        .unwrap();
        assert_eq!(config.max_entries, 64);
        assert_eq!(config.max_name_len, 8);
        assert_eq!(config.duplicates, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Config::from_toml("acl_suffix = \".perm\"").is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(Config::from_toml("max_entries = 0").is_err());
        assert!(Config::from_toml("max_name_len = 0").is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml"), Uid::effective()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_owned_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scopy.toml");
        fs::write(&path, "max_entries = 4\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let config = Config::load_from(&path, Uid::effective()).unwrap();
        assert_eq!(config.max_entries, 4);
    }

    #[test]
    fn test_untrusted_owner_rejected() {
        if Uid::effective().is_root() {
            // root-owned files are always trusted
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scopy.toml");
        fs::write(&path, "max_entries = 4\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let other = Uid::from_raw(Uid::effective().as_raw() + 1);
        let err = Config::load_from(&path, other).unwrap_err();
        assert!(err.to_string().contains("untrusted"));
    }

    #[test]
    fn test_group_writable_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scopy.toml");
        fs::write(&path, "max_entries = 4\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).unwrap();

        let err = Config::load_from(&path, Uid::effective()).unwrap_err();
        assert!(matches!(err, ScopyError::Config { .. }));
        assert!(err.to_string().contains("writable"));
    }

    #[test]
    fn test_directory_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load_from(temp_dir.path(), Uid::effective()).unwrap_err();
        assert!(matches!(err, ScopyError::Config { .. }));
    }

    #[test]
    fn test_duplicate_policy_display() {
        assert_eq!(DuplicatePolicy::FirstMatch.to_string(), "first-match");
        assert_eq!(DuplicatePolicy::Reject.to_string(), "reject");
    }
}
