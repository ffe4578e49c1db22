//! Writing the authorized copy.
//!
//! Must only run as the invoking user, so the OS decides whether the caller
//! may create files at the destination.
//!
//! The copy is written to a temporary file beside the destination, synced,
//! given its final mode and then renamed into place. The destination is
//! either absent or complete, and rerunning the copy replaces an earlier
//! read-only copy instead of failing to open it for writing.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, BufReader, BufWriter, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::acl::Permission;
use crate::error::{Result, ScopyError};

/// Copy everything from `source` to `dest`, then give `dest` the owner mode
/// for `permission`. Returns the number of bytes copied.
pub fn copy_to(source: &File, dest: &Path, permission: Permission) -> Result<u64> {
    let destination_error = |source: io::Error| ScopyError::Destination {
        path: dest.to_path_buf(),
        source,
    };

    let tmp_path = temp_path_for(dest);
    debug!("writing copy to {}", tmp_path.display());
    // O_EXCL: an existing file at the temp path is not ours to overwrite or remove.
    let tmp = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(&tmp_path)
        .map_err(destination_error)?;

    let result = write_temp(source, tmp, permission)
        .and_then(|bytes| fs::rename(&tmp_path, dest).map(|()| bytes));

    match result {
        Ok(bytes) => {
            info!(
                "copied {} bytes to {} (mode {:04o})",
                bytes,
                dest.display(),
                permission.mode()
            );
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(destination_error(e))
        }
    }
}

fn write_temp(source: &File, mut file: File, permission: Permission) -> io::Result<u64> {
    let bytes = {
        let mut reader = BufReader::new(source);
        let mut writer = BufWriter::new(&mut file);
        let bytes = io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        bytes
    };

    file.sync_all()?;
    file.set_permissions(Permissions::from_mode(permission.mode()))?;
    Ok(bytes)
}

/// Hidden sibling of `dest`, unique to this process.
fn temp_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("copy"));
    let mut tmp = OsString::from(".");
    tmp.push(name);
    tmp.push(format!(".scopy-{}.tmp", std::process::id()));
    dest.with_file_name(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source_file(dir: &TempDir, contents: &[u8]) -> File {
        let path = dir.path().join("src");
        fs::write(&path, contents).unwrap();
        File::open(&path).unwrap()
    }

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn test_copy_sets_mode_per_permission() {
        let temp_dir = TempDir::new().unwrap();
        for (perm, mode) in [
            (Permission::Read, 0o400),
            (Permission::Write, 0o200),
            (Permission::ReadWrite, 0o600),
        ] {
            let source = source_file(&temp_dir, b"payload");
            let dest = temp_dir.path().join(format!("dest-{}", perm.as_char()));
            let bytes = copy_to(&source, &dest, perm).unwrap();
            assert_eq!(bytes, 7);
            assert_eq!(mode_of(&dest), mode);
        }
    }

    #[test]
    fn test_copy_contents() {
        let temp_dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let source = source_file(&temp_dir, &data);
        let dest = temp_dir.path().join("dest");

        copy_to(&source, &dest, Permission::ReadWrite).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), data);
    }

    #[test]
    fn test_copy_replaces_read_only_destination() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("dest");

        copy_to(&source_file(&temp_dir, b"first"), &dest, Permission::Read).unwrap();
        copy_to(&source_file(&temp_dir, b"second"), &dest, Permission::Read).unwrap();

        fs::set_permissions(&dest, Permissions::from_mode(0o600)).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"second");
    }

    #[test]
    fn test_no_temp_file_left() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("dest");
        copy_to(&source_file(&temp_dir, b"x"), &dest, Permission::Read).unwrap();

        assert!(!temp_path_for(&dest).exists());
        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 2, "only src and dest expected: {:?}", names);
    }

    #[test]
    fn test_missing_directory_is_destination_error() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("missing").join("dest");
        let err = copy_to(&source_file(&temp_dir, b"x"), &dest, Permission::Read).unwrap_err();
        assert!(matches!(err, ScopyError::Destination { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_existing_temp_file_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("dest");
        let foreign = temp_path_for(&dest);
        fs::write(&foreign, b"not ours").unwrap();

        let err = copy_to(&source_file(&temp_dir, b"x"), &dest, Permission::Read).unwrap_err();
        match err {
            ScopyError::Destination { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::AlreadyExists);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fs::read(&foreign).unwrap(), b"not ours");
        assert!(!dest.exists());
    }

    #[test]
    fn test_failed_rename_removes_own_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let dest = temp_dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("keep"), b"k").unwrap();

        let err = copy_to(&source_file(&temp_dir, b"x"), &dest, Permission::Read).unwrap_err();
        assert!(matches!(err, ScopyError::Destination { .. }));
        assert!(!temp_path_for(&dest).exists());
        assert!(dest.join("keep").exists());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let tmp = temp_path_for(Path::new("/out/report.txt"));
        assert_eq!(tmp.parent(), Some(Path::new("/out")));
        let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".report.txt.scopy-"));
        assert!(name.ends_with(".tmp"));
    }
}
