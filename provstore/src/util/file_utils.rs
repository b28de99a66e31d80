//! The file_utils module contains utility functions related to interactions with the filesystem.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use crate::util::error::*;

/// `get_file_as_byte_vec` takes a Path containing a file name and returns a vector of bytes containing
/// the contents of that file or an [Error::FileRead] naming the file.
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    fs::read(filename).map_err(|e| Error::FileRead {
        path: filename.display().to_string(),
        kind: e.kind(),
    })
}

/// `file_exists` returns `Ok(true)` when the indicated file can be inspected, `Ok(false)` when it is
/// not present and an [Error::FileAccess] when inspection fails for any other reason.
pub fn file_exists(filename: &Path) -> Result<bool> {
    match fs::metadata(filename) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::FileAccess {
            path: filename.display().to_string(),
            kind: e.kind(),
        }),
    }
}

/// `write_file_atomically` writes `bytes` to a temporary file in the same folder as `filename` then
/// renames the temporary file over `filename`. A failure at any point leaves the existing file
/// untouched. When `filename` already exists, its permissions carry over to the replacement.
pub fn write_file_atomically(filename: &Path, bytes: &[u8]) -> Result<()> {
    let to_err = |kind: ErrorKind| Error::FileWrite {
        path: filename.display().to_string(),
        kind,
    };

    let folder = match filename.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(folder).map_err(|e| to_err(e.kind()))?;
    tmp.write_all(bytes).map_err(|e| to_err(e.kind()))?;
    tmp.flush().map_err(|e| to_err(e.kind()))?;
    if let Ok(md) = fs::metadata(filename) {
        tmp.as_file()
            .set_permissions(md.permissions())
            .map_err(|e| to_err(e.kind()))?;
    }
    tmp.as_file().sync_all().map_err(|e| to_err(e.kind()))?;
    tmp.persist(filename).map_err(|e| to_err(e.error.kind()))?;
    debug!("Wrote {} bytes to {}", bytes.len(), filename.display());
    Ok(())
}

#[test]
fn non_existent_file() {
    let r = get_file_as_byte_vec(Path::new("tests/examples/nonexistent.pem"));
    assert_eq!(
        Err(Error::FileRead {
            path: "tests/examples/nonexistent.pem".to_string(),
            kind: ErrorKind::NotFound
        }),
        r
    );
    assert_eq!(
        Ok(false),
        file_exists(Path::new("tests/examples/nonexistent.pem"))
    );
    assert_eq!(Ok(true), file_exists(Path::new("tests/examples/root_ca_one.pem")));
}

#[test]
fn atomic_write_replaces_contents() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("ca.json");
    fs::write(&target, b"old").unwrap();
    write_file_atomically(&target, b"new").unwrap();
    assert_eq!(b"new".to_vec(), fs::read(&target).unwrap());

    // no temporary files are left behind
    let count = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(1, count);
}

#[test]
fn atomic_write_to_missing_folder() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing").join("ca.json");
    let r = write_file_atomically(&target, b"new");
    assert!(matches!(r, Err(Error::FileWrite { .. })));
}

#[cfg(unix)]
#[test]
fn atomic_write_keeps_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("ca.json");
    fs::write(&target, b"old").unwrap();
    fs::set_permissions(&target, fs::Permissions::from_mode(0o644)).unwrap();

    write_file_atomically(&target, b"new").unwrap();
    let mode = fs::metadata(&target).unwrap().permissions().mode();
    assert_eq!(0o644, mode & 0o777);
    assert_eq!(b"new".to_vec(), fs::read(&target).unwrap());
}
