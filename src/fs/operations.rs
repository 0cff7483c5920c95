//! Filesystem primitives invoked by the tree.
//!
//! None of these check for name collisions up front; whatever the OS call
//! does on an existing destination (fail, overwrite, merge) is what the
//! caller gets.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Reject names that are not a single path component.
///
/// This is not a collision check: an existing entry with the same name is
/// left for the OS call to report.
pub fn validate_leaf_name(name: &str) -> std::io::Result<()> {
    let problem = if name.is_empty() {
        Some("name cannot be empty")
    } else if name == "." || name == ".." {
        Some("name cannot be '.' or '..'")
    } else if name.contains('/') || name.contains('\0') {
        Some("name cannot contain '/' or NUL")
    } else if cfg!(windows) && name.contains('\\') {
        Some("name cannot contain '\\'")
    } else {
        None
    };
    match problem {
        Some(msg) => Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg)),
        None => Ok(()),
    }
}

/// Create an empty file named `name` inside `dir`. Fails if it already exists.
pub fn create_file(dir: &Path, name: &str) -> Result<PathBuf> {
    validate_leaf_name(name)?;
    let path = dir.join(name);
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;
    Ok(path)
}

/// Create a directory named `name` inside `dir`. Fails if it already exists.
pub fn create_dir(dir: &Path, name: &str) -> Result<PathBuf> {
    validate_leaf_name(name)?;
    let path = dir.join(name);
    fs::create_dir(&path)?;
    Ok(path)
}

/// Rename an entry in place, keeping its parent directory.
pub fn rename(path: &Path, new_name: &str) -> Result<PathBuf> {
    validate_leaf_name(new_name)?;
    let parent = path.parent().unwrap_or(Path::new("."));
    let dest = parent.join(new_name);
    fs::rename(path, &dest)?;
    Ok(dest)
}

/// Delete a file or directory. Directories are removed recursively;
/// symlinks are removed without following them.
pub fn delete(path: &Path) -> Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn leaf_name(src: &Path) -> std::io::Result<&std::ffi::OsStr> {
    src.file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no filename"))
}

/// Refuse to put a directory inside itself or one of its descendants.
fn ensure_not_within(src: &Path, dest_dir: &Path) -> std::io::Result<()> {
    let src = src.canonicalize()?;
    if dest_dir.canonicalize()?.starts_with(&src) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("cannot place {} inside itself", src.display()),
        ));
    }
    Ok(())
}

/// Recursively copy a file or directory from `src` into `dest_dir`.
///
/// Returns the path of the copy.
pub fn copy_recursive(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let dest = dest_dir.join(leaf_name(src)?);

    if fs::symlink_metadata(src)?.is_dir() {
        ensure_not_within(src, dest_dir)?;
        copy_dir_recursive(src, &dest)?;
    } else {
        fs::copy(src, &dest)?;
    }
    Ok(dest)
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&src_path, &dest_path)?;
        } else {
            fs::copy(&src_path, &dest_path)?;
        }
    }
    Ok(())
}

/// Move a file or directory from `src` into `dest_dir`.
///
/// Uses `fs::rename` first (same device). Falls back to copy+delete when
/// the rename crosses devices. Returns the final path.
pub fn move_item(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let dest = dest_dir.join(leaf_name(src)?);

    match fs::rename(src, &dest) {
        Ok(()) => Ok(dest),
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
            if fs::symlink_metadata(src)?.is_dir() {
                ensure_not_within(src, dest_dir)?;
                copy_dir_recursive(src, &dest)?;
                fs::remove_dir_all(src)?;
            } else {
                fs::copy(src, &dest)?;
                fs::remove_file(src)?;
            }
            Ok(dest)
        }
        Err(e) => Err(e.into()),
    }
}
