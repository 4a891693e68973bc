// Filesystem primitives shared by the matcher, the resolver and the executor
//
// Paths are expanded (`~`) and normalised lexically; symlinks are left to the OS.

use base64::Engine;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::ExecutionError;
use crate::tools::results::{ContentEncoding, DirEntry, Metadata};

/// Expand a leading `~` to the user's home directory
pub fn expand_user(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Canonical absolute form of a user-supplied path, without touching the disk
pub fn absolute_path(path: &str) -> PathBuf {
    let expanded = expand_user(path);
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(_) => expanded,
        }
    };
    normalize(&joined)
}

/// Resolve `.` and `..` components lexically
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root
                if !matches!(out.components().next_back(), Some(Component::RootDir) | None) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether anything (file, directory or dangling link) exists at `path`
pub fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub fn is_dir(path: &Path) -> bool {
    path.is_dir()
}

fn format_time(time: std::io::Result<SystemTime>) -> String {
    match time {
        Ok(time) => DateTime::<Utc>::from(time).to_rfc3339(),
        Err(_) => String::new(),
    }
}

#[cfg(unix)]
fn owner_and_group(meta: &fs::Metadata) -> (String, String) {
    use nix::unistd::{Gid, Group, Uid, User};
    use std::os::unix::fs::MetadataExt;

    let uid = meta.uid();
    let gid = meta.gid();
    let owner = User::from_uid(Uid::from_raw(uid))
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| uid.to_string());
    let group = Group::from_gid(Gid::from_raw(gid))
        .ok()
        .flatten()
        .map(|g| g.name)
        .unwrap_or_else(|| gid.to_string());
    (owner, group)
}

#[cfg(not(unix))]
fn owner_and_group(_meta: &fs::Metadata) -> (String, String) {
    (String::new(), String::new())
}

/// Read metadata; directories include a one-level listing when `with_listing`
pub fn read_metadata(path: &Path, with_listing: bool) -> Result<Metadata, ExecutionError> {
    let meta = fs::metadata(path).map_err(|e| ExecutionError::from_io(&e, path))?;
    let (owner, group) = owner_and_group(&meta);

    let listing = if meta.is_dir() && with_listing {
        Some(list_directory(path)?)
    } else {
        None
    };

    Ok(Metadata {
        path: path.display().to_string(),
        size: meta.len(),
        modified: format_time(meta.modified()),
        is_directory: meta.is_dir(),
        owner,
        group,
        listing,
    })
}

/// One-level directory listing, sorted by name, hidden entries included
pub fn list_directory(path: &Path) -> Result<Vec<DirEntry>, ExecutionError> {
    let entries = fs::read_dir(path).map_err(|e| ExecutionError::from_io(&e, path))?;

    let mut listing = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ExecutionError::from_io(&e, path))?;
        let name = entry.file_name().to_string_lossy().to_string();
        // Entries can vanish or be unreadable; list them with what we know
        let (is_directory, size, modified) = match entry.metadata() {
            Ok(meta) => (meta.is_dir(), meta.len(), format_time(meta.modified())),
            Err(_) => (false, 0, String::new()),
        };
        listing.push(DirEntry {
            name,
            is_directory,
            size,
            modified,
        });
    }
    listing.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}

/// Read a file as UTF-8 text, or base64 when it is not valid UTF-8
pub fn read_file(path: &Path) -> Result<(String, ContentEncoding), ExecutionError> {
    if is_dir(path) {
        return Err(ExecutionError::Io {
            context: path.display().to_string(),
            message: "is a directory".to_string(),
        });
    }
    let bytes = fs::read(path).map_err(|e| ExecutionError::from_io(&e, path))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok((text, ContentEncoding::Text)),
        Err(err) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(err.into_bytes());
            Ok((encoded, ContentEncoding::Base64))
        }
    }
}

/// Write a file by writing a sibling temp file and renaming it into place
pub fn write_file_atomic(path: &Path, content: &str) -> Result<(), ExecutionError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ExecutionError::from_io(&e, parent))?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.toolgate.tmp", file_name));

    fs::write(&temp_path, content).map_err(|e| ExecutionError::from_io(&e, &temp_path))?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(ExecutionError::from_io(&e, path));
    }
    Ok(())
}

pub fn create_dir(path: &Path) -> Result<(), ExecutionError> {
    fs::create_dir_all(path).map_err(|e| ExecutionError::from_io(&e, path))
}

/// Total size of a file or directory tree
pub fn disk_usage(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

/// Copy a file, or a directory recursively; the destination must not exist
pub fn copy_path(source: &Path, destination: &Path) -> Result<(), ExecutionError> {
    if exists(destination) {
        return Err(ExecutionError::WouldOverwrite(destination.to_path_buf()));
    }
    ensure_not_nested(source, destination)?;
    if let Some(parent) = destination.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ExecutionError::from_io(&e, parent))?;
        }
    }

    if !is_dir(source) {
        fs::copy(source, destination).map_err(|e| ExecutionError::from_io(&e, source))?;
        return Ok(());
    }

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| ExecutionError::Io {
            context: source.display().to_string(),
            message: e.to_string(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| ExecutionError::Io {
                context: entry.path().display().to_string(),
                message: e.to_string(),
            })?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| ExecutionError::from_io(&e, &target))?;
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|e| ExecutionError::from_io(&e, entry.path()))?;
        }
    }
    Ok(())
}

/// Move a path; falls back to copy and delete only when rename crosses devices
pub fn move_path(source: &Path, destination: &Path) -> Result<(), ExecutionError> {
    if exists(destination) {
        return Err(ExecutionError::WouldOverwrite(destination.to_path_buf()));
    }
    ensure_not_nested(source, destination)?;
    if let Some(parent) = destination.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ExecutionError::from_io(&e, parent))?;
        }
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if crosses_devices(&e) => {
            debug!("rename crosses devices ({}), falling back to copy", e);
            copy_path(source, destination)?;
            delete_path(source)
        }
        Err(e) => Err(ExecutionError::from_io(&e, source)),
    }
}

/// A directory cannot be copied or moved below itself
fn ensure_not_nested(source: &Path, destination: &Path) -> Result<(), ExecutionError> {
    let from = normalize(source);
    if is_dir(&from) && normalize(destination).starts_with(&from) {
        return Err(ExecutionError::IntoItself {
            path: source.to_path_buf(),
            destination: destination.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn crosses_devices(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(nix::errno::Errno::EXDEV as i32)
}

#[cfg(not(unix))]
fn crosses_devices(_err: &std::io::Error) -> bool {
    false
}

/// Delete a file or a whole directory tree
pub fn delete_path(path: &Path) -> Result<(), ExecutionError> {
    let meta = fs::symlink_metadata(path).map_err(|e| ExecutionError::from_io(&e, path))?;
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| ExecutionError::from_io(&e, path))
}

/// Free bytes on the filesystem holding `path` (or its nearest existing ancestor)
#[cfg(unix)]
pub fn available_space(path: &Path) -> Option<u64> {
    let mut existing = path.to_path_buf();
    while !existing.exists() {
        if !existing.pop() {
            return None;
        }
    }
    let stats = nix::sys::statvfs::statvfs(&existing).ok()?;
    Some(stats.blocks_available() as u64 * stats.fragment_size() as u64)
}

#[cfg(not(unix))]
pub fn available_space(_path: &Path) -> Option<u64> {
    None
}

/// Fail if writing `incoming` bytes under `path` would leave less than `min_left` free
pub fn ensure_space(path: &Path, incoming: u64, min_left: u64) -> Result<(), ExecutionError> {
    if min_left == 0 {
        return Ok(());
    }
    let Some(available) = available_space(path) else {
        return Ok(());
    };
    let required = incoming.saturating_add(min_left);
    if available < required {
        return Err(ExecutionError::InsufficientSpace {
            path: path.to_path_buf(),
            available,
            required,
        });
    }
    Ok(())
}
