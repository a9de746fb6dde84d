//! File and directory name sanitization.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Validate and sanitize a filename by removing or replacing invalid characters.
///
/// Returns an error if the filename could escape its directory. Dots inside a
/// name are fine (`yacht_001..wav`); separators and a bare `.` or `..` are not.
pub fn sanitize_filename(name: &str) -> Result<String> {
    // Reject path traversal attempts
    if name == "." || name == ".." {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized = replace_reserved(name, false);

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Sanitize one directory component of a remote path.
///
/// Dots inside a name are fine (`Motorboat_16.08.23`), a bare `..` is not.
pub fn sanitize_path_component(name: &str) -> Result<String> {
    if name == ".." {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed: '{}'",
            name
        )));
    }

    let sanitized = replace_reserved(name, true);

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Path component cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Turn a `/`-separated remote directory into a safe relative path.
///
/// Empty and `.` components are dropped, so `"//Data/./Tug/"` gives `Data/Tug`.
pub fn sanitize_relative_dir(remote_dir: &str) -> Result<PathBuf> {
    let mut path = PathBuf::new();

    for component in remote_dir.split(|c: char| c == '/' || c == '\\') {
        if component.is_empty() || component == "." {
            continue;
        }
        path.push(sanitize_path_component(component)?);
    }

    Ok(path)
}

/// Replace characters that are invalid on common filesystems with `_`.
fn replace_reserved(name: &str, include_separators: bool) -> String {
    name.chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            '/' | '\\' if include_separators => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
