//! Path normalization utilities for consistent directory comparison.
//!
//! Status is keyed by the `cwd` Claude reports, sessions by the directory the
//! user picked, and workspace folders by whatever the host stored. All three
//! are compared through these helpers.
//!
//! - Trailing slash normalization
//! - Case normalization on macOS (case-insensitive filesystem)

use std::path::{Path, PathBuf};

/// Normalizes a directory string for use as a map key.
///
/// Strips trailing slashes (preserving root "/") and lowercases on macOS.
/// Does not touch the filesystem.
///
/// ```ignore
/// normalize_path_for_matching("/project/") -> "/project"
/// normalize_path_for_matching("/") -> "/"
/// ```
pub fn normalize_path_for_matching(path: &str) -> String {
    let trimmed = strip_trailing_slashes(path);
    apply_case_normalization(&trimmed)
}

/// Normalizes a directory for display and storage without changing its case.
pub fn normalize_directory(path: &str) -> String {
    strip_trailing_slashes(path.trim())
}

/// Returns true if two directory paths refer to the same location after normalization.
pub fn same_directory(a: &Path, b: &Path) -> bool {
    normalize_path_for_matching(&a.to_string_lossy())
        == normalize_path_for_matching(&b.to_string_lossy())
}

/// Expresses `path` relative to `base`, using `/` separators.
///
/// Returns `None` when `path` is not nested under `base`.
pub fn relative_to(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}

/// Joins a session-relative prefix and a repository-relative path.
pub fn join_relative(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), path)
    }
}

/// Converts a directory string into a `PathBuf` with normalized trailing slashes.
pub fn directory_path(path: &str) -> PathBuf {
    PathBuf::from(normalize_directory(path))
}

/// Strips trailing slashes from a path, preserving root "/".
fn strip_trailing_slashes(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// macOS uses a case-insensitive filesystem by default (HFS+/APFS),
/// so we lowercase paths for consistent comparison.
fn apply_case_normalization(path: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        path.to_lowercase()
    }
    #[cfg(not(target_os = "macos"))]
    {
        path.to_string()
    }
}
