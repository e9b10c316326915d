//! Repository status queries and repository root discovery.

use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

use crate::error::{Result, SwitchboardError};

use super::porcelain::{parse_porcelain_z, RepoChange};

/// Per-root changed-file query. Implementations must not share state across
/// roots; one root failing never affects another.
pub trait StatusQuery: Send {
    fn changed_paths(&self, root: &Path) -> Result<Vec<RepoChange>>;

    /// A directory is a repository root iff it holds a `.git` entry
    /// (a directory, or a file for linked worktrees).
    fn is_repository_root(&self, dir: &Path) -> bool {
        dir.join(".git").exists()
    }
}

/// Shells out to `git status`.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl StatusQuery for GitCli {
    fn changed_paths(&self, root: &Path) -> Result<Vec<RepoChange>> {
        let command = format!("{} status --porcelain=v1 -z", self.program);
        let output = Command::new(&self.program)
            .args(["status", "--porcelain=v1", "-z", "--untracked-files=all"])
            .current_dir(root)
            .output()
            .map_err(|e| SwitchboardError::CommandFailed {
                command: command.clone(),
                details: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SwitchboardError::CommandFailed {
                command,
                details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_porcelain_z(&output.stdout))
    }
}

/// Repository roots for a session directory.
///
/// The directory itself when it is a root; otherwise its immediate,
/// non-hidden subdirectories that are roots, sorted by name. Nothing below
/// depth 1 is scanned.
pub fn discover_roots(query: &dyn StatusQuery, directory: &Path) -> Vec<PathBuf> {
    if query.is_repository_root(directory) {
        return vec![directory.to_path_buf()];
    }

    let mut roots = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(directory = %directory.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if query.is_repository_root(entry.path()) {
            roots.push(entry.into_path());
        }
    }
    roots
}
