//! Parser for `git status --porcelain=v1 -z`.
//!
//! Each record is `XY PATH\0`; renames and copies carry a second
//! `ORIG_PATH\0` field after the destination, which is skipped.
//! X is the index column, Y the worktree column.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Modified,
    Added,
    Deleted,
    Untracked,
    Renamed,
    Conflicted,
}

impl ChangeStatus {
    /// Single-character code shown next to a path.
    pub fn code(&self) -> char {
        match self {
            ChangeStatus::Modified => 'M',
            ChangeStatus::Added => 'A',
            ChangeStatus::Deleted => 'D',
            ChangeStatus::Untracked => '?',
            ChangeStatus::Renamed => 'R',
            ChangeStatus::Conflicted => 'U',
        }
    }

    /// Classifies a porcelain `XY` pair. Returns `None` for ignored entries.
    pub fn from_xy(x: char, y: char) -> Option<Self> {
        let status = match (x, y) {
            ('!', '!') => return None,
            ('?', '?') => ChangeStatus::Untracked,
            ('U', _) | (_, 'U') | ('A', 'A') | ('D', 'D') => ChangeStatus::Conflicted,
            ('R', _) | (_, 'R') => ChangeStatus::Renamed,
            ('A', _) | (_, 'A') | ('C', _) | (_, 'C') => ChangeStatus::Added,
            ('D', _) | (_, 'D') => ChangeStatus::Deleted,
            _ => ChangeStatus::Modified,
        };
        Some(status)
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One changed path, relative to the repository root that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoChange {
    pub path: String,
    pub status: ChangeStatus,
}

/// Parses NUL-separated porcelain v1 output. Truncated or unrecognized
/// records are skipped.
pub fn parse_porcelain_z(output: &[u8]) -> Vec<RepoChange> {
    let text = String::from_utf8_lossy(output);
    let mut fields = text.split('\0');
    let mut changes = Vec::new();

    while let Some(record) = fields.next() {
        if record.len() < 4 {
            continue;
        }
        let mut chars = record.chars();
        let (Some(x), Some(y)) = (chars.next(), chars.next()) else {
            continue;
        };
        let Some(path) = record.get(3..) else {
            continue;
        };

        if matches!(x, 'R' | 'C') || matches!(y, 'R' | 'C') {
            // Source path of the rename/copy.
            fields.next();
        }

        if let Some(status) = ChangeStatus::from_xy(x, y) {
            changes.push(RepoChange {
                path: path.to_string(),
                status,
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_each_category() {
        let cases = [
            (" M", ChangeStatus::Modified),
            ("M ", ChangeStatus::Modified),
            ("MM", ChangeStatus::Modified),
            (" T", ChangeStatus::Modified),
            ("A ", ChangeStatus::Added),
            ("AM", ChangeStatus::Added),
            (" D", ChangeStatus::Deleted),
            ("D ", ChangeStatus::Deleted),
            ("??", ChangeStatus::Untracked),
            ("R ", ChangeStatus::Renamed),
            ("UU", ChangeStatus::Conflicted),
            ("AU", ChangeStatus::Conflicted),
            ("AA", ChangeStatus::Conflicted),
            ("DD", ChangeStatus::Conflicted),
        ];
        for (xy, expected) in cases {
            let mut chars = xy.chars();
            let x = chars.next().unwrap();
            let y = chars.next().unwrap();
            assert_eq!(ChangeStatus::from_xy(x, y), Some(expected), "{xy:?}");
        }
        assert_eq!(ChangeStatus::from_xy('!', '!'), None);
    }

    #[test]
    fn test_codes() {
        let codes: String = [
            ChangeStatus::Modified,
            ChangeStatus::Added,
            ChangeStatus::Deleted,
            ChangeStatus::Untracked,
            ChangeStatus::Renamed,
            ChangeStatus::Conflicted,
        ]
        .iter()
        .map(ChangeStatus::code)
        .collect();
        assert_eq!(codes, "MAD?RU");
    }

    #[test]
    fn test_parse_reports_rename_destination() {
        let output = b" M src/lib.rs\0R  new name.rs\0old name.rs\0?? notes.md\0";
        let changes = parse_porcelain_z(output);

        assert_eq!(
            changes,
            vec![
                RepoChange {
                    path: "src/lib.rs".to_string(),
                    status: ChangeStatus::Modified
                },
                RepoChange {
                    path: "new name.rs".to_string(),
                    status: ChangeStatus::Renamed
                },
                RepoChange {
                    path: "notes.md".to_string(),
                    status: ChangeStatus::Untracked
                },
            ]
        );
    }

    #[test]
    fn test_parse_skips_ignored_and_truncated_records() {
        let output = b"!! target/\0M\0 D gone.txt\0";
        let changes = parse_porcelain_z(output);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "gone.txt");
        assert_eq!(changes[0].status, ChangeStatus::Deleted);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_porcelain_z(b"").is_empty());
    }
}
