//! Producer side of the drop-box, used by `switchboard hook`.
//!
//! Claude Code pipes one hook payload to the hook command's stdin. We write it
//! verbatim as `{unix_nanos}_{pid}.json` through a hidden temp file plus
//! rename, so the final name only ever points at a complete file.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::Builder;

use crate::error::{Result, SwitchboardError};

const MAX_NAME_ATTEMPTS: u32 = 8;

/// File name for a notification written now by process `pid`.
pub fn notification_file_name(unix_nanos: i64, pid: u32) -> String {
    format!("{}_{}.json", unix_nanos, pid)
}

/// Writes `payload` into `events_dir` and returns the final path.
///
/// Returns `Ok(None)` for blank payloads.
pub fn write_notification(events_dir: &Path, payload: &str) -> Result<Option<PathBuf>> {
    if payload.trim().is_empty() {
        return Ok(None);
    }

    fs_err::create_dir_all(events_dir)
        .map_err(|e| SwitchboardError::io("creating events directory", e))?;

    let mut nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1_000);
    let pid = std::process::id();

    let mut temp = Builder::new()
        .prefix(".incoming-")
        .tempfile_in(events_dir)
        .map_err(|e| SwitchboardError::io("creating temp notification file", e))?;
    temp.write_all(payload.as_bytes())
        .map_err(|e| SwitchboardError::io("writing notification file", e))?;
    temp.flush()
        .map_err(|e| SwitchboardError::io("flushing notification file", e))?;

    // Names must stay unique; on a same-nanosecond collision bump the timestamp.
    let mut attempts = 0;
    loop {
        let target = events_dir.join(notification_file_name(nanos, pid));
        match temp.persist_noclobber(&target) {
            Ok(_) => return Ok(Some(target)),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists && attempts < MAX_NAME_ATTEMPTS => {
                temp = e.file;
                nanos += 1;
                attempts += 1;
            }
            Err(e) => {
                return Err(SwitchboardError::io("persisting notification file", e.error));
            }
        }
    }
}
