//! `switchboard hook`: the producer end of the events drop-box.
//!
//! Claude Code runs this for every registered hook and pipes the event JSON
//! to stdin. We copy it into the events directory and exit. The payload is not
//! parsed here; the supervisor does that when it reads the file.

use std::io::Read;

use switchboard_core::{write_notification, StorageConfig, SwitchboardError};

pub fn run(storage: &StorageConfig) -> Result<(), SwitchboardError> {
    let mut payload = String::new();
    std::io::stdin()
        .read_to_string(&mut payload)
        .map_err(|e| SwitchboardError::Io {
            context: "reading hook payload from stdin".to_string(),
            source: e,
        })?;

    match write_notification(&storage.events_dir(), &payload)? {
        Some(path) => tracing::debug!(path = %path.display(), "Hook event written"),
        None => tracing::debug!("Empty hook payload; nothing written"),
    }
    Ok(())
}
