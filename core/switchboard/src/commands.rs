//! One-shot subcommands. Each opens the on-disk state, does one thing, and exits.

use std::path::{Path, PathBuf};

use switchboard_core::store::shared;
use switchboard_core::{
    load_config, ChangeSetAggregator, ChangedFile, CodeWorkspaceFile, FocusArbiter, FocusOutcome, GitCli,
    HookInstaller, HookStatus, JsonFileStore, SessionRegistry, SharedStore, StorageConfig,
    SupervisorConfig, SwitchboardError, UnfocusOutcome, UninstallResult,
};

type Result<T> = std::result::Result<T, SwitchboardError>;

pub(crate) fn open_store(storage: &StorageConfig) -> Result<SharedStore> {
    storage.ensure_dirs()?;
    Ok(shared(JsonFileStore::load(&storage.state_file())?))
}

pub(crate) fn workspace_file(storage: &StorageConfig, config: &SupervisorConfig) -> PathBuf {
    config
        .workspace_file
        .clone()
        .unwrap_or_else(|| storage.default_workspace_file())
}

fn focus_arbiter(storage: &StorageConfig, store: SharedStore) -> FocusArbiter {
    let config = load_config(&storage.config_file());
    let folders = CodeWorkspaceFile::new(workspace_file(storage, &config));
    FocusArbiter::load(Box::new(folders), store)
}

/// Makes a relative directory absolute against the current directory.
pub(crate) fn absolute(directory: &Path) -> Result<String> {
    let path = if directory.is_absolute() {
        directory.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| SwitchboardError::Io {
                context: "resolving current directory".to_string(),
                source: e,
            })?
            .join(directory)
    };
    Ok(path.to_string_lossy().to_string())
}

pub fn add(storage: &StorageConfig, directory: &Path, name: Option<&str>) -> Result<()> {
    let mut registry = SessionRegistry::load(open_store(storage)?);
    let session = registry.add(&absolute(directory)?, name)?;
    println!("{}\t{}\t{}", session.id, session.name, session.directory);
    Ok(())
}

pub fn remove(storage: &StorageConfig, id: &str) -> Result<()> {
    let store = open_store(storage)?;
    let mut registry = SessionRegistry::load(store.clone());
    let session = registry.remove(id)?;
    println!("Removed {} ({})", session.name, session.directory);

    if let Err(e) = focus_arbiter(storage, store).on_session_removed(id) {
        tracing::warn!(session = %id, error = %e, "Removed session could not be unfocused");
        println!("Warning: {} is still in the workspace file", session.directory);
    }
    Ok(())
}

pub fn list(storage: &StorageConfig) -> Result<()> {
    let store = open_store(storage)?;
    let registry = SessionRegistry::load(store.clone());
    let focus = focus_arbiter(storage, store);
    let focused = focus.state().focused_session_id.as_deref();

    if registry.list().is_empty() {
        println!("No sessions. Add one with `switchboard add <DIR>`.");
        return Ok(());
    }
    for session in registry.list() {
        let marker = if Some(session.id.as_str()) == focused { "*" } else { " " };
        println!(
            "{marker} {}\t{}\t{}\t{}",
            session.id,
            session.name,
            session.directory,
            session.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub fn focus(storage: &StorageConfig, id: &str) -> Result<()> {
    let store = open_store(storage)?;
    let registry = SessionRegistry::load(store.clone());
    let session = registry.require(id)?;

    match focus_arbiter(storage, store).focus(session)? {
        FocusOutcome::AlreadyFocused => println!("{} is already focused", session.name),
        FocusOutcome::Adopted => println!("Focused {} (already in workspace)", session.name),
        FocusOutcome::Replaced { previous } => {
            println!("Focused {} (replaced {})", session.name, previous)
        }
        FocusOutcome::Appended => println!("Focused {}", session.name),
    }
    Ok(())
}

pub fn unfocus(storage: &StorageConfig) -> Result<()> {
    let store = open_store(storage)?;
    match focus_arbiter(storage, store).unfocus()? {
        UnfocusOutcome::NothingFocused => println!("Nothing is focused"),
        UnfocusOutcome::Removed | UnfocusOutcome::ClearedMissing => println!("Unfocused"),
    }
    Ok(())
}

pub fn changes(storage: &StorageConfig, id: &str) -> Result<()> {
    let registry = SessionRegistry::load(open_store(storage)?);
    let session = registry.require(id)?;
    let config = load_config(&storage.config_file());

    let mut aggregator =
        ChangeSetAggregator::new(Box::new(GitCli::new()), config.change_cache_ttl());
    let files = aggregator.changed_files(session);
    print_changes(&files);
    Ok(())
}

pub(crate) fn print_changes(files: &[ChangedFile]) {
    if files.is_empty() {
        println!("No uncommitted changes");
        return;
    }
    for file in files.iter() {
        println!("{} {}", file.status.code(), file.path);
    }
}

pub fn install_hooks(storage: &StorageConfig, command: Option<String>) -> Result<()> {
    let mut installer = HookInstaller::new(storage);
    if let Some(command) = command {
        installer = installer.with_command(command);
    }

    let result = installer.install()?;
    println!("{}", result.message);
    if let Some(path) = result.settings_path {
        println!("Settings: {}", path);
    }
    if !result.success {
        return Err(SwitchboardError::CommandFailed {
            command: "install-hooks".to_string(),
            details: result.message,
        });
    }
    Ok(())
}

pub fn uninstall_hooks(storage: &StorageConfig) -> Result<()> {
    match HookInstaller::new(storage).uninstall()? {
        UninstallResult::Removed { entries } => println!("Removed {} hook entries", entries),
        UninstallResult::NothingToUninstall => println!("Nothing to uninstall"),
    }
    Ok(())
}

pub fn hooks_status(storage: &StorageConfig) -> Result<()> {
    let installer = HookInstaller::new(storage);
    match installer.status() {
        HookStatus::Installed => println!("Installed ({})", installer.settings_path().display()),
        HookStatus::NotInstalled => println!("Not installed. Run `switchboard install-hooks`."),
        HookStatus::Incomplete { missing } => {
            println!("Incomplete, missing: {}", missing.join(", "))
        }
        HookStatus::PolicyBlocked { reason } => println!("Blocked: {}", reason),
    }
    Ok(())
}
