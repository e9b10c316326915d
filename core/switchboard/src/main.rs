//! switchboard: supervise several Claude Code sessions from one place.
//!
//! ## Subcommands
//!
//! - `hook`: Called by Claude Code hooks; drops the event JSON into the events directory
//! - `watch`: Runs the supervisor in the foreground with an interactive console
//! - `add`/`remove`/`list`: Manage registered sessions
//! - `focus`/`unfocus`: Put a session's folder into the shared workspace file
//! - `changes`: List uncommitted changes across a session's repositories
//! - `install-hooks`/`uninstall-hooks`/`hooks-status`: Manage `~/.claude/settings.json`

mod commands;
mod console;
mod hook;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use switchboard_core::{StorageConfig, SwitchboardError};

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Supervise Claude Code sessions across directories")]
#[command(version)]
struct Cli {
    /// State directory (defaults to ~/.switchboard)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a hook event (reads JSON from stdin)
    Hook,

    /// Run the supervisor in the foreground
    Watch,

    /// Register a session for a working directory
    Add {
        #[arg(value_name = "DIR")]
        directory: PathBuf,

        /// Display name (defaults to the directory's last component)
        #[arg(long)]
        name: Option<String>,
    },

    /// Unregister a session
    Remove {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// List registered sessions (the focused one is marked with `*`)
    List,

    /// Make a session's folder the focused workspace folder
    Focus {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Remove the focused folder from the workspace
    Unfocus,

    /// List uncommitted changes for a session
    Changes {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Register the hook in ~/.claude/settings.json
    InstallHooks {
        /// Command Claude Code should run (defaults to $HOME/.local/bin/switchboard hook)
        #[arg(long)]
        command: Option<String>,
    },

    /// Remove our hook entries from ~/.claude/settings.json
    UninstallHooks,

    /// Report whether the hook is installed
    HooksStatus,
}

fn storage(root: Option<PathBuf>) -> Result<StorageConfig, SwitchboardError> {
    match root {
        Some(root) => StorageConfig::with_root(root),
        None => StorageConfig::from_home(),
    }
}

fn main() {
    let cli = Cli::parse();
    let is_hook = matches!(cli.command, Commands::Hook);

    let storage = match storage(cli.root) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("switchboard: {e}");
            // Never fail a hook; Claude Code surfaces non-zero exits to the user.
            std::process::exit(if is_hook { 0 } else { 1 });
        }
    };

    let logging_guard = logging::init(&storage.logs_dir(), !is_hook);

    let result = match cli.command {
        Commands::Hook => {
            if let Err(e) = hook::run(&storage) {
                tracing::warn!(error = %e, "switchboard hook failed");
            }
            return;
        }
        Commands::Watch => console::run(&storage),
        Commands::Add { directory, name } => commands::add(&storage, &directory, name.as_deref()),
        Commands::Remove { id } => commands::remove(&storage, &id),
        Commands::List => commands::list(&storage),
        Commands::Focus { id } => commands::focus(&storage, &id),
        Commands::Unfocus => commands::unfocus(&storage),
        Commands::Changes { id } => commands::changes(&storage, &id),
        Commands::InstallHooks { command } => commands::install_hooks(&storage, command),
        Commands::UninstallHooks => commands::uninstall_hooks(&storage),
        Commands::HooksStatus => commands::hooks_status(&storage),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "switchboard failed");
        drop(logging_guard);
        std::process::exit(1);
    }
}
