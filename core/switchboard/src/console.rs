//! `switchboard watch`: runs the supervisor in the foreground.
//!
//! The events directory watcher and a stdin reader both feed one channel; the
//! supervisor drains it on the main thread. Prompts and command results are
//! printed to stdout, so the terminal doubles as the prompt surface.

use std::io::BufRead;
use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::thread;

use switchboard_core::prompts::PromptRequest;
use switchboard_core::{
    load_config, ChangedFile, CodeWorkspaceFile, CommandOutcome, FocusOutcome, GitCli,
    HostActions, NotifyEventSource, PromptAction, PromptPresenter, PromptToken, Session,
    StorageConfig, Supervisor, SupervisorCommand, SupervisorMessage, SupervisorParts,
    SwitchboardError, UnfocusOutcome,
};

use crate::commands;

const HELP: &str = "\
Commands:
  add <dir> [name]           register a session
  remove <id>                unregister a session
  reset <id>                 clear a complete status
  idle <id>                  force a session to idle
  closed <id>                the session's terminal was closed
  front <id>                 the session's terminal was brought to front
  respond <token> <action>   answer a prompt (open, changes, dismiss)
  focus <id>                 put the session's folder in the workspace
  unfocus                    remove the focused folder
  changes <id>               list uncommitted changes
  summary                    count sessions by status
  help                       show this list
  quit                       stop watching";

/// What one line of console input asks for.
#[derive(Debug, PartialEq, Eq)]
enum ConsoleLine {
    Empty,
    Help,
    Message(SupervisorMessage),
}

pub fn run(storage: &StorageConfig) -> Result<(), SwitchboardError> {
    let config = load_config(&storage.config_file());
    let store = commands::open_store(storage)?;
    let workspace = commands::workspace_file(storage, &config);
    tracing::info!(workspace = %workspace.display(), "Starting supervisor");

    let supervisor = Supervisor::new(SupervisorParts {
        config,
        events_dir: storage.events_dir(),
        store,
        folders: Box::new(CodeWorkspaceFile::new(workspace)),
        query: Box::new(GitCli::new()),
        presenter: Box::new(ConsolePresenter),
        host: Box::new(ConsoleHost),
    });

    let (tx, rx) = mpsc::channel();

    let file_tx = tx.clone();
    let _source = NotifyEventSource::start(&storage.events_dir(), move |path| {
        let _ = file_tx.send(SupervisorMessage::FileReady(path));
    })?;

    spawn_stdin_reader(tx);
    println!("Watching. Type `help` for commands.");
    supervisor.run(rx);
    Ok(())
}

fn spawn_stdin_reader(tx: Sender<SupervisorMessage>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_console_line(&line) {
                Ok(ConsoleLine::Empty) => {}
                Ok(ConsoleLine::Help) => println!("{HELP}"),
                Ok(ConsoleLine::Message(message)) => {
                    let shutdown = message == SupervisorMessage::Shutdown;
                    let message = match resolve_directory(message) {
                        Ok(message) => message,
                        Err(e) => {
                            println!("error: {e}");
                            continue;
                        }
                    };
                    if tx.send(message).is_err() || shutdown {
                        return;
                    }
                }
                Err(e) => println!("error: {e}"),
            }
        }
        let _ = tx.send(SupervisorMessage::Shutdown);
    });
}

/// Sessions are keyed by absolute directory, so `add .` has to be expanded
/// against our own working directory before the supervisor sees it.
fn resolve_directory(message: SupervisorMessage) -> Result<SupervisorMessage, SwitchboardError> {
    match message {
        SupervisorMessage::Command(SupervisorCommand::AddSession { directory, name }) => {
            let directory = commands::absolute(Path::new(&directory))?;
            Ok(SupervisorMessage::Command(SupervisorCommand::AddSession {
                directory,
                name,
            }))
        }
        other => Ok(other),
    }
}

fn parse_console_line(line: &str) -> Result<ConsoleLine, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(ConsoleLine::Empty);
    };
    let args: Vec<&str> = words.collect();

    let id = |usage: &str| -> Result<String, String> {
        match args.as_slice() {
            [id] => Ok(id.to_string()),
            _ => Err(format!("usage: {usage}")),
        }
    };

    let command = match verb {
        "help" | "?" => return Ok(ConsoleLine::Help),
        "quit" | "exit" => return Ok(ConsoleLine::Message(SupervisorMessage::Shutdown)),
        "add" => match args.as_slice() {
            [directory] => SupervisorCommand::AddSession {
                directory: directory.to_string(),
                name: None,
            },
            [directory, name @ ..] => SupervisorCommand::AddSession {
                directory: directory.to_string(),
                name: Some(name.join(" ")),
            },
            [] => return Err("usage: add <dir> [name]".to_string()),
        },
        "remove" => SupervisorCommand::RemoveSession {
            id: id("remove <id>")?,
        },
        "reset" => SupervisorCommand::ResetStatus {
            id: id("reset <id>")?,
        },
        "idle" => SupervisorCommand::SetStatusIdle {
            id: id("idle <id>")?,
        },
        "closed" => SupervisorCommand::TerminalClosed {
            id: id("closed <id>")?,
        },
        "front" => SupervisorCommand::TerminalFocused {
            id: id("front <id>")?,
        },
        "focus" => SupervisorCommand::FocusWorkspace {
            id: id("focus <id>")?,
        },
        "changes" => SupervisorCommand::ShowChanges {
            id: id("changes <id>")?,
        },
        "unfocus" if args.is_empty() => SupervisorCommand::UnfocusWorkspace,
        "summary" if args.is_empty() => SupervisorCommand::Summary,
        "respond" => match args.as_slice() {
            [token, action] => SupervisorCommand::RespondPrompt {
                token: token.parse::<PromptToken>()?,
                action: action.parse::<PromptAction>()?,
            },
            _ => return Err("usage: respond <token> <open|changes|dismiss>".to_string()),
        },
        "unfocus" | "summary" => return Err(format!("usage: {verb}")),
        other => return Err(format!("unknown command `{other}`; try `help`")),
    };

    Ok(ConsoleLine::Message(SupervisorMessage::Command(command)))
}

struct ConsolePresenter;

impl PromptPresenter for ConsolePresenter {
    fn present(&mut self, request: &PromptRequest) {
        let actions: Vec<&str> = request
            .actions
            .iter()
            .map(|action| match action {
                PromptAction::OpenTerminal => "open",
                PromptAction::ShowChanges => "changes",
                PromptAction::Dismiss => "dismiss",
            })
            .collect();
        println!("[{}] {}", request.token, request.message);
        println!("    respond {} <{}>", request.token, actions.join("|"));
    }

    fn withdraw(&mut self, token: PromptToken) {
        println!("[{token}] no longer relevant");
    }
}

struct ConsoleHost;

impl HostActions for ConsoleHost {
    fn open_terminal(&mut self, session: &Session) {
        println!("Open a terminal in {} ({})", session.directory, session.name);
    }

    fn show_changes(&mut self, session: &Session, files: &[ChangedFile]) {
        println!("Changes in {}:", session.name);
        commands::print_changes(files);
    }

    fn command_completed(&mut self, outcome: &CommandOutcome) {
        match outcome {
            CommandOutcome::SessionAdded(session) => {
                println!("Added {}\t{}\t{}", session.id, session.name, session.directory)
            }
            CommandOutcome::SessionRemoved(session) => {
                println!("Removed {} ({})", session.name, session.directory)
            }
            CommandOutcome::Focused(FocusOutcome::AlreadyFocused) => println!("Already focused"),
            CommandOutcome::Focused(FocusOutcome::Replaced { previous }) => {
                println!("Focused (replaced {previous})")
            }
            CommandOutcome::Focused(_) => println!("Focused"),
            CommandOutcome::Unfocused(UnfocusOutcome::NothingFocused) => {
                println!("Nothing is focused")
            }
            CommandOutcome::Unfocused(_) => println!("Unfocused"),
            CommandOutcome::Status(Some(change)) => {
                println!("{}: {} -> {}", change.directory, change.previous, change.current)
            }
            CommandOutcome::Status(None) => println!("Status unchanged"),
            CommandOutcome::PromptResolved(Some(resolution)) => {
                tracing::debug!(token = %resolution.token, "Prompt resolved");
            }
            CommandOutcome::PromptResolved(None) => println!("That prompt is no longer live"),
            CommandOutcome::Changes(files) => commands::print_changes(files),
            CommandOutcome::Summary(summary) => println!("{summary}"),
        }
    }

    fn command_failed(&mut self, error: &SwitchboardError) {
        println!("error: {error}");
    }
}
