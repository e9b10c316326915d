//! End-to-end tests: real notification files in a temp events directory,
//! driven through the supervisor with explicit instants.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use switchboard_core::changes::RepoChange;
use switchboard_core::focus::MemoryFolders;
use switchboard_core::prompts::RecordingPresenter;
use switchboard_core::store::shared;
use switchboard_core::{
    ChangeStatus, ChangedFile, CommandOutcome, HostActions, MemoryStore, PromptAction,
    RuntimeStatus, Session, StatusQuery, Supervisor, SupervisorCommand, SupervisorConfig,
    SupervisorMessage, SupervisorParts, SwitchboardError,
};
use tempfile::TempDir;

const READ_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone, Default)]
struct RecordingHost {
    opened: Arc<Mutex<Vec<String>>>,
    shown: Arc<Mutex<Vec<(String, usize)>>>,
    added: Arc<Mutex<Vec<Session>>>,
}

impl HostActions for RecordingHost {
    fn open_terminal(&mut self, session: &Session) {
        self.opened.lock().unwrap().push(session.id.clone());
    }

    fn show_changes(&mut self, session: &Session, files: &[ChangedFile]) {
        self.shown
            .lock()
            .unwrap()
            .push((session.id.clone(), files.len()));
    }

    fn command_completed(&mut self, outcome: &CommandOutcome) {
        if let CommandOutcome::SessionAdded(session) = outcome {
            self.added.lock().unwrap().push(session.clone());
        }
    }
}

/// Polls `done` every 20ms until it holds or five seconds pass.
fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    true
}

/// Reports one modified file per root, except roots named in `failing`.
#[derive(Clone, Default)]
struct FakeQuery {
    failing: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl StatusQuery for FakeQuery {
    fn changed_paths(&self, root: &Path) -> switchboard_core::Result<Vec<RepoChange>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(root.to_path_buf())
            .or_default() += 1;
        let name = root.file_name().unwrap().to_string_lossy().to_string();
        if self.failing.lock().unwrap().contains(&name) {
            return Err(SwitchboardError::CommandFailed {
                command: "git status".to_string(),
                details: "index.lock exists".to_string(),
            });
        }
        Ok(vec![RepoChange {
            path: format!("{name}.txt"),
            status: ChangeStatus::Modified,
        }])
    }
}

struct Harness {
    temp: TempDir,
    supervisor: Supervisor,
    presenter: RecordingPresenter,
    host: RecordingHost,
    folders: MemoryFolders,
    query: FakeQuery,
    published: Arc<Mutex<Vec<RuntimeStatus>>>,
    seq: u32,
}

impl Harness {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let events_dir = temp.path().join("events");
        fs_err::create_dir_all(&events_dir).unwrap();

        let presenter = RecordingPresenter::default();
        let host = RecordingHost::default();
        let folders = MemoryFolders::default();
        let query = FakeQuery::default();

        let mut supervisor = Supervisor::new(SupervisorParts {
            config: SupervisorConfig::default(),
            events_dir,
            store: shared(MemoryStore::new()),
            folders: Box::new(folders.clone()),
            query: Box::new(query.clone()),
            presenter: Box::new(presenter.clone()),
            host: Box::new(host.clone()),
        });

        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        supervisor
            .bus_mut()
            .subscribe(move |change, _| sink.lock().unwrap().push(change.current));

        Self {
            temp,
            supervisor,
            presenter,
            host,
            folders,
            query,
            published,
            seq: 0,
        }
    }

    fn events_dir(&self) -> PathBuf {
        self.temp.path().join("events")
    }

    fn add_session(&mut self, name: &str) -> Session {
        let dir = self.temp.path().join(name);
        fs_err::create_dir_all(&dir).unwrap();
        match self
            .supervisor
            .handle_command(
                SupervisorCommand::AddSession {
                    directory: dir.to_string_lossy().to_string(),
                    name: None,
                },
                Instant::now(),
            )
            .unwrap()
        {
            CommandOutcome::SessionAdded(session) => session,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    fn write_event(&mut self, session: &Session, body: &str) -> PathBuf {
        self.seq += 1;
        let path = self
            .events_dir()
            .join(format!("{}_4242.json", 1_700_000_000_000_000_000u64 + self.seq as u64));
        fs_err::write(
            &path,
            format!(
                r#"{{"session_id":"claude-1","cwd":"{}",{}}}"#,
                session.directory, body
            ),
        )
        .unwrap();
        path
    }

    /// Writes an event, notifies the supervisor, and runs the delayed read.
    fn deliver(&mut self, session: &Session, body: &str, now: Instant) -> usize {
        let path = self.write_event(session, body);
        self.supervisor.on_file_ready(path, now);
        self.supervisor.tick(now + READ_DELAY)
    }

    fn command(&mut self, command: SupervisorCommand) -> CommandOutcome {
        self.supervisor
            .handle_command(command, Instant::now())
            .unwrap()
    }
}

#[test]
fn duplicate_notifications_yield_one_transition() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    let path = h.write_event(&session, r#""hook_event_name":"PreToolUse""#);
    let t0 = Instant::now();

    assert!(h.supervisor.on_file_ready(path.clone(), t0));
    assert!(!h.supervisor.on_file_ready(path.clone(), t0 + Duration::from_millis(10)));
    assert_eq!(h.supervisor.tick(t0 + READ_DELAY), 1);
    assert!(!h.supervisor.on_file_ready(path, t0 + Duration::from_millis(500)));
    assert_eq!(h.supervisor.tick(t0 + Duration::from_secs(1)), 0);

    assert_eq!(*h.published.lock().unwrap(), vec![RuntimeStatus::Running]);
    assert_eq!(h.supervisor.ingestion_stats().duplicates_ignored, 2);
}

#[test]
fn consumed_files_are_removed_after_cleanup_delay() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    let t0 = Instant::now();
    let path = h.write_event(&session, r#""hook_event_name":"Stop""#);

    h.supervisor.on_file_ready(path.clone(), t0);
    h.supervisor.tick(t0 + READ_DELAY);
    assert!(path.exists());

    h.supervisor.tick(t0 + READ_DELAY + Duration::from_secs(5));
    assert!(!path.exists());
}

#[test]
fn repeated_identical_status_is_not_republished() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    let t0 = Instant::now();

    h.deliver(&session, r#""hook_event_name":"PreToolUse""#, t0);
    h.deliver(&session, r#""hook_event_name":"PostToolUse""#, t0);
    h.deliver(&session, r#""hook_event_name":"PreCompact""#, t0);

    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Running);
    assert_eq!(*h.published.lock().unwrap(), vec![RuntimeStatus::Running]);
}

#[test]
fn malformed_file_does_not_block_others() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    let t0 = Instant::now();

    let broken = h.events_dir().join("1_1.json");
    fs_err::write(&broken, "{ truncated").unwrap();
    let good = h.write_event(&session, r#""hook_event_name":"Stop""#);

    h.supervisor.on_file_ready(broken.clone(), t0);
    h.supervisor.on_file_ready(good, t0);
    assert_eq!(h.supervisor.tick(t0 + READ_DELAY), 1);

    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Complete);
    assert_eq!(h.supervisor.ingestion_stats().malformed, 1);
    assert!(!h.supervisor.on_file_ready(broken, t0 + Duration::from_secs(1)));
}

#[test]
fn backlog_replays_latest_events_on_start() {
    let mut h = Harness::new();
    let session = h.add_session("api");

    let first = h.write_event(&session, r#""hook_event_name":"PreToolUse""#);
    let last = h.write_event(&session, r#""hook_event_name":"Stop""#);
    let base = std::time::SystemTime::now() - Duration::from_secs(60);
    std::fs::File::options()
        .write(true)
        .open(&first)
        .unwrap()
        .set_modified(base)
        .unwrap();
    std::fs::File::options()
        .write(true)
        .open(&last)
        .unwrap()
        .set_modified(base + Duration::from_secs(1))
        .unwrap();

    assert_eq!(h.supervisor.start(Instant::now()), 2);
    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Complete);
    assert_eq!(
        *h.published.lock().unwrap(),
        vec![RuntimeStatus::Running, RuntimeStatus::Complete]
    );
}

#[test]
fn stale_prompt_response_executes_nothing() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    let t0 = Instant::now();

    h.deliver(
        &session,
        r#""hook_event_name":"Notification","notification_type":"permission_prompt""#,
        t0,
    );
    let p1 = h.presenter.presented.lock().unwrap()[0].token;
    h.deliver(&session, r#""hook_event_name":"PostToolUse""#, t0);

    let outcome = h.command(SupervisorCommand::RespondPrompt {
        token: p1,
        action: PromptAction::OpenTerminal,
    });

    assert!(matches!(outcome, CommandOutcome::PromptResolved(None)));
    assert!(h.host.opened.lock().unwrap().is_empty());
    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Running);
}

#[test]
fn terminal_brought_to_front_dismisses_prompt() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    h.deliver(&session, r#""hook_event_name":"Stop""#, Instant::now());
    let token = h.presenter.presented.lock().unwrap()[0].token;

    let outcome = h.command(SupervisorCommand::TerminalFocused {
        id: session.id.clone(),
    });
    assert!(matches!(outcome, CommandOutcome::Status(Some(_))));
    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Idle);

    h.command(SupervisorCommand::RespondPrompt {
        token,
        action: PromptAction::OpenTerminal,
    });
    assert!(h.host.opened.lock().unwrap().is_empty());
}

#[test]
fn live_prompt_opens_terminal_and_resets() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    h.deliver(&session, r#""hook_event_name":"Stop""#, Instant::now());
    let token = h.presenter.presented.lock().unwrap()[0].token;

    let outcome = h.command(SupervisorCommand::RespondPrompt {
        token,
        action: PromptAction::OpenTerminal,
    });

    assert!(matches!(outcome, CommandOutcome::PromptResolved(Some(_))));
    assert_eq!(*h.host.opened.lock().unwrap(), vec![session.id.clone()]);
    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Idle);
}

#[test]
fn reset_and_override_commands() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    let t0 = Instant::now();

    h.deliver(&session, r#""hook_event_name":"PreToolUse""#, t0);
    let outcome = h.command(SupervisorCommand::ResetStatus {
        id: session.id.clone(),
    });
    assert!(matches!(outcome, CommandOutcome::Status(None)));
    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Running);

    h.command(SupervisorCommand::SetStatusIdle {
        id: session.id.clone(),
    });
    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Idle);

    h.deliver(&session, r#""hook_event_name":"Stop""#, t0);
    h.command(SupervisorCommand::TerminalClosed {
        id: session.id.clone(),
    });
    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Idle);
}

#[test]
fn summary_counts_all_sessions() {
    let mut h = Harness::new();
    let api = h.add_session("api");
    let web = h.add_session("web");
    h.add_session("docs");
    let t0 = Instant::now();

    h.deliver(&api, r#""hook_event_name":"PreToolUse""#, t0);
    h.deliver(
        &web,
        r#""hook_event_name":"Notification","notification_type":"permission_prompt""#,
        t0,
    );

    match h.command(SupervisorCommand::Summary) {
        CommandOutcome::Summary(summary) => {
            assert_eq!(summary.running, 1);
            assert_eq!(summary.stuck, 1);
            assert_eq!(summary.idle, 1);
            assert_eq!(summary.total(), 3);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn changes_merge_roots_and_survive_one_failure() {
    let mut h = Harness::new();
    let session = h.add_session("fleet");
    for repo in ["api", "web"] {
        fs_err::create_dir_all(Path::new(&session.directory).join(repo).join(".git")).unwrap();
    }
    h.query.failing.lock().unwrap().push("api".to_string());

    match h.command(SupervisorCommand::ShowChanges {
        id: session.id.clone(),
    }) {
        CommandOutcome::Changes(files) => {
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].path, "web/web.txt");
            assert_eq!(files[0].status.code(), 'M');
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    // Served from cache within the TTL.
    h.command(SupervisorCommand::ShowChanges {
        id: session.id.clone(),
    });
    let web_root = Path::new(&session.directory).join("web");
    assert_eq!(h.query.calls.lock().unwrap()[&web_root], 1);
}

#[test]
fn focus_commands_keep_single_focus() {
    let mut h = Harness::new();
    let a = h.add_session("a");
    let b = h.add_session("b");

    for command in [
        SupervisorCommand::FocusWorkspace { id: a.id.clone() },
        SupervisorCommand::FocusWorkspace { id: b.id.clone() },
        SupervisorCommand::UnfocusWorkspace,
        SupervisorCommand::FocusWorkspace { id: a.id.clone() },
    ] {
        h.command(command);
        let folders = h.folders.snapshot();
        assert!(folders.len() <= 1, "{folders:?}");
    }

    assert_eq!(h.folders.snapshot(), vec![PathBuf::from(&a.directory)]);
    assert_eq!(
        h.supervisor.focus_state().focused_session_id.as_deref(),
        Some(a.id.as_str())
    );
}

#[test]
fn removing_focused_session_unfocuses_it() {
    let mut h = Harness::new();
    let a = h.add_session("a");
    h.command(SupervisorCommand::FocusWorkspace { id: a.id.clone() });

    h.command(SupervisorCommand::RemoveSession { id: a.id.clone() });

    assert!(h.folders.snapshot().is_empty());
    assert!(!h.supervisor.focus_state().is_focused());
    assert!(h.supervisor.sessions().is_empty());
}

#[test]
fn unknown_session_commands_fail() {
    let mut h = Harness::new();
    let err = h
        .supervisor
        .handle_command(
            SupervisorCommand::ResetStatus {
                id: "missing".to_string(),
            },
            Instant::now(),
        )
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::SessionNotFound(_)));
}

#[test]
fn run_loop_processes_messages_until_shutdown() {
    let h = Harness::new();
    let events_dir = h.events_dir();
    let session_dir = h.temp.path().join("api");
    fs_err::create_dir_all(&session_dir).unwrap();
    let published = Arc::clone(&h.published);
    let added = Arc::clone(&h.host.added);
    let Harness {
        temp: _temp,
        supervisor,
        ..
    } = h;

    let (tx, rx) = std::sync::mpsc::channel();
    let handle = std::thread::spawn(move || supervisor.run(rx));

    tx.send(SupervisorMessage::Command(SupervisorCommand::AddSession {
        directory: session_dir.to_string_lossy().to_string(),
        name: None,
    }))
    .unwrap();
    // The event file must not exist before the session does, or startup
    // replays it for a directory nobody is tracking yet.
    assert!(wait_until(|| !added.lock().unwrap().is_empty()));

    let path = events_dir.join("1700000000000000001_7.json");
    fs_err::write(
        &path,
        format!(
            r#"{{"cwd":"{}","hook_event_name":"PreToolUse"}}"#,
            session_dir.to_string_lossy()
        ),
    )
    .unwrap();
    tx.send(SupervisorMessage::FileReady(path)).unwrap();

    assert!(wait_until(|| !published.lock().unwrap().is_empty()));
    tx.send(SupervisorMessage::Shutdown).unwrap();
    handle.join().unwrap();
    assert_eq!(*published.lock().unwrap(), vec![RuntimeStatus::Running]);
}

#[test]
fn run_loop_publishes_backlog_for_registered_session() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    h.write_event(&session, r#""hook_event_name":"Stop""#);
    let published = Arc::clone(&h.published);
    let presented = Arc::clone(&h.presenter.presented);
    let Harness {
        temp: _temp,
        supervisor,
        ..
    } = h;

    let (tx, rx) = std::sync::mpsc::channel();
    let handle = std::thread::spawn(move || supervisor.run(rx));

    assert!(wait_until(|| !published.lock().unwrap().is_empty()));
    tx.send(SupervisorMessage::Shutdown).unwrap();
    handle.join().unwrap();

    assert_eq!(*published.lock().unwrap(), vec![RuntimeStatus::Complete]);
    assert_eq!(presented.lock().unwrap().len(), 1);
}

#[test]
fn rejected_unfocus_still_removes_session() {
    let mut h = Harness::new();
    let a = h.add_session("a");
    h.command(SupervisorCommand::FocusWorkspace { id: a.id.clone() });
    h.folders.set_reject(true);

    match h.command(SupervisorCommand::RemoveSession { id: a.id.clone() }) {
        CommandOutcome::SessionRemoved(removed) => assert_eq!(removed.id, a.id),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(h.supervisor.sessions().is_empty());
    assert_eq!(h.folders.snapshot(), vec![PathBuf::from(&a.directory)]);
}

#[test]
fn live_prompt_can_show_changes() {
    let mut h = Harness::new();
    let session = h.add_session("api");
    fs_err::create_dir_all(Path::new(&session.directory).join(".git")).unwrap();
    h.deliver(&session, r#""hook_event_name":"Stop""#, Instant::now());
    let token = h.presenter.presented.lock().unwrap()[0].token;

    h.command(SupervisorCommand::RespondPrompt {
        token,
        action: PromptAction::ShowChanges,
    });

    assert_eq!(*h.host.shown.lock().unwrap(), vec![(session.id.clone(), 1)]);
    // Showing changes is not re-engaging with the terminal.
    assert_eq!(h.supervisor.status(&session.directory), RuntimeStatus::Complete);
}
