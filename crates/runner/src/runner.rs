//! Process Runner
//!
//! Launches the interpreter on the persisted script and supervises it.
//! At most one run is active; a second `start` is rejected.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, debug, warn};

use script_bench_core::{new_session_id, RunStatus, RunnerConfig, SessionId};

use crate::output::{pump, DrainWindow};
use crate::session::{RunEvent, RunSession};
use crate::store::ScriptStore;
use crate::RunError;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What to run and with which interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub script_text: String,
    /// Bare executable name looked up on PATH, or a path to one
    pub interpreter: String,
}

impl RunRequest {
    pub fn new(script_text: impl Into<String>, interpreter: impl Into<String>) -> Self {
        Self {
            script_text: script_text.into(),
            interpreter: interpreter.into(),
        }
    }
}

struct ActiveRun {
    id: SessionId,
    cancel: CancellationToken,
}

type ActiveSlot = Arc<Mutex<Option<ActiveRun>>>;

/// Frees the active slot when dropped, unless another run already owns it
struct SlotGuard {
    slot: ActiveSlot,
    id: SessionId,
}

impl SlotGuard {
    fn claim(slot: &ActiveSlot, cancel: CancellationToken) -> Result<Self, RunError> {
        let mut active = slot.lock();
        if active.is_some() {
            return Err(RunError::AlreadyRunning);
        }
        let id = new_session_id();
        *active = Some(ActiveRun { id, cancel });
        Ok(Self {
            slot: Arc::clone(slot),
            id,
        })
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut active = self.slot.lock();
        if active.as_ref().is_some_and(|run| run.id == self.id) {
            *active = None;
        }
    }
}

/// Runs scripts one at a time
pub struct ProcessRunner {
    store: ScriptStore,
    kill_timeout: Duration,
    drain_timeout: Duration,
    active: ActiveSlot,
}

impl ProcessRunner {
    /// Create a runner writing scripts through `store`
    pub fn new(store: ScriptStore) -> Self {
        let defaults = RunnerConfig::default();
        Self {
            store,
            kill_timeout: defaults.kill_timeout(),
            drain_timeout: defaults.drain_timeout(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a runner from runner settings
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(ScriptStore::from_config(config))
            .with_timeouts(config.kill_timeout(), config.drain_timeout())
    }

    /// Set how long to wait for a killed process and for trailing output
    pub fn with_timeouts(mut self, kill: Duration, drain: Duration) -> Self {
        self.kill_timeout = kill;
        self.drain_timeout = drain;
        self
    }

    pub fn store(&self) -> &ScriptStore {
        &self.store
    }

    /// Whether a run is active
    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active.lock().as_ref().map(|run| run.id)
    }

    /// Cancel the active run, if any
    pub fn cancel(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(run) => {
                info!("Cancelling run {}", run.id);
                run.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Persist the script and launch the interpreter on it.
    ///
    /// Nothing is written while another run is active, and nothing is spawned
    /// if the script could not be written.
    pub async fn start(&self, request: RunRequest) -> Result<RunSession, RunError> {
        let cancel = CancellationToken::new();
        let guard = SlotGuard::claim(&self.active, cancel.clone())?;
        let id = guard.id;

        let script_path = self.store.write(&request.script_text).await?;
        let interpreter = resolve_interpreter(&request.interpreter)?;

        info!("Starting run {}: {:?} {:?}", id, interpreter, script_path);

        let mut child = Command::new(&interpreter)
            .arg(&script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunError::Spawn {
                interpreter: request.interpreter.clone(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (exited_tx, exited_rx) = watch::channel(None);
        let window = || DrainWindow::new(exited_rx.clone(), self.drain_timeout);

        // Both streams feed the same channel; cross-stream order is whatever
        // the OS hands us first.
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump(stdout, "stdout", tx.clone(), window())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump(stderr, "stderr", tx.clone(), window())));
        }

        let supervisor = Supervisor {
            id,
            child,
            readers,
            events: tx,
            exited: exited_tx,
            cancel: cancel.clone(),
            kill_timeout: self.kill_timeout,
        };
        tokio::spawn(supervisor.run(guard));

        Ok(RunSession::new(id, script_path, rx, cancel))
    }
}

/// Owns the child process from spawn until the terminal event
struct Supervisor {
    id: SessionId,
    child: Child,
    readers: Vec<JoinHandle<()>>,
    events: mpsc::Sender<RunEvent>,
    /// Tells readers when the process exited, which starts their drain window
    exited: watch::Sender<Option<Instant>>,
    cancel: CancellationToken,
    kill_timeout: Duration,
}

impl Supervisor {
    async fn run(mut self, guard: SlotGuard) {
        let waited = tokio::select! {
            status = self.child.wait() => Some(status),
            () = self.cancel.cancelled() => None,
        };

        let status = match waited {
            Some(Ok(exit)) => {
                if self.drain().await {
                    exit_status(exit)
                } else {
                    RunStatus::Cancelled
                }
            }
            Some(Err(e)) => {
                warn!("Waiting for run {} failed: {}", self.id, e);
                self.abort_readers();
                RunStatus::Terminated { signal: None }
            }
            None => {
                self.abort_readers();
                self.kill().await;
                RunStatus::Cancelled
            }
        };

        info!("Run {} finished: {}", self.id, status);

        // Free the slot first so a subscriber reacting to completion can start again
        drop(guard);
        let _ = self.events.send(RunEvent::Completed(status)).await;
    }

    /// Wait for readers to hand over everything the process wrote.
    ///
    /// Readers close pipes a grandchild keeps open on their own, so this only
    /// waits on the receiver. Returns false if the run was cancelled meanwhile.
    async fn drain(&mut self) -> bool {
        let _ = self.exited.send(Some(Instant::now()));
        tokio::select! {
            _ = join_all(self.readers.iter_mut()) => true,
            () = self.cancel.cancelled() => {
                debug!("Run {} cancelled while its output was draining", self.id);
                self.abort_readers();
                false
            }
        }
    }

    fn abort_readers(&self) {
        for reader in &self.readers {
            reader.abort();
        }
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("Kill for run {} failed, process likely gone: {}", self.id, e);
        }
        match tokio::time::timeout(self.kill_timeout, self.child.wait()).await {
            Ok(Ok(status)) => debug!("Run {} killed: {}", self.id, status),
            Ok(Err(e)) => warn!("Waiting for killed run {} failed: {}", self.id, e),
            Err(_) => warn!("Run {} did not exit within {:?} after kill", self.id, self.kill_timeout),
        }
    }
}

/// Resolve a bare interpreter name on PATH; paths are used as given
fn resolve_interpreter(interpreter: &str) -> Result<PathBuf, RunError> {
    let spawn_err = |reason: String| RunError::Spawn {
        interpreter: interpreter.to_string(),
        reason,
    };

    if interpreter.trim().is_empty() {
        return Err(spawn_err("no interpreter configured".into()));
    }

    let path = Path::new(interpreter);
    if path.components().count() > 1 {
        return Ok(path.to_path_buf());
    }

    which::which(interpreter).map_err(|e| spawn_err(e.to_string()))
}

fn exit_status(status: ExitStatus) -> RunStatus {
    match status.code() {
        Some(code) => RunStatus::Exited { code },
        None => RunStatus::Terminated {
            signal: signal_of(&status),
        },
    }
}

#[cfg(unix)]
fn signal_of(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &ExitStatus) -> Option<i32> {
    None
}
