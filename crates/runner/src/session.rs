//! Run sessions
//!
//! A [`RunSession`] is the caller's end of one script execution. Output
//! chunks arrive in the order they were read, followed by exactly one
//! [`RunEvent::Completed`].

use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use script_bench_core::{RunStatus, SessionId};

/// Event delivered to the session owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Text written to stdout or stderr
    Output(String),
    /// Terminal event; nothing follows it
    Completed(RunStatus),
}

/// Callback interface for consumers that prefer push delivery
pub trait RunSubscriber {
    fn on_chunk(&mut self, text: &str);
    fn on_complete(&mut self, status: RunStatus);
}

/// Subscriber that keeps everything it is given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub output: String,
    pub chunks: usize,
    pub status: Option<RunStatus>,
}

impl RunSubscriber for Transcript {
    fn on_chunk(&mut self, text: &str) {
        self.output.push_str(text);
        self.chunks += 1;
    }

    fn on_complete(&mut self, status: RunStatus) {
        self.status = Some(status);
    }
}

/// Handle to one in-flight script execution
///
/// Dropping a session before its terminal event cancels the run.
#[derive(Debug)]
pub struct RunSession {
    id: SessionId,
    script_path: PathBuf,
    events: mpsc::Receiver<RunEvent>,
    cancel: CancellationToken,
    finished: bool,
    discarded: usize,
}

impl RunSession {
    pub(crate) fn new(
        id: SessionId,
        script_path: PathBuf,
        events: mpsc::Receiver<RunEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            script_path,
            events,
            cancel,
            finished: false,
            discarded: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Whether the terminal event has been delivered
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Ask the runner to kill the process. The terminal event still arrives,
    /// as [`RunStatus::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run, for use from another task
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next event, or `None` once the terminal event has been delivered.
    ///
    /// Once the run is cancelled, output still queued in the channel is
    /// dropped and only the terminal event comes through.
    ///
    /// Cancel safe, so it can sit in a `select!` loop.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        if self.finished {
            return None;
        }

        loop {
            match self.events.recv().await {
                Some(RunEvent::Output(_)) if self.cancel.is_cancelled() => {
                    self.discarded += 1;
                }
                Some(event) => {
                    if matches!(event, RunEvent::Completed(_)) {
                        self.finished = true;
                        if self.discarded > 0 {
                            debug!("Run {} dropped {} chunks queued before cancel", self.id, self.discarded);
                        }
                    }
                    return Some(event);
                }
                None => {
                    // Supervisor went away without reporting; still end the session once
                    warn!("Run {} ended without a terminal event", self.id);
                    self.finished = true;
                    return Some(RunEvent::Completed(RunStatus::Terminated { signal: None }));
                }
            }
        }
    }

    /// Drive the session to completion, delivering every event to `subscriber`
    pub async fn pump<S: RunSubscriber + ?Sized>(mut self, subscriber: &mut S) -> RunStatus {
        while let Some(event) = self.next_event().await {
            match event {
                RunEvent::Output(text) => subscriber.on_chunk(&text),
                RunEvent::Completed(status) => {
                    subscriber.on_complete(status);
                    return status;
                }
            }
        }
        // Only reached if the terminal event was consumed before pumping
        RunStatus::Terminated { signal: None }
    }

    /// Collect the whole run into a [`Transcript`]
    pub async fn collect(self) -> Transcript {
        let mut transcript = Transcript::default();
        self.pump(&mut transcript).await;
        transcript
    }
}

impl Drop for RunSession {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.cancel();
        }
    }
}
