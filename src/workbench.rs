//! Workbench session
//!
//! Owns everything the editor shell talks to: the text buffer, the highlight
//! scheduler, the process runner, and the output log. The shell calls
//! `on_edit`, `run`, and `cancel`, and keeps calling `tick` from its main
//! loop; every state change is also published on the event bus.

use std::sync::Arc;
use tracing::{info, debug, warn};

use script_bench_core::{AppConfig, Event, EventBus, EventSubscription, Result, SessionId, WorkbenchError};
use script_bench_editor::{HighlightMsg, HighlightOutcome, HighlightScheduler, KeywordSet, TextBuffer};
use script_bench_runner::{ProcessRunner, RunEvent, RunRequest, RunSession};

/// Work that arrived for the primary loop
enum Incoming {
    Highlight(HighlightMsg),
    Run(RunEvent),
}

/// One editing and execution session
pub struct Workbench {
    config: AppConfig,
    buffer: TextBuffer,
    scheduler: HighlightScheduler,
    runner: ProcessRunner,
    session: Option<RunSession>,
    output: String,
    events: Arc<EventBus>,
}

impl Workbench {
    /// Create a workbench with the built-in keyword set. Must be called inside
    /// a tokio runtime.
    pub fn new(config: AppConfig) -> Self {
        Self::with_keywords(config, KeywordSet::default())
    }

    pub fn with_keywords(config: AppConfig, keywords: KeywordSet) -> Self {
        let scheduler = HighlightScheduler::from_config(keywords, &config.editor);
        let runner = ProcessRunner::from_config(&config.runner);

        Self {
            config,
            buffer: TextBuffer::new(),
            scheduler,
            runner,
            session: None,
            output: String::new(),
            events: Arc::new(EventBus::new()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Everything the scripts have printed since the last clear
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Get the event bus for subscribing to events
    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.session.as_ref().map(RunSession::id)
    }

    /// No highlight pass pending and no script running
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle() && self.session.is_none()
    }

    /// Replace the text and highlight it right away, as when a script is opened
    pub fn load_text(&mut self, text: &str) -> u64 {
        let revision = self.buffer.mutate(text);
        self.emit(Event::BufferEdited { revision });
        let outcome = self.scheduler.highlight_now(&mut self.buffer);
        self.emit_highlight(outcome);
        revision
    }

    /// The user changed the text
    pub fn on_edit(&mut self, text: &str) -> u64 {
        let revision = self.buffer.mutate(text);
        self.scheduler.on_edit(revision);
        self.emit(Event::BufferEdited { revision });
        revision
    }

    /// Run the current buffer.
    ///
    /// Launch failures are also written to the output log, the way the user
    /// sees them. A run requested while another is active is rejected
    /// without touching anything.
    pub async fn run(&mut self) -> Result<SessionId> {
        if self.session.is_some() {
            debug!("Run requested while a script is active");
            return Err(WorkbenchError::AlreadyRunning);
        }

        if self.config.output.auto_clear {
            self.clear_output();
        }

        let request = RunRequest::new(self.buffer.text(), self.config.runner.interpreter.clone());
        match self.runner.start(request).await {
            Ok(session) => {
                let id = session.id();
                info!("Run {} started", id);
                self.emit(Event::RunStarted {
                    session: id,
                    script_path: session.script_path().to_path_buf(),
                });
                self.session = Some(session);
                Ok(id)
            }
            Err(e) => {
                let err = WorkbenchError::from(e);
                let message = err.user_message();
                warn!("{}", message);
                self.output.push_str(&message);
                self.output.push('\n');
                self.emit(Event::RunFailed { message });
                Err(err)
            }
        }
    }

    /// Cancel the active run. Its terminal event still arrives through `tick`.
    pub fn cancel(&mut self) -> Result<()> {
        match &self.session {
            Some(session) => session.cancel(),
            None if self.runner.cancel() => {}
            None => return Err(WorkbenchError::NotRunning),
        }
        Ok(())
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
        self.emit(Event::OutputCleared);
    }

    /// Wait for the next piece of background work and apply it.
    ///
    /// Returns the event it produced, if any. Cancel safe: dropping the future
    /// before it completes loses nothing.
    pub async fn tick(&mut self) -> Option<Event> {
        let incoming = tokio::select! {
            Some(msg) = self.scheduler.recv() => Incoming::Highlight(msg),
            Some(event) = next_run_event(self.session.as_mut()) => Incoming::Run(event),
            else => return None,
        };

        match incoming {
            Incoming::Highlight(msg) => {
                let outcome = self.scheduler.handle(msg, &mut self.buffer)?;
                Some(self.emit_highlight(outcome))
            }
            Incoming::Run(event) => Some(self.apply_run_event(event)),
        }
    }

    /// Tick until nothing is pending
    pub async fn settle(&mut self) {
        while !self.is_idle() {
            self.tick().await;
        }
    }

    /// Stop any running script and announce shutdown
    pub async fn shutdown(&mut self) {
        if self.cancel().is_ok() {
            self.settle().await;
        }
        self.emit(Event::Shutdown);
    }

    fn apply_run_event(&mut self, event: RunEvent) -> Event {
        let session = self.active_session().unwrap_or_default();
        match event {
            RunEvent::Output(text) => {
                self.output.push_str(&text);
                let event = Event::RunOutput { session, text };
                self.emit(event.clone());
                event
            }
            RunEvent::Completed(status) => {
                self.output.push_str(&format!("\n{}\n\n\n", status.summary()));
                self.session = None;
                let event = Event::RunCompleted { session, status };
                self.emit(event.clone());
                event
            }
        }
    }

    fn emit_highlight(&self, outcome: HighlightOutcome) -> Event {
        let event = match outcome {
            HighlightOutcome::Applied { revision, keywords } => Event::HighlightsApplied { revision, keywords },
            HighlightOutcome::Discarded { revision } => Event::HighlightsDiscarded { revision },
        };
        self.emit(event.clone());
        event
    }

    fn emit(&self, event: Event) {
        self.events.emit(event);
    }
}

async fn next_run_event(session: Option<&mut RunSession>) -> Option<RunEvent> {
    match session {
        Some(session) => session.next_event().await,
        None => std::future::pending().await,
    }
}
