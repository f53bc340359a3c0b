//! Highlight Scheduler
//!
//! Debounces edits so that a burst of keystrokes produces one highlight pass
//! once typing pauses.
//!
//! ```text
//! on_edit(rev) → debounce task (resettable timer)
//!              → HighlightMsg::Ready → handle() → blocking tokenize
//!              → HighlightMsg::Completed → handle() → TextBuffer::apply_highlights
//! ```
//!
//! Messages are handled by whoever owns the [`TextBuffer`], so the buffer is
//! only ever touched from that one task. The revision comparison in
//! `handle` is what keeps a superseded trigger or a late result from landing.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use script_bench_core::EditorConfig;

use crate::buffer::TextBuffer;
use crate::syntax::{HighlightResult, KeywordSet};

/// Messages flowing back from the scheduler's background work
#[derive(Debug)]
pub enum HighlightMsg {
    /// The quiet period after the edit with this revision elapsed
    Ready { revision: u64 },
    /// A tokenizer pass finished; `None` if the worker died
    Completed {
        revision: u64,
        result: Option<HighlightResult>,
    },
}

/// What handling a message did to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightOutcome {
    Applied { revision: u64, keywords: usize },
    Discarded { revision: u64 },
}

/// Debounced keyword highlighter for one buffer
pub struct HighlightScheduler {
    keywords: Arc<KeywordSet>,
    delay: Duration,
    /// Latest revision reported through `on_edit`
    latest: u64,
    /// An edit is waiting for its quiet period
    armed: bool,
    /// Revision of the pass currently running on the blocking pool
    in_flight: Option<u64>,
    /// A trigger fired while a pass was in flight
    rerun: bool,
    edits: mpsc::UnboundedSender<u64>,
    msg_tx: mpsc::UnboundedSender<HighlightMsg>,
    msg_rx: mpsc::UnboundedReceiver<HighlightMsg>,
    debounce: JoinHandle<()>,
}

impl HighlightScheduler {
    /// Create a scheduler. Must be called inside a tokio runtime.
    pub fn new(keywords: KeywordSet, delay: Duration) -> Self {
        let (edits, edit_rx) = mpsc::unbounded_channel();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let debounce = tokio::spawn(debounce_loop(edit_rx, msg_tx.clone(), delay));

        Self {
            keywords: Arc::new(keywords),
            delay,
            latest: 0,
            armed: false,
            in_flight: None,
            rerun: false,
            edits,
            msg_tx,
            msg_rx,
            debounce,
        }
    }

    /// Create a scheduler from editor settings
    pub fn from_config(keywords: KeywordSet, config: &EditorConfig) -> Self {
        Self::new(keywords, config.highlight_delay())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Record an edit and restart the quiet period
    pub fn on_edit(&mut self, revision: u64) {
        self.latest = revision;
        self.armed = true;
        if self.edits.send(revision).is_err() {
            warn!("Highlight debounce task is gone, edit {} will not be highlighted", revision);
        }
    }

    /// Next message to pass to [`handle`](Self::handle). Cancel safe.
    pub async fn recv(&mut self) -> Option<HighlightMsg> {
        self.msg_rx.recv().await
    }

    /// True when no edit is waiting and no pass is running
    pub fn is_idle(&self) -> bool {
        !self.armed && self.in_flight.is_none() && !self.rerun
    }

    /// Process one message against the buffer it was scheduled for
    pub fn handle(&mut self, msg: HighlightMsg, buffer: &mut TextBuffer) -> Option<HighlightOutcome> {
        match msg {
            HighlightMsg::Ready { revision } => {
                if revision != self.latest {
                    debug!("Highlight trigger for revision {} superseded by {}", revision, self.latest);
                    return None;
                }
                self.armed = false;

                if self.in_flight.is_some() {
                    debug!("Highlight pass in flight, deferring revision {}", revision);
                    self.rerun = true;
                    return None;
                }

                self.start_pass(buffer);
                None
            }

            HighlightMsg::Completed { revision, result } => {
                if self.in_flight != Some(revision) {
                    debug!("Ignoring completion for revision {} that is not in flight", revision);
                    return None;
                }
                self.in_flight = None;

                let outcome = match result {
                    Some(result) => {
                        let keywords = result.keyword_count();
                        if buffer.apply_highlights(result) {
                            debug!("Applied {} keyword spans for revision {}", keywords, revision);
                            HighlightOutcome::Applied { revision, keywords }
                        } else {
                            HighlightOutcome::Discarded { revision }
                        }
                    }
                    None => {
                        debug!("Highlight pass for revision {} produced no result", revision);
                        HighlightOutcome::Discarded { revision }
                    }
                };

                if std::mem::take(&mut self.rerun) && buffer.revision() != revision {
                    self.start_pass(buffer);
                }

                Some(outcome)
            }
        }
    }

    /// Highlight the buffer synchronously, bypassing the debounce
    pub fn highlight_now(&mut self, buffer: &mut TextBuffer) -> HighlightOutcome {
        let (text, revision) = buffer.current_text();
        let result = HighlightResult::compute(&text, revision, &self.keywords);
        let keywords = result.keyword_count();
        if buffer.apply_highlights(result) {
            HighlightOutcome::Applied { revision, keywords }
        } else {
            HighlightOutcome::Discarded { revision }
        }
    }

    fn start_pass(&mut self, buffer: &TextBuffer) {
        let (text, revision) = buffer.current_text();
        self.in_flight = Some(revision);

        let keywords = Arc::clone(&self.keywords);
        let tx = self.msg_tx.clone();
        debug!("Starting highlight pass for revision {} ({} bytes)", revision, text.len());

        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                HighlightResult::compute(&text, revision, &keywords)
            })
            .await
            .ok();
            let _ = tx.send(HighlightMsg::Completed { revision, result });
        });
    }
}

impl Drop for HighlightScheduler {
    fn drop(&mut self) {
        self.debounce.abort();
    }
}

/// Emits `Ready` once no edit has arrived for `delay`
async fn debounce_loop(
    mut edits: mpsc::UnboundedReceiver<u64>,
    out: mpsc::UnboundedSender<HighlightMsg>,
    delay: Duration,
) {
    let mut pending: Option<u64> = None;
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            edit = edits.recv() => match edit {
                Some(revision) => {
                    pending = Some(revision);
                    sleep.as_mut().reset(Instant::now() + delay);
                }
                None => break,
            },
            () = &mut sleep, if pending.is_some() => {
                if let Some(revision) = pending.take() {
                    if out.send(HighlightMsg::Ready { revision }).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Span;

    const DELAY: Duration = Duration::from_millis(100);

    fn scheduler() -> HighlightScheduler {
        HighlightScheduler::new(KeywordSet::new(["if", "else", "let"]), DELAY)
    }

    /// Pump messages until a pass lands, returning every outcome seen
    async fn settle(sched: &mut HighlightScheduler, buffer: &mut TextBuffer) -> Vec<HighlightOutcome> {
        let mut outcomes = Vec::new();
        while !sched.is_idle() {
            let msg = sched.recv().await.expect("scheduler channel open");
            if let Some(outcome) = sched.handle(msg, buffer) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_collapse_into_one_pass() {
        let mut sched = scheduler();
        let mut buffer = TextBuffer::new();

        let mut text = String::new();
        for ch in "let x".chars() {
            text.push(ch);
            let revision = buffer.mutate(&text);
            sched.on_edit(revision);
            tokio::time::advance(Duration::from_millis(30)).await;
        }

        let outcomes = settle(&mut sched, &mut buffer).await;
        assert_eq!(outcomes, vec![HighlightOutcome::Applied { revision: 5, keywords: 1 }]);
        assert!(buffer.highlights_current());
        assert_eq!(buffer.highlights().unwrap().spans, vec![Span::keyword(0, 3)]);

        // Nothing else is queued
        let extra = tokio::time::timeout(Duration::from_secs(1), sched.recv()).await;
        assert!(extra.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_waits_for_quiet_period() {
        let mut sched = scheduler();
        let mut buffer = TextBuffer::new();

        let revision = buffer.mutate("if");
        sched.on_edit(revision);

        let early = tokio::time::timeout(Duration::from_millis(90), sched.recv()).await;
        assert!(early.is_err());

        let msg = sched.recv().await.unwrap();
        assert!(matches!(msg, HighlightMsg::Ready { revision: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_pass_never_applies_stale_result() {
        let mut sched = scheduler();
        let mut buffer = TextBuffer::new();

        let first = buffer.mutate("if a");
        sched.on_edit(first);
        let ready = sched.recv().await.unwrap();
        assert!(sched.handle(ready, &mut buffer).is_none());

        // Pass for revision 1 is running; the user keeps typing
        let second = buffer.mutate("if a else b");
        sched.on_edit(second);

        let outcomes = settle(&mut sched, &mut buffer).await;
        assert!(!outcomes.contains(&HighlightOutcome::Applied { revision: first, keywords: 1 }));
        assert_eq!(
            outcomes.last(),
            Some(&HighlightOutcome::Applied { revision: second, keywords: 2 })
        );
        assert_eq!(buffer.highlights().unwrap().revision, second);
    }

    #[tokio::test]
    async fn test_superseded_trigger_is_noop() {
        let mut sched = scheduler();
        let mut buffer = TextBuffer::new();

        sched.on_edit(buffer.mutate("if"));
        sched.on_edit(buffer.mutate("iff"));

        assert!(sched.handle(HighlightMsg::Ready { revision: 1 }, &mut buffer).is_none());
        assert!(buffer.highlights().is_none());
        assert!(!sched.is_idle());
    }

    #[tokio::test]
    async fn test_unexpected_completion_is_ignored() {
        let mut sched = scheduler();
        let mut buffer = TextBuffer::from_str("if");
        let result = HighlightResult::new(0, vec![Span::keyword(0, 2)]);

        let outcome = sched.handle(HighlightMsg::Completed { revision: 0, result: Some(result) }, &mut buffer);
        assert!(outcome.is_none());
        assert!(buffer.highlights().is_none());
    }

    #[tokio::test]
    async fn test_highlight_now() {
        let mut sched = scheduler();
        let mut buffer = TextBuffer::from_str("let y = if z else w");

        let outcome = sched.highlight_now(&mut buffer);
        assert_eq!(outcome, HighlightOutcome::Applied { revision: 0, keywords: 3 });
        assert!(buffer.highlights_current());
    }
}
