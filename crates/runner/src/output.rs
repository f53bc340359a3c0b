//! Output pumping
//!
//! Reader tasks turn raw pipe bytes into text chunks and push them onto the
//! session channel in the order they were read.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::session::RunEvent;

const READ_BUF_SIZE: usize = 8192;

/// Incremental UTF-8 decoder.
///
/// A multi-byte character split across two reads is held back until it is
/// complete; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning all text that is complete so far
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // Incomplete sequence at the end, wait for more bytes
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is left at end of stream
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

/// How long a reader may keep waiting on its pipe once the process exited.
///
/// Only time spent blocked in `read` after exit counts against the budget;
/// time spent handing chunks to a slow receiver does not. This ends the
/// stream when a background grandchild keeps the pipe open without losing
/// output that was already produced.
pub(crate) struct DrainWindow {
    exited: watch::Receiver<Option<Instant>>,
    budget: Duration,
}

impl DrainWindow {
    pub(crate) fn new(exited: watch::Receiver<Option<Instant>>, budget: Duration) -> Self {
        Self { exited, budget }
    }

    /// Resolves once this read has used up what is left of the budget
    async fn expired(&mut self, waiting_since: Instant) {
        // An error means the supervisor went away without reporting an exit
        let exited_at = self.exited.wait_for(Option::is_some).await.ok().and_then(|at| *at);
        match exited_at {
            Some(at) => tokio::time::sleep_until(at.max(waiting_since) + self.budget).await,
            None => std::future::pending().await,
        }
    }

    /// Charge the time a finished read spent waiting after exit
    fn charge(&mut self, waiting_since: Instant) {
        let exited_at = *self.exited.borrow();
        if let Some(at) = exited_at {
            let waited = Instant::now().saturating_duration_since(at.max(waiting_since));
            self.budget = self.budget.saturating_sub(waited);
        }
    }
}

/// Read `stream` to EOF, forwarding text chunks to `tx`.
///
/// A read error ends the stream like EOF does, and so does running out of
/// the drain window after the process exited.
pub(crate) async fn pump<R>(
    mut stream: R,
    name: &'static str,
    tx: mpsc::Sender<RunEvent>,
    mut window: DrainWindow,
) where
    R: AsyncRead + Unpin,
{
    let mut decoder = Utf8Decoder::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let waiting_since = Instant::now();
        let read = tokio::select! {
            biased;
            read = stream.read(&mut buf) => Some(read),
            () = window.expired(waiting_since) => None,
        };

        let n = match read {
            Some(Ok(0)) => break,
            Some(Ok(n)) => n,
            Some(Err(e)) => {
                debug!("Read from {} failed, treating as end of output: {}", name, e);
                break;
            }
            None => {
                warn!("{} still open after the process exited, closing it", name);
                break;
            }
        };
        window.charge(waiting_since);

        let text = decoder.push(&buf[..n]);
        if !text.is_empty() && tx.send(RunEvent::Output(text)).await.is_err() {
            debug!("Session receiver dropped, stopping {} reader", name);
            return;
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = tx.send(RunEvent::Output(rest)).await;
    }
    debug!("{} reached end of output", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_split_character_is_held_back() {
        let mut decoder = Utf8Decoder::new();
        let bytes = "zażółć".as_bytes();
        // Cut inside the two-byte 'ż'
        let (head, tail) = bytes.split_at(3);

        assert_eq!(decoder.push(head), "za");
        assert_eq!(decoder.push(tail), "żółć");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.push(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_truncated_tail_is_flushed_lossy() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.push(&[b'x', 0xE2, 0x82]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    fn window(budget: Duration) -> (watch::Sender<Option<Instant>>, DrainWindow) {
        let (exited_tx, exited_rx) = watch::channel(None);
        (exited_tx, DrainWindow::new(exited_rx, budget))
    }

    async fn collect_text(rx: &mut mpsc::Receiver<RunEvent>) -> String {
        let mut text = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::Output(chunk) => text.push_str(&chunk),
                other => panic!("unexpected event {:?}", other),
            }
        }
        text
    }

    #[tokio::test]
    async fn test_pump_forwards_chunks_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let (_exited, window) = window(Duration::from_millis(100));
        let data: &[u8] = b"first\nsecond\n";
        pump(data, "stdout", tx, window).await;

        assert_eq!(collect_text(&mut rx).await, "first\nsecond\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipe_held_open_after_exit_is_closed() {
        let (tx, mut rx) = mpsc::channel(8);
        let (exited, window) = window(Duration::from_millis(500));
        let (mut writer, reader) = tokio::io::duplex(64);

        writer.write_all(b"parent\n").await.unwrap();
        let reader_task = tokio::spawn(pump(reader, "stdout", tx, window));
        exited.send(Some(Instant::now())).unwrap();

        // `writer` stays open, like a background child inheriting the pipe
        reader_task.await.unwrap();
        assert_eq!(collect_text(&mut rx).await, "parent\n");
        drop(writer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_receiver_does_not_use_up_drain_window() {
        let budget = Duration::from_millis(500);
        let (tx, mut rx) = mpsc::channel(1);
        let (exited, window) = window(budget);
        let (mut writer, reader) = tokio::io::duplex(64);

        // Channel already full, so the first forwarded chunk has to wait
        tx.send(RunEvent::Output("queued ".into())).await.unwrap();
        writer.write_all(b"one ").await.unwrap();
        let reader_task = tokio::spawn(pump(reader, "stdout", tx, window));
        exited.send(Some(Instant::now())).unwrap();

        // Receiver stalls for far longer than the window
        tokio::time::sleep(budget * 10).await;
        assert_eq!(rx.recv().await, Some(RunEvent::Output("queued ".into())));
        assert_eq!(rx.recv().await, Some(RunEvent::Output("one ".into())));

        // Late output inside the window is still delivered
        tokio::time::sleep(budget / 2).await;
        writer.write_all(b"two").await.unwrap();
        drop(writer);

        assert_eq!(collect_text(&mut rx).await, "two");
        reader_task.await.unwrap();
    }
}
