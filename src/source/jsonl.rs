//! Newline-delimited JSON source.
//!
//! A background thread reads one `SourceState` per line from any reader and
//! forwards it over a bounded channel. Malformed lines are logged and skipped.

use crate::source::types::SourceState;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Capacity of the state channel.
const CHANNEL_CAPACITY: usize = 10_000;

/// Errors that can occur while running a source.
#[derive(Debug)]
pub enum SourceError {
    AlreadyRunning,
    SpawnFailed(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::AlreadyRunning => write!(f, "Source is already running"),
            SourceError::SpawnFailed(e) => write!(f, "Could not start reader thread: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Reads source states from a line-oriented reader.
///
/// A source is single-use: once its reader is exhausted the receiver
/// disconnects.
pub struct JsonLinesSource {
    sender: Option<Sender<SourceState>>,
    receiver: Receiver<SourceState>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl JsonLinesSource {
    /// Create a new, stopped source.
    pub fn new() -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Start reading states from `reader` on a background thread.
    pub fn start<R>(&mut self, reader: R) -> Result<(), SourceError>
    where
        R: BufRead + Send + 'static,
    {
        let sender = self.sender.take().ok_or(SourceError::AlreadyRunning)?;
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let handle = std::thread::Builder::new()
            .name("source-reader".to_string())
            .spawn(move || read_lines(reader, sender, running))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SourceError::SpawnFailed(e.to_string())
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop forwarding states.
    ///
    /// A reader blocked on input only notices after its next line.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the source is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for source states.
    pub fn receiver(&self) -> &Receiver<SourceState> {
        &self.receiver
    }

    /// Wait for the reader thread to finish.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Source reader thread panicked");
            }
        }
    }
}

impl Default for JsonLinesSource {
    fn default() -> Self {
        Self::new()
    }
}

fn read_lines<R: BufRead>(reader: R, sender: Sender<SourceState>, running: Arc<AtomicBool>) {
    for (number, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Source read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(state) => {
                if sender.send(state).is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!(line = number + 1, "Skipping malformed source state: {}", e),
        }
    }
    running.store(false, Ordering::SeqCst);
}

/// Parse one line of input.
pub fn parse_line(line: &str) -> Result<SourceState, serde_json::Error> {
    serde_json::from_str(line)
}
