//! Live reading source backed by a reader thread and a bounded channel.
//!
//! A blocking device read happens on the reader thread, so the consumer can
//! wait with a timeout and still notice an interrupt between readings.

use crate::source::line::LineSource;
use crate::source::types::{Reading, ReadingSource};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default number of readings buffered between the reader thread and the consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_000;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors that can occur while starting a live source.
#[derive(Debug)]
pub enum SourceError {
    AlreadyRunning,
    Spawn(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::AlreadyRunning => write!(f, "Reading source is already running"),
            SourceError::Spawn(e) => write!(f, "Could not start reader thread: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// A reading source fed by a background reader thread.
pub struct ChannelSource {
    sender: Sender<Reading>,
    receiver: Receiver<Reading>,
    running: Arc<AtomicBool>,
    /// Set once a reader thread was started
    started: bool,
    finished: bool,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            started: false,
            finished: false,
        }
    }

    /// Start reading lines from `reader` on a background thread.
    pub fn start<R>(&mut self, reader: R) -> Result<(), SourceError>
    where
        R: BufRead + Send + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        self.started = true;
        self.finished = false;

        let sender = self.sender.clone();
        let running = Arc::clone(&self.running);
        let spawned = thread::Builder::new()
            .name("reading-source".to_string())
            .spawn(move || {
                let mut source = LineSource::new(reader);
                while running.load(Ordering::SeqCst) {
                    let reading = source.next_value();
                    if reading == Reading::EndOfStream || sender.send(reading).is_err() {
                        break;
                    }
                }
                // Always terminate the stream, also after stop()
                let _ = sender.send(Reading::EndOfStream);
                running.store(false, Ordering::SeqCst);
            });

        if let Err(e) = spawned {
            self.running.store(false, Ordering::SeqCst);
            return Err(SourceError::Spawn(e.to_string()));
        }
        Ok(())
    }

    /// Ask the reader thread to stop after its current read.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the reader thread is still producing.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sender for feeding readings from another producer.
    pub fn sender(&self) -> Sender<Reading> {
        self.sender.clone()
    }

    /// Wait up to `timeout` for the next reading.
    ///
    /// Returns `None` when nothing arrived in time. Once a started reader
    /// thread has stopped and its readings are drained, returns
    /// `EndOfStream`.
    pub fn next_value_timeout(&mut self, timeout: Duration) -> Option<Reading> {
        if self.finished {
            return Some(Reading::EndOfStream);
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(reading) => Some(self.track(reading)),
            Err(RecvTimeoutError::Timeout) if self.is_drained() => {
                Some(self.track(Reading::EndOfStream))
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.track(Reading::EndOfStream)),
        }
    }

    /// The reader thread stopped and left nothing to deliver.
    fn is_drained(&self) -> bool {
        self.started && !self.is_running() && self.receiver.is_empty()
    }

    fn track(&mut self, reading: Reading) -> Reading {
        if reading == Reading::EndOfStream {
            self.finished = true;
        }
        reading
    }
}

impl ReadingSource for ChannelSource {
    fn next_value(&mut self) -> Reading {
        loop {
            if let Some(reading) = self.next_value_timeout(POLL_INTERVAL) {
                return reading;
            }
        }
    }

    fn is_ready(&self) -> bool {
        !self.finished && !self.is_drained()
    }
}

impl Default for ChannelSource {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
