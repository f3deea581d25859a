//! The reconnecting event stream.
//!
//! [`EventStream`] wraps one connection and yields raw records until the
//! peer goes away.  [`Reconnecting`] drives an [`EventSource`] forever:
//! connect, forward every record to the daemon loop, and on any failure
//! wait a fixed backoff and start over on a brand-new stream.

use crate::daemon::DaemonMessage;
use crate::shutdown::Shutdown;
use crate::traits::{EventSource, SourceError};
use log::{debug, info, warn};
use std::borrow::Cow;
use std::io::BufRead;
use std::sync::mpsc;
use std::time::Duration;

/// One live connection's worth of event records.
pub struct EventStream<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> EventStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Block until the next non-empty record arrives.
    ///
    /// The returned line has its newline stripped.  Invalid UTF-8 is
    /// replaced rather than treated as a failure.  End of stream and read
    /// errors surface as [`SourceError::StreamClosed`].
    pub fn next_event(&mut self) -> Result<String, SourceError> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return Err(SourceError::StreamClosed("end of stream".into())),
                Ok(_) => {
                    let text = String::from_utf8_lossy(&self.buf);
                    if let Cow::Owned(_) = text {
                        debug!("record is not valid UTF-8, replacing invalid bytes");
                    }
                    let line = text.trim_end_matches(['\r', '\n']);
                    if !line.is_empty() {
                        return Ok(line.to_string());
                    }
                }
                Err(e) => return Err(SourceError::StreamClosed(e.to_string())),
            }
        }
    }
}

/// Keeps an [`EventSource`] connected for as long as the daemon runs.
pub struct Reconnecting<S> {
    source: S,
    backoff: Duration,
    shutdown: Shutdown,
}

impl<S: EventSource> Reconnecting<S> {
    pub fn new(source: S, backoff: Duration, shutdown: Shutdown) -> Self {
        Self {
            source,
            backoff,
            shutdown,
        }
    }

    /// Forward events into `sink` until shutdown or until the receiving
    /// side hangs up.
    ///
    /// This method **blocks**.  Run it on a dedicated thread.
    pub fn run(&mut self, sink: mpsc::Sender<DaemonMessage>) {
        let mut failures: u32 = 0;

        while !self.shutdown.is_requested() {
            match self.source.connect() {
                Ok(reader) => {
                    failures = 0;
                    if sink.send(DaemonMessage::Connected).is_err() {
                        return;
                    }
                    let closed = self.pump(EventStream::new(reader), &sink);
                    if self.shutdown.is_requested() {
                        break;
                    }
                    match closed {
                        Some(e) => warn!("{}, reconnecting in {:?}", e, self.backoff),
                        None => return,
                    }
                    if sink.send(DaemonMessage::Disconnected).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    if failures == 1 {
                        warn!("{}, retrying every {:?}", e, self.backoff);
                    } else {
                        debug!("{} (attempt {})", e, failures);
                    }
                }
            }

            if !self.shutdown.sleep(self.backoff) {
                break;
            }
        }
        info!("event source stopped");
    }

    /// Forward records until the stream fails.  Returns `None` if the
    /// sink was dropped.
    fn pump<R: BufRead>(
        &self,
        mut stream: EventStream<R>,
        sink: &mpsc::Sender<DaemonMessage>,
    ) -> Option<SourceError> {
        loop {
            match stream.next_event() {
                Ok(line) => {
                    if sink.send(DaemonMessage::Event(line)).is_err() {
                        return None;
                    }
                }
                Err(e) => return Some(e),
            }
        }
    }
}
