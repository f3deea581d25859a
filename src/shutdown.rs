//! Cooperative shutdown shared by the daemon threads.

use log::debug;
use std::net::Shutdown as SocketShutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Granularity of [`Shutdown::sleep`].
const SLEEP_STEP: Duration = Duration::from_millis(50);

/// A cloneable shutdown flag.
///
/// Background loops poll [`is_requested`](Self::is_requested).  A thread
/// blocked reading the event socket cannot poll, so the socket is
/// registered here and shut down from the outside when shutdown is
/// triggered.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    stream: Mutex<Option<UnixStream>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Request shutdown and close the registered socket, if any.
    pub fn trigger(&self) {
        if self.inner.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("shutdown requested");
        // Taken after the flag is set; `register_stream` checks the flag
        // under the same lock, so no socket slips through.
        if let Some(stream) = self.lock_stream().take() {
            let _ = stream.shutdown(SocketShutdown::Both);
        }
    }

    /// Register the live event socket so [`trigger`](Self::trigger) can
    /// unblock its reader.  Replaces any previously registered socket.
    pub fn register_stream(&self, stream: &UnixStream) {
        let Ok(clone) = stream.try_clone() else {
            return;
        };
        let mut slot = self.lock_stream();
        if self.is_requested() {
            let _ = clone.shutdown(SocketShutdown::Both);
            return;
        }
        *slot = Some(clone);
    }

    /// Sleep for `duration`, waking early on shutdown.
    ///
    /// Returns `false` if shutdown was requested.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_STEP.min(deadline - now));
        }
    }

    fn lock_stream(&self) -> std::sync::MutexGuard<'_, Option<UnixStream>> {
        self.inner
            .stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
