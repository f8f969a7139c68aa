//! Request versioning and cancellation for table fetches.
//!
//! Every fetch takes a [`RequestTicket`] from the table's [`RequestTracker`].
//! Starting a new request bumps the active version and cancels the previous
//! ticket's token, so a superseded fetch is dropped mid-flight. A response is
//! only applied while its version is still the active one.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct RequestTracker {
    active_version: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding whatever is in flight.
    pub fn begin(&self) -> RequestTicket {
        let token = CancellationToken::new();
        let version = {
            let mut in_flight = self.in_flight.lock();
            if let Some(previous) = in_flight.replace(token.clone()) {
                previous.cancel();
            }
            self.active_version.fetch_add(1, Ordering::SeqCst) + 1
        };
        RequestTicket { version, token }
    }

    pub fn is_current(&self, version: u64) -> bool {
        self.active_version.load(Ordering::SeqCst) == version
    }

    /// Clears the in-flight token if `ticket` still owns it.
    pub fn finish(&self, ticket: &RequestTicket) {
        let mut in_flight = self.in_flight.lock();
        if self.is_current(ticket.version) {
            in_flight.take();
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestTicket {
    version: u64,
    token: CancellationToken,
}

impl RequestTicket {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drives `fut` unless the ticket is cancelled first; `None` when cancelled.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            output = fut => Some(output),
        }
    }
}
