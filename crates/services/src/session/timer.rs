use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Fired once the feedback dwell of one answer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackElapsed {
    generation: u64,
}

/// Single-slot cancellable timer for the quiz feedback dwell.
///
/// Scheduling replaces whatever was pending. Each schedule gets a new
/// generation, and tickets from older generations are dropped on receipt, so
/// a ticket that was already queued when its task was cancelled can never
/// be delivered.
#[derive(Debug)]
pub struct FeedbackTimer {
    dwell: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<FeedbackElapsed>,
    rx: mpsc::UnboundedReceiver<FeedbackElapsed>,
}

impl FeedbackTimer {
    #[must_use]
    pub fn new(dwell: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            dwell,
            generation: 0,
            pending: None,
            tx,
            rx,
        }
    }

    #[must_use]
    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start the dwell, cancelling any dwell already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self) {
        self.cancel();
        let ticket = FeedbackElapsed {
            generation: self.generation,
        };
        let tx = self.tx.clone();
        let dwell = self.dwell;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(dwell).await;
            let _ = tx.send(ticket);
        }));
    }

    /// Abort the pending dwell, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Wait for the pending dwell to end.
    ///
    /// Waits forever when nothing is pending, which makes it safe to use as
    /// one arm of a `select!`.
    pub async fn elapsed(&mut self) -> FeedbackElapsed {
        loop {
            if let Some(ticket) = self.rx.recv().await {
                if self.accept(ticket) {
                    return ticket;
                }
            } else {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Non-blocking variant of [`FeedbackTimer::elapsed`].
    pub fn try_elapsed(&mut self) -> Option<FeedbackElapsed> {
        while let Ok(ticket) = self.rx.try_recv() {
            if self.accept(ticket) {
                return Some(ticket);
            }
        }
        None
    }

    fn accept(&mut self, ticket: FeedbackElapsed) -> bool {
        if ticket.generation != self.generation || self.pending.is_none() {
            return false;
        }
        self.pending = None;
        true
    }
}

impl Drop for FeedbackTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
