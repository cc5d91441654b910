use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

/// Why a call to the Store or Cache didn't complete.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    #[error("the request was cancelled")]
    Cancelled,
    #[error("the request deadline has elapsed")]
    TimedOut,
}

/// Carries the deadline and the cancellation signal of a single request
/// down to every Store and Cache call made on its behalf.
///
/// Cloning the context shares the same cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// A context without a deadline, only the timeouts of the adapters apply.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn cancel(&self) {
        self.cancellation.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Runs the `future` until it completes, the context is cancelled
    /// or the earlier of the context deadline and `timeout` has elapsed.
    ///
    /// The `future` is dropped when interrupted.
    pub async fn run<F>(&self, timeout: Duration, future: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }

        let timeout_deadline = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(deadline) if deadline < timeout_deadline => deadline,
            _ => timeout_deadline,
        };

        tokio::select! {
            biased;

            _ = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
            output = timeout_at(deadline, future) => {
                output.map_err(|_elapsed| Interrupted::TimedOut)
            }
        }
    }
}
