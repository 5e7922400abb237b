//! Execution context: cancellation signal plus optional deadline
//!
//! Every concurrent entry point takes an `ExecContext`. Contexts derived with
//! `with_timeout` share their parent's cancellation signal and keep the earlier
//! of the two deadlines.

use crate::error::{Result, TreeError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct CancelSignal {
    canceled: AtomicBool,
    notify: Notify,
}

/// Cancellable, deadline-bearing execution context
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    signal: Arc<CancelSignal>,
    deadline: Option<Instant>,
}

impl ExecContext {
    /// A context that is never done unless canceled
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline`
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            signal: Arc::clone(&self.signal),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and every context sharing its signal
    pub fn cancel(&self) {
        self.signal.canceled.store(true, Ordering::SeqCst);
        self.signal.notify.notify_waiters();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The reason this context is done, if it is
    pub fn err(&self) -> Option<TreeError> {
        if self.signal.canceled.load(Ordering::SeqCst) {
            return Some(TreeError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(TreeError::TimedOut),
            _ => None,
        }
    }

    /// `Err` with the context error once done
    pub fn check(&self) -> Result<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolve once the context is canceled or its deadline passes
    pub async fn done(&self) -> TreeError {
        loop {
            let notified = self.signal.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(err) = self.err() {
                return err;
            }

            match self.deadline {
                Some(deadline) => {
                    let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline));
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = sleep => {}
                    }
                }
                None => notified.await,
            }
        }
    }
}
