//! Request-scoped cancellation and deadline.
//!
//! Workflows consult the context before each step. A cancelled or expired
//! context stops the workflow before its next store call; a step already
//! running is never interrupted.

use crate::error::ErrorKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a workflow stopped between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    Cancelled,
    DeadlineExceeded,
}

impl Interrupted {
    /// Deadline expiry counts as a store timeout.
    pub fn kind(self) -> ErrorKind {
        match self {
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::Persistence,
        }
    }
}

impl Display for Interrupted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "request cancelled"),
            Self::DeadlineExceeded => write!(f, "request deadline exceeded"),
        }
    }
}

impl Error for Interrupted {}

/// Per-request signal shared between the caller and the service.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

/// Handle used by another thread to cancel a [`RequestContext`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl RequestContext {
    /// Context that never cancels and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Applies an optional timeout, keeping the background context when `None`.
    pub fn with_optional_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::background, Self::with_timeout)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `Err` when the next step must not start.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Interrupted, RequestContext};
    use crate::error::ErrorKind;
    use std::time::Duration;

    #[test]
    fn background_context_never_interrupts() {
        assert_eq!(RequestContext::background().check(), Ok(()));
    }

    #[test]
    fn cancel_handle_cancels_all_clones() {
        let ctx = RequestContext::background();
        let clone = ctx.clone();
        ctx.cancel_handle().cancel();

        assert_eq!(clone.check(), Err(Interrupted::Cancelled));
        assert_eq!(Interrupted::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn expired_deadline_reports_persistence_timeout() {
        let ctx = RequestContext::with_timeout(Duration::ZERO);
        assert_eq!(ctx.check(), Err(Interrupted::DeadlineExceeded));
        assert_eq!(Interrupted::DeadlineExceeded.kind(), ErrorKind::Persistence);
    }
}
