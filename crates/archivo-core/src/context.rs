//! Cancellation and deadlines for store operations
//!
//! A [`Context`] is handed to every store call. Cloning it yields a handle to
//! the same cancellation state, so one thread (or a signal handler) can cancel
//! work running on another.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Why a context stopped being live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    Cancelled,
    DeadlineExceeded,
}

impl DoneReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "context canceled",
            Self::DeadlineExceeded => "context deadline exceeded",
        }
    }
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

/// Cancellation flag plus optional deadline
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that never expires unless cancelled
    pub fn background() -> Self {
        Self::build(None)
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Instant::now().checked_add(timeout))
    }

    /// A context that expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    fn build(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
            }),
        }
    }

    /// Cancel this context and every clone of it
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Why the context is done, or `None` while it is still live
    pub fn done_reason(&self) -> Option<DoneReason> {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return Some(DoneReason::Cancelled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(DoneReason::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done_reason().is_some()
    }

    /// `Err(Error::Cancelled)` once the context is done
    pub fn check(&self) -> Result<()> {
        match self.done_reason() {
            Some(reason) => Err(Error::Cancelled(reason.as_str().to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        let ctx = Context::background();
        assert!(!ctx.is_done());
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_propagates_to_clones() {
        let ctx = Context::background();
        let clone = ctx.clone();
        clone.cancel();

        assert_eq!(ctx.done_reason(), Some(DoneReason::Cancelled));
        match ctx.check() {
            Err(Error::Cancelled(msg)) => assert_eq!(msg, "context canceled"),
            other => panic!("expected cancellation, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = Context::with_deadline(Instant::now());
        assert_eq!(ctx.done_reason(), Some(DoneReason::DeadlineExceeded));
        assert!(matches!(ctx.check(), Err(Error::Cancelled(_))));
    }

    #[test]
    fn test_future_deadline() {
        let ctx = Context::with_timeout(Duration::from_secs(3600));
        assert!(!ctx.is_done());

        ctx.cancel();
        assert_eq!(ctx.done_reason(), Some(DoneReason::Cancelled));
    }

    #[test]
    fn test_timeout_elapses() {
        let ctx = Context::with_timeout(Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(ctx.done_reason(), Some(DoneReason::DeadlineExceeded));
    }
}
