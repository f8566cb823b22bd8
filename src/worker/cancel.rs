//! Cooperative cancellation shared between a coordinator and its workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A broadcast stop flag.
///
/// Cloning shares the flag. A child token is cancelled when either it or
/// any of its ancestors is cancelled; cancelling a child leaves the parent
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Box<CancelToken>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token scoped beneath this one.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// Signals every holder of this token (and its children) to stop.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }
}
