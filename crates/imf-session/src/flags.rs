use std::sync::atomic::{AtomicBool, Ordering};

use imf_core::ImfError;
use tracing::warn;

/// The two independent session flags.
///
/// `Detached` is both false, `Bound` is bound only, `Editable` is both true.
/// Readers never take a lock; writers are the controller's operations and
/// the worker thread.
#[derive(Debug, Default)]
pub struct SessionFlags {
    bound: AtomicBool,
    editable: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    pub fn is_editable(&self) -> bool {
        self.editable.load(Ordering::SeqCst)
    }

    pub fn set_bound(&self, value: bool) {
        self.bound.store(value, Ordering::SeqCst);
    }

    pub fn set_editable(&self, value: bool) {
        self.editable.store(value, Ordering::SeqCst);
    }

    /// Attach succeeded: bound and editable.
    pub fn set_attached(&self) {
        self.set_bound(true);
        self.set_editable(true);
    }

    /// Back to detached.
    pub fn clear(&self) {
        self.set_bound(false);
        self.set_editable(false);
    }

    pub fn check_bound(&self) -> Result<(), ImfError> {
        if !self.is_bound() {
            warn!("not bound yet");
            return Err(ImfError::NotBound);
        }
        Ok(())
    }

    pub fn check_editable(&self) -> Result<(), ImfError> {
        if !self.is_editable() {
            warn!("not in editable state");
            return Err(ImfError::NotEditable);
        }
        Ok(())
    }

    /// `NotBound` takes precedence over `NotEditable`.
    pub fn check_bound_editable(&self) -> Result<(), ImfError> {
        self.check_bound()?;
        self.check_editable()
    }
}
