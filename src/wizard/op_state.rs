// ABOUTME: Lifecycle of a single gateway-backed operation (save, verify, fetch, test)
// Doubles as the single-flight guard: a Pending operation refuses to start again

use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OpState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
}

impl OpState {
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub const fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Message of the last failure, if the operation failed
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Move to `Pending` unless already there. Returns false when the caller
    /// must coalesce into a no-op.
    pub fn try_begin(&mut self) -> bool {
        if self.is_pending() {
            return false;
        }
        *self = Self::Pending;
        true
    }

    /// Record the outcome of the operation
    pub fn settle<T, E: ToString>(&mut self, result: &Result<T, E>) {
        *self = match result {
            Ok(_) => Self::Succeeded,
            Err(e) => Self::Failed(e.to_string()),
        };
    }
}

/// Lock a manager's state. Critical sections never span an await and never
/// leave state half-written, so a poisoned lock is still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
