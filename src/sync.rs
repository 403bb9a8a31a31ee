//! Locking helpers shared by the engine, coordinator and presenters.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if another thread panicked while
/// holding it. The guarded state stays consistent between statements, so a
/// panic elsewhere is not a reason to stop.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
