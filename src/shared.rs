// =============================================================================
// Shared — single-writer / many-reader handle
// =============================================================================
//
// Every stateful type in the crate mutates only through `&mut self` (`add`,
// `reset`, setters) and answers queries through `&self`. Wrapping one in a
// `parking_lot::RwLock` turns that into the runtime discipline:
//   - `write()` for ingest and mutation, exclusive,
//   - `read()` for queries, shared between any number of readers.
// A reader therefore never observes a bar that is only partly applied.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cloneable handle to a lock-guarded value.
#[derive(Debug, Default)]
pub struct Shared<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Shared access for queries.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    /// Exclusive access for `add` and other mutators.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
