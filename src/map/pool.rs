//! Pool of execution contexts with blocking acquire/release.
//!
//! Each context owns a private interpreter heap and emit buffer. A call
//! checks one context out of the pool, runs, and checks it back in when the
//! [`PooledContext`] guard drops, so two concurrent calls never touch the
//! same interpreter.
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │ ContextPool                               │
//! │   state: Mutex<{ idle: Vec<C>, stopped }> │
//! │   available: Condvar                      │
//! └───────────────────────────────────────────┘
//!        │ acquire()            ▲ drop(guard)
//!        ▼                      │
//!   PooledContext ── map_document(doc) ──┘
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::logging::{debug, info, trace};
use crate::value::Value;

use super::error::MapError;
use super::row::ViewRow;
use super::runtime::MapContext;

/// Snapshot of pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of contexts the pool was created with.
    pub pool_size: usize,
    /// Contexts currently waiting for work (0 once stopped).
    pub idle: usize,
    /// Total number of successful acquisitions.
    pub calls: usize,
}

struct PoolState<C> {
    idle: Vec<C>,
    stopped: bool,
}

/// A fixed set of execution contexts shared between callers.
pub struct ContextPool<C> {
    state: Mutex<PoolState<C>>,
    available: Condvar,
    size: usize,
    calls: AtomicUsize,
}

impl<C: MapContext> ContextPool<C> {
    /// Create a pool owning the given contexts.
    pub fn new(contexts: Vec<C>) -> Self {
        let size = contexts.len();
        info!(pool_size = size, "context pool started");
        Self {
            state: Mutex::new(PoolState {
                idle: contexts,
                stopped: false,
            }),
            available: Condvar::new(),
            size,
            calls: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        // A panic inside a map call cannot leave PoolState half-updated:
        // every mutation is a single push/pop/flag write.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check out an idle context, blocking while all of them are busy.
    ///
    /// Fails with [`MapError::EngineStopped`] if the pool is stopped before
    /// or while waiting.
    pub fn acquire(&self) -> Result<PooledContext<'_, C>, MapError> {
        let mut state = self.lock();
        loop {
            if state.stopped {
                return Err(MapError::EngineStopped);
            }
            if let Some(context) = state.idle.pop() {
                self.calls.fetch_add(1, Ordering::Relaxed);
                trace!(idle = state.idle.len(), "context acquired");
                return Ok(PooledContext {
                    pool: self,
                    context: Some(context),
                });
            }
            trace!("all contexts busy, waiting");
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release(&self, context: C) {
        let mut state = self.lock();
        if state.stopped {
            drop(state);
            debug!("dropping context released after stop");
            drop(context);
            return;
        }
        state.idle.push(context);
        drop(state);
        self.available.notify_one();
    }

    /// Stop the pool and release every idle interpreter.
    ///
    /// Returns `true` if this call performed the stop and `false` if the
    /// pool was already stopped. Callers blocked in [`acquire`](Self::acquire)
    /// wake up with [`MapError::EngineStopped`].
    ///
    /// Must not be called while map calls are in flight. Contexts checked
    /// out at that moment are dropped when their guard is released rather
    /// than returned to the pool.
    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    pub fn stop(&self) -> bool {
        let mut state = self.lock();
        if state.stopped {
            return false;
        }
        state.stopped = true;
        let idle = std::mem::take(&mut state.idle);
        drop(state);
        self.available.notify_all();

        let released = idle.len();
        drop(idle);
        info!(
            released,
            in_flight = self.size.saturating_sub(released),
            "context pool stopped"
        );
        true
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Current usage counters.
    pub fn stats(&self) -> PoolStats {
        let idle = self.lock().idle.len();
        PoolStats {
            pool_size: self.size,
            idle,
            calls: self.calls.load(Ordering::Relaxed),
        }
    }
}

/// A context checked out of a [`ContextPool`]; returned on drop.
pub struct PooledContext<'a, C: MapContext> {
    pool: &'a ContextPool<C>,
    context: Option<C>,
}

impl<C: MapContext> PooledContext<'_, C> {
    /// Run the checked-out context over one document.
    pub fn map_document(&mut self, document: &Value) -> Result<Vec<ViewRow>, MapError> {
        match self.context.as_mut() {
            Some(context) => context.map_document(document),
            None => Err(MapError::EngineStopped),
        }
    }
}

impl<C: MapContext> Drop for PooledContext<'_, C> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.pool.release(context);
        }
    }
}
