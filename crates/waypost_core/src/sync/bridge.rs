//! # Synchronization Bridge
//!
//! Turns "send a request, the reply shows up later on some network thread"
//! into a bounded synchronous call.
//!
//! One call goes through four steps:
//!
//! 1. reserve the correlation key (one outstanding call per key; a second
//!    caller waits for the key, out of the same budget)
//! 2. attach a reply handler to the hub and arm a one-shot slot
//! 3. run the trigger, which issues the request
//! 4. wait on the slot up to the timeout
//!
//! The handler is detached by an RAII guard on every exit path. The slot
//! carries a `wanted` flag under the same mutex as the value, so a reply
//! either lands while the caller is still waiting or is discarded.

use crate::error::{BridgeError, BridgeResult};
use crate::grid::{EventHub, EventKind, GridEvent};
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct SlotState<R> {
    wanted: bool,
    value: Option<R>,
}

/// One-shot result slot.
struct WaitSlot<R> {
    state: Mutex<SlotState<R>>,
    ready: Condvar,
}

impl<R> WaitSlot<R> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                wanted: true,
                value: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Stores the first value offered while the slot is still wanted.
    fn offer(&self, value: R) -> bool {
        let mut state = self.state.lock();
        if !state.wanted || state.value.is_some() {
            return false;
        }
        state.value = Some(value);
        self.ready.notify_all();
        true
    }

    /// Waits until a value is stored or `timeout` elapses. Either way the
    /// slot is no longer wanted afterwards.
    fn wait(&self, timeout: Duration) -> Option<R> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(value) = state.value.take() {
                state.wanted = false;
                return Some(value);
            }
            if self.ready.wait_until(&mut state, deadline).timed_out() {
                state.wanted = false;
                return state.value.take();
            }
        }
    }
}

/// Removes a correlation key from the outstanding set when dropped and
/// wakes callers queued on it.
struct Reservation<'a> {
    bridge: &'a Bridge,
    key: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.bridge.outstanding.lock().remove(&self.key);
        self.bridge.released.notify_all();
    }
}

/// Bridge from hub events to bounded waits.
pub struct Bridge {
    hub: Arc<EventHub>,
    outstanding: Mutex<HashSet<String>>,
    released: Condvar,
}

impl Bridge {
    /// Creates a bridge over `hub`.
    #[must_use]
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self {
            hub,
            outstanding: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// The hub replies arrive on.
    #[must_use]
    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// Number of calls currently waiting.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.lock().len()
    }

    /// Claims `key`, waiting until `deadline` for an earlier call on the
    /// same key to finish.
    fn reserve(&self, key: &str, deadline: Instant) -> Option<Reservation<'_>> {
        let mut outstanding = self.outstanding.lock();
        while outstanding.contains(key) {
            if self.released.wait_until(&mut outstanding, deadline).timed_out()
                && outstanding.contains(key)
            {
                return None;
            }
        }
        outstanding.insert(key.to_string());
        Some(Reservation {
            bridge: self,
            key: key.to_string(),
        })
    }

    /// Performs one bridged call.
    ///
    /// `matcher` runs on the delivering thread for every event of `kind`
    /// and returns `Some` for the reply this call is waiting for. `trigger`
    /// issues the request; returning `Some` completes the call on the spot.
    /// Time spent queued behind another call on `key` counts against
    /// `timeout`.
    ///
    /// The caller must not hold any named lock: reply side effects are
    /// applied by other subscribers that need them.
    pub fn call<R, M, T>(
        &self,
        key: &str,
        kind: EventKind,
        timeout: Duration,
        matcher: M,
        trigger: T,
    ) -> BridgeResult<R>
    where
        R: Send + 'static,
        M: Fn(&GridEvent) -> Option<R> + Send + Sync + 'static,
        T: FnOnce() -> Option<R>,
    {
        let deadline = Instant::now() + timeout;
        let timed_out = || BridgeError::Timeout {
            key: key.to_string(),
            timeout,
        };
        let Some(_reservation) = self.reserve(key, deadline) else {
            tracing::debug!(key, ?timeout, "bridged call never got its turn");
            return Err(timed_out());
        };

        let slot = Arc::new(WaitSlot::new());
        let sink = Arc::clone(&slot);
        let _subscription = self.hub.subscribe(kind, move |event| {
            if let Some(value) = matcher(event) {
                sink.offer(value);
            }
        });

        if let Some(value) = trigger() {
            tracing::trace!(key, "bridged call completed by trigger");
            return Ok(value);
        }

        match slot.wait(deadline.saturating_duration_since(Instant::now())) {
            Some(value) => Ok(value),
            None => {
                tracing::debug!(key, ?timeout, "bridged call timed out");
                Err(timed_out())
            }
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("outstanding", &self.outstanding())
            .finish_non_exhaustive()
    }
}
