//! Typed signals with reverse-order propagation.
//!
//! Contract:
//! * Listeners run in reverse registration order (most recently
//!   connected first).
//! * A listener returning [`Flow::Stop`] halts propagation for that
//!   emission.
//! * While frozen, `emit` returns [`Flow::Pass`] without running any
//!   listener. Freezes nest.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Propagation outcome of a listener or an emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Pass,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Box<dyn Fn(&T) -> Flow + Send>;

pub struct Signal<T> {
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
    frozen: AtomicUsize,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            frozen: AtomicUsize::new(0),
        }
    }

    pub fn connect<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&T) -> Flow + Send + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().unwrap().push((id, Box::new(f)));
        id
    }

    pub fn disconnect(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn freeze(&self) {
        self.frozen.fetch_add(1, Ordering::SeqCst);
    }

    pub fn thaw(&self) {
        let _ = self
            .frozen
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
    }

    /// Invoke listeners in reverse registration order.
    pub fn emit(&self, payload: &T) -> Flow {
        if self.frozen.load(Ordering::SeqCst) > 0 {
            return Flow::Pass;
        }
        let listeners = self.listeners.lock().unwrap();
        for (_, listener) in listeners.iter().rev() {
            if listener(payload) == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Pass
    }
}
