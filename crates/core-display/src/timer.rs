//! Per-display timer wheel.
//!
//! The display owns its timers: callbacks fire on a dedicated worker
//! with a display handle, and everything outstanding dies with the
//! display. No global timer state.

use crate::display::DisplayHandle;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

pub(crate) type TimerFn = Box<dyn FnOnce(&DisplayHandle) + Send>;

#[derive(Default)]
struct Wheel {
    due: BinaryHeap<Reverse<(Instant, u64)>>,
    callbacks: HashMap<u64, TimerFn>,
    next_id: u64,
    stopped: bool,
}

#[derive(Clone)]
pub(crate) struct Timers {
    inner: Arc<(Mutex<Wheel>, Condvar)>,
}

impl Timers {
    pub fn new() -> Self {
        Timers {
            inner: Arc::new((Mutex::new(Wheel::default()), Condvar::new())),
        }
    }

    pub fn spawn_worker(&self, handle: DisplayHandle) -> JoinHandle<()> {
        let inner = self.inner.clone();
        std::thread::Builder::new()
            .name("hexes-timers".into())
            .spawn(move || run_wheel(&inner, &handle))
            .expect("spawning the timer worker cannot fail")
    }

    pub fn add(&self, delay: Duration, f: TimerFn) -> TimerId {
        let (lock, cvar) = &*self.inner;
        let mut wheel = lock.lock().unwrap();
        wheel.next_id += 1;
        let id = wheel.next_id;
        wheel.due.push(Reverse((Instant::now() + delay, id)));
        wheel.callbacks.insert(id, f);
        cvar.notify_all();
        TimerId(id)
    }

    /// Cancel one timer; false if it already fired or was cancelled.
    pub fn cancel(&self, id: TimerId) -> bool {
        let (lock, cvar) = &*self.inner;
        let removed = lock.lock().unwrap().callbacks.remove(&id.0).is_some();
        cvar.notify_all();
        removed
    }

    pub fn cancel_all(&self) {
        let (lock, cvar) = &*self.inner;
        let mut wheel = lock.lock().unwrap();
        wheel.callbacks.clear();
        wheel.due.clear();
        cvar.notify_all();
    }

    pub fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        let mut wheel = lock.lock().unwrap();
        wheel.stopped = true;
        wheel.callbacks.clear();
        wheel.due.clear();
        cvar.notify_all();
    }
}

fn run_wheel(inner: &(Mutex<Wheel>, Condvar), handle: &DisplayHandle) {
    let (lock, cvar) = inner;
    let mut wheel = lock.lock().unwrap();
    loop {
        if wheel.stopped {
            return;
        }
        let now = Instant::now();
        // Fire everything due, skipping cancelled entries.
        while let Some(Reverse((at, id))) = wheel.due.peek().copied() {
            if at > now {
                break;
            }
            wheel.due.pop();
            if let Some(f) = wheel.callbacks.remove(&id) {
                trace!(target: "display.timer", id, "firing timer");
                drop(wheel);
                f(handle);
                wheel = lock.lock().unwrap();
                if wheel.stopped {
                    return;
                }
            }
        }
        wheel = match wheel.due.peek().copied() {
            Some(Reverse((at, _))) => {
                let wait = at.saturating_duration_since(Instant::now());
                cvar.wait_timeout(wheel, wait).unwrap().0
            }
            None => cvar.wait(wheel).unwrap(),
        };
    }
}
