//! Display: ownership of one screen plus the worker ensemble.
//!
//! Channel policy: bounded channels throughout. The inbound event
//! channel (capacity 32) gives the reader natural backpressure; the
//! request channel (capacity 64) absorbs bursts of render requests,
//! which per-type pending flags collapse to at most one outstanding
//! entry each. Shutdown closes the shared `done` channel exactly once;
//! every worker selects on it.

use crate::signal::Signal;
use crate::timer::{TimerId, Timers};
use core_events::{Error, Event, EventKind, MouseState, Result};
use core_terminal::Screen;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::collections::VecDeque;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Closure executed with exclusive access to the screen.
pub type ScreenFn = Box<dyn FnOnce(&mut dyn Screen) + Send>;
/// Closure executed on the main task's thread.
pub type MainFn = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Draw,
    Show,
    Sync,
    Func,
    Quit,
}

#[derive(Default)]
struct Pending {
    draw: AtomicBool,
    show: AtomicBool,
    sync: AtomicBool,
    quit: AtomicBool,
}

impl Pending {
    fn flag(&self, r: Request) -> Option<&AtomicBool> {
        match r {
            Request::Draw => Some(&self.draw),
            Request::Show => Some(&self.show),
            Request::Sync => Some(&self.sync),
            Request::Quit => Some(&self.quit),
            Request::Func => None,
        }
    }
}

/// Immutable loop configuration, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct DisplayConfig {
    /// Collapse adjacent same-kind events (Key and Paste excepted) to
    /// the last one.
    pub compress_events: bool,
    /// Exempt drag-state mouse events from compression so drag
    /// trajectories arrive intact.
    pub preserve_drag_trail: bool,
    pub inbound_capacity: usize,
    pub request_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            compress_events: true,
            preserve_drag_trail: false,
            inbound_capacity: 32,
            request_capacity: 64,
        }
    }
}

struct Channels {
    req_tx: Sender<Request>,
    req_rx: Receiver<Request>,
    func_tx: Sender<ScreenFn>,
    func_rx: Receiver<ScreenFn>,
    main_tx: Sender<MainFn>,
    main_rx: Receiver<MainFn>,
    inbound_tx: Sender<Event>,
    inbound_rx: Receiver<Event>,
    nudge_tx: Sender<()>,
    nudge_rx: Receiver<()>,
    done_tx: Arc<Mutex<Option<Sender<()>>>>,
    done_rx: Receiver<()>,
}

pub struct Display {
    screen: Arc<Mutex<Box<dyn Screen>>>,
    cfg: DisplayConfig,
    running: Arc<RwLock<bool>>,
    pending: Arc<Pending>,
    ch: Channels,
    buffer: Arc<Mutex<VecDeque<Event>>>,
    timers: Timers,
    shutdown: Arc<Signal<()>>,
    workers: Vec<JoinHandle<()>>,
    started: bool,
}

impl Display {
    pub fn new(screen: Box<dyn Screen>, cfg: DisplayConfig) -> Display {
        let (req_tx, req_rx) = bounded(cfg.request_capacity);
        let (func_tx, func_rx) = bounded(cfg.request_capacity);
        let (main_tx, main_rx) = bounded(cfg.request_capacity);
        let (inbound_tx, inbound_rx) = bounded(cfg.inbound_capacity);
        let (nudge_tx, nudge_rx) = bounded(1);
        let (done_tx, done_rx) = bounded::<()>(0);
        Display {
            screen: Arc::new(Mutex::new(screen)),
            cfg,
            running: Arc::new(RwLock::new(false)),
            pending: Arc::new(Pending::default()),
            ch: Channels {
                req_tx,
                req_rx,
                func_tx,
                func_rx,
                main_tx,
                main_rx,
                inbound_tx,
                inbound_rx,
                nudge_tx,
                nudge_rx,
                done_tx: Arc::new(Mutex::new(Some(done_tx))),
                done_rx,
            },
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            timers: Timers::new(),
            shutdown: Arc::new(Signal::new()),
            workers: Vec::new(),
            started: false,
        }
    }

    /// A clonable handle for requests, call primitives and timers.
    pub fn handle(&self) -> DisplayHandle {
        DisplayHandle {
            running: self.running.clone(),
            pending: self.pending.clone(),
            req_tx: self.ch.req_tx.clone(),
            func_tx: self.ch.func_tx.clone(),
            main_tx: self.ch.main_tx.clone(),
            screen: self.screen.clone(),
            timers: self.timers.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Initialize the screen and start the worker ensemble.
    pub fn startup(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.screen.lock().unwrap().init()?;
        *self.running.write().unwrap() = true;
        self.spawn_input_forwarder();
        self.spawn_event_coalescer();
        self.spawn_request_worker();
        self.workers.push(self.timers.spawn_worker(self.handle()));
        self.started = true;
        info!(target: "display.loop", "startup complete");
        Ok(())
    }

    fn spawn_input_forwarder(&mut self) {
        let events = self.screen.lock().unwrap().event_channel();
        let inbound = self.ch.inbound_tx.clone();
        let done = self.ch.done_rx.clone();
        self.workers.push(spawn_worker("hexes-inbound", move || {
            loop {
                let ev = select! {
                    recv(events) -> ev => match ev {
                        Ok(ev) => ev,
                        Err(_) => break,
                    },
                    recv(done) -> _ => break,
                };
                // The forward also watches `done` so a full inbound
                // channel cannot wedge shutdown.
                select! {
                    send(inbound, ev) -> res => {
                        if res.is_err() {
                            break;
                        }
                    }
                    recv(done) -> _ => break,
                }
            }
        }));
    }

    fn spawn_event_coalescer(&mut self) {
        let inbound = self.ch.inbound_rx.clone();
        let done = self.ch.done_rx.clone();
        let buffer = self.buffer.clone();
        let nudge = self.ch.nudge_tx.clone();
        let cfg = self.cfg;
        self.workers.push(spawn_worker("hexes-coalesce", move || {
            loop {
                select! {
                    recv(inbound) -> ev => match ev {
                        Ok(ev) => {
                            buffer_event(&buffer, ev, &cfg);
                            let _ = nudge.try_send(());
                        }
                        Err(_) => break,
                    },
                    recv(done) -> _ => break,
                }
            }
        }));
    }

    fn spawn_request_worker(&mut self) {
        let requests = self.ch.req_rx.clone();
        let funcs = self.ch.func_rx.clone();
        let done = self.ch.done_rx.clone();
        let screen = self.screen.clone();
        let pending = self.pending.clone();
        let running = self.running.clone();
        let done_tx = self.ch.done_tx.clone();
        self.workers.push(spawn_worker("hexes-requests", move || {
            'outer: loop {
                let first = select! {
                    recv(requests) -> r => match r {
                        Ok(r) => r,
                        Err(_) => break,
                    },
                    recv(done) -> _ => break,
                };
                // One pass: everything queued right now, deduplicated
                // for the flag-carrying request types.
                let mut pass = vec![first];
                while let Ok(r) = requests.try_recv() {
                    pass.push(r);
                }
                let mut executed = [false; 4];
                for req in pass {
                    let dedup_slot = match req {
                        Request::Draw => Some(0),
                        Request::Show => Some(1),
                        Request::Sync => Some(2),
                        Request::Quit => Some(3),
                        Request::Func => None,
                    };
                    if let Some(slot) = dedup_slot {
                        if executed[slot] {
                            continue;
                        }
                        executed[slot] = true;
                    }
                    if let Some(flag) = pending.flag(req) {
                        flag.store(false, Ordering::SeqCst);
                    }
                    match req {
                        Request::Draw | Request::Show => {
                            let mut screen = screen.lock().unwrap();
                            if let Err(e) = screen.show() {
                                warn!(target: "display.loop", error = %e, "render failed");
                            }
                        }
                        Request::Sync => {
                            let mut screen = screen.lock().unwrap();
                            if let Err(e) = screen.sync() {
                                warn!(target: "display.loop", error = %e, "resync failed");
                            }
                        }
                        Request::Func => {
                            if let Ok(f) = funcs.try_recv() {
                                f(&mut **screen.lock().unwrap());
                            }
                        }
                        Request::Quit => {
                            debug!(target: "display.loop", "quit requested");
                            *running.write().unwrap() = false;
                            done_tx.lock().unwrap().take();
                            break 'outer;
                        }
                    }
                }
            }
        }));
    }

    /// Run the main task on the calling thread until quit.
    ///
    /// The handler runs here for every buffered event, as do closures
    /// submitted through `async_call_main`/`await_call_main`. A panic
    /// in either is recovered after shutdown cleanup and re-raised.
    pub fn run<F>(&mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(Event, &DisplayHandle),
    {
        if !self.started {
            return Err(Error::NotRunning);
        }
        let handle = self.handle();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            loop {
                select! {
                    recv(self.ch.main_rx) -> f => match f {
                        Ok(f) => f(),
                        Err(_) => break,
                    },
                    recv(self.ch.nudge_rx) -> nudge => {
                        if nudge.is_err() {
                            break;
                        }
                        for ev in drain_buffer(&self.buffer) {
                            handler(ev, &handle);
                        }
                    }
                    recv(self.ch.done_rx) -> _ => break,
                }
            }
        }));
        self.teardown();
        match outcome {
            Ok(()) => Ok(()),
            Err(panic) => resume_unwind(panic),
        }
    }

    fn teardown(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        *self.running.write().unwrap() = false;
        self.ch.done_tx.lock().unwrap().take();
        // Late-arriving closures still run, in submission order.
        while let Ok(f) = self.ch.main_rx.try_recv() {
            f();
        }
        while let Ok(f) = self.ch.func_rx.try_recv() {
            f(&mut **self.screen.lock().unwrap());
        }
        self.timers.stop();
        let _ = self.shutdown.emit(&());
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        self.screen.lock().unwrap().close();
        info!(target: "display.loop", "shut down");
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        if self.started {
            self.teardown();
        }
    }
}

fn spawn_worker<F>(name: &str, f: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .expect("spawning a display worker cannot fail")
}

fn drain_buffer(buffer: &Mutex<VecDeque<Event>>) -> Vec<Event> {
    buffer.lock().unwrap().drain(..).collect()
}

/// Append with compression: adjacent same-kind events collapse to the
/// newest one. Key and Paste are ordering-significant and never
/// collapse; drag-state mouse events are exempted when the trail is
/// preserved.
fn buffer_event(buffer: &Mutex<VecDeque<Event>>, ev: Event, cfg: &DisplayConfig) {
    let mut buf = buffer.lock().unwrap();
    if cfg.compress_events
        && compressible(&ev, cfg)
        && buf
            .back()
            .is_some_and(|last| last.kind() == ev.kind() && compressible(last, cfg))
    {
        *buf.back_mut().unwrap() = ev;
        return;
    }
    buf.push_back(ev);
}

fn compressible(ev: &Event, cfg: &DisplayConfig) -> bool {
    match ev.kind() {
        EventKind::Key | EventKind::Paste => false,
        EventKind::Mouse if cfg.preserve_drag_trail => match ev {
            Event::Mouse(m) => !matches!(
                m.state,
                MouseState::DragStart | MouseState::DragMove | MouseState::DragStop
            ),
            _ => true,
        },
        _ => true,
    }
}

/// Clonable access to a running display.
#[derive(Clone)]
pub struct DisplayHandle {
    running: Arc<RwLock<bool>>,
    pending: Arc<Pending>,
    req_tx: Sender<Request>,
    func_tx: Sender<ScreenFn>,
    main_tx: Sender<MainFn>,
    screen: Arc<Mutex<Box<dyn Screen>>>,
    timers: Timers,
    shutdown: Arc<Signal<()>>,
}

impl DisplayHandle {
    fn ensure_running(&self) -> Result<()> {
        if *self.running.read().unwrap() {
            Ok(())
        } else {
            Err(Error::NotRunning)
        }
    }

    fn request(&self, req: Request) -> Result<()> {
        self.ensure_running()?;
        if let Some(flag) = self.pending.flag(req) {
            if flag.swap(true, Ordering::SeqCst) {
                // An identical request is still unprocessed.
                return Ok(());
            }
        }
        self.req_tx.send(req).map_err(|_| {
            if let Some(flag) = self.pending.flag(req) {
                flag.store(false, Ordering::SeqCst);
            }
            Error::NotRunning
        })
    }

    /// Coalesced diff-render request.
    pub fn request_draw(&self) -> Result<()> {
        self.request(Request::Draw)
    }

    /// Coalesced flush request.
    pub fn request_show(&self) -> Result<()> {
        self.request(Request::Show)
    }

    /// Coalesced full-repaint request.
    pub fn request_sync(&self) -> Result<()> {
        self.request(Request::Sync)
    }

    /// Begin shutdown; the main loop returns once the quit executes.
    pub fn request_quit(&self) -> Result<()> {
        self.request(Request::Quit)
    }

    /// Enqueue a closure for the UI worker; non-blocking.
    pub fn async_call<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Screen) + Send + 'static,
    {
        self.ensure_running()?;
        self.func_tx
            .send(Box::new(f))
            .map_err(|_| Error::NotRunning)?;
        self.request(Request::Func)
    }

    /// Run a closure on the UI worker and wait for it to finish.
    ///
    /// Must not be invoked from the UI worker itself (a queued closure
    /// waiting on itself cannot make progress).
    pub fn await_call<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Screen) + Send + 'static,
    {
        let (ack_tx, ack_rx) = bounded::<()>(1);
        self.async_call(move |screen| {
            f(screen);
            let _ = ack_tx.send(());
        })?;
        ack_rx.recv().map_err(|_| Error::NotRunning)
    }

    /// Enqueue a closure for the main task; non-blocking.
    pub fn async_call_main<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.ensure_running()?;
        self.main_tx.send(Box::new(f)).map_err(|_| Error::NotRunning)
    }

    /// Run a closure on the main task and wait for it to finish.
    pub fn await_call_main<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let (ack_tx, ack_rx) = bounded::<()>(1);
        self.async_call_main(move || {
            f();
            let _ = ack_tx.send(());
        })?;
        ack_rx.recv().map_err(|_| Error::NotRunning)
    }

    /// Forward a synthetic event into the screen's queue.
    pub fn post_event(&self, ev: Event) -> Result<()> {
        self.ensure_running()?;
        self.screen.lock().unwrap().post_event(ev)
    }

    /// Schedule a one-shot callback on the display's timer wheel.
    pub fn add_timeout<F>(&self, delay: Duration, f: F) -> Result<TimerId>
    where
        F: FnOnce(&DisplayHandle) + Send + 'static,
    {
        self.ensure_running()?;
        Ok(self.timers.add(delay, Box::new(f)))
    }

    pub fn cancel_timeout(&self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    /// Stop every outstanding timer on this display.
    pub fn cancel_all_timeouts(&self) {
        self.timers.cancel_all();
    }

    /// Register a shutdown listener (reverse-order semantics, see
    /// [`Signal`]).
    pub fn on_shutdown<F>(&self, f: F) -> crate::ListenerId
    where
        F: Fn(&()) -> crate::Flow + Send + 'static,
    {
        self.shutdown.connect(f)
    }

    pub fn is_running(&self) -> bool {
        *self.running.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{KeyEvent, ModMask, MouseEvent, PasteEvent, ResizeEvent};
    use core_events::{ButtonMask, Key};

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(Key::Rune, c, ModMask::empty()))
    }

    fn resize(w: usize) -> Event {
        Event::Resize(ResizeEvent::new(w, 25))
    }

    fn drag(x: i32) -> Event {
        Event::Mouse(MouseEvent::new(
            x,
            0,
            ButtonMask::BUTTON1,
            ModMask::empty(),
            MouseState::DragMove,
        ))
    }

    fn kinds(buf: &Mutex<VecDeque<Event>>) -> Vec<EventKind> {
        buf.lock().unwrap().iter().map(Event::kind).collect()
    }

    #[test]
    fn adjacent_resizes_collapse_to_last() {
        let cfg = DisplayConfig::default();
        let buf = Mutex::new(VecDeque::new());
        buffer_event(&buf, resize(100), &cfg);
        buffer_event(&buf, resize(110), &cfg);
        buffer_event(&buf, resize(120), &cfg);
        assert_eq!(kinds(&buf), vec![EventKind::Resize]);
        match buf.lock().unwrap().front().unwrap() {
            Event::Resize(r) => assert_eq!(r.width, 120),
            other => panic!("unexpected {other:?}"),
        };
    }

    #[test]
    fn keys_never_compress() {
        let cfg = DisplayConfig::default();
        let buf = Mutex::new(VecDeque::new());
        buffer_event(&buf, key('a'), &cfg);
        buffer_event(&buf, key('b'), &cfg);
        buffer_event(&buf, Event::Paste(PasteEvent::new(true)), &cfg);
        buffer_event(&buf, Event::Paste(PasteEvent::new(false)), &cfg);
        assert_eq!(buf.lock().unwrap().len(), 4);
    }

    #[test]
    fn interleaved_kinds_preserve_order() {
        let cfg = DisplayConfig::default();
        let buf = Mutex::new(VecDeque::new());
        buffer_event(&buf, resize(100), &cfg);
        buffer_event(&buf, key('a'), &cfg);
        buffer_event(&buf, resize(120), &cfg);
        assert_eq!(
            kinds(&buf),
            vec![EventKind::Resize, EventKind::Key, EventKind::Resize]
        );
    }

    #[test]
    fn drag_trail_flag_preserves_trajectory() {
        let mut cfg = DisplayConfig::default();
        let buf = Mutex::new(VecDeque::new());
        buffer_event(&buf, drag(1), &cfg);
        buffer_event(&buf, drag(2), &cfg);
        assert_eq!(buf.lock().unwrap().len(), 1, "drags collapse by default");

        cfg.preserve_drag_trail = true;
        let buf = Mutex::new(VecDeque::new());
        buffer_event(&buf, drag(1), &cfg);
        buffer_event(&buf, drag(2), &cfg);
        assert_eq!(buf.lock().unwrap().len(), 2, "flag keeps the trail");
    }

    #[test]
    fn compression_can_be_disabled() {
        let cfg = DisplayConfig {
            compress_events: false,
            ..DisplayConfig::default()
        };
        let buf = Mutex::new(VecDeque::new());
        buffer_event(&buf, resize(100), &cfg);
        buffer_event(&buf, resize(110), &cfg);
        assert_eq!(buf.lock().unwrap().len(), 2);
    }
}
