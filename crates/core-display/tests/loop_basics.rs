//! Display loop behavior over an offscreen screen.

use core_display::{Display, DisplayConfig, Flow};
use core_events::{Error, Event, EventKind, Key, KeyEvent, ModMask};
use core_render::Style;
use core_terminal::{OffscreenScreen, Screen};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn key_event(c: char) -> Event {
    Event::Key(KeyEvent::new(Key::Rune, c, ModMask::empty()))
}

#[test]
fn primitives_fail_before_startup() {
    let display = Display::new(Box::new(OffscreenScreen::new()), DisplayConfig::default());
    let handle = display.handle();
    assert!(matches!(handle.request_draw(), Err(Error::NotRunning)));
    assert!(matches!(
        handle.async_call(|_| {}),
        Err(Error::NotRunning)
    ));
    assert!(matches!(
        handle.await_call_main(|| {}),
        Err(Error::NotRunning)
    ));
    assert!(!handle.is_running());
}

#[test]
fn events_flow_to_the_main_handler() {
    let mut display = Display::new(Box::new(OffscreenScreen::new()), DisplayConfig::default());
    display.startup().unwrap();
    let handle = display.handle();

    let driver = {
        let handle = handle.clone();
        std::thread::spawn(move || {
            handle.post_event(key_event('a')).unwrap();
            handle.post_event(key_event('b')).unwrap();
            std::thread::sleep(Duration::from_millis(50));
            handle.request_quit().unwrap();
        })
    };

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in = seen.clone();
    display
        .run(move |ev, _| {
            if let Event::Key(k) = &ev {
                seen_in.lock().unwrap().push(k.rune);
            }
        })
        .unwrap();
    driver.join().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!['a', 'b']);
}

#[test]
fn await_call_observes_completion() {
    let mut display = Display::new(Box::new(OffscreenScreen::new()), DisplayConfig::default());
    display.startup().unwrap();
    let handle = display.handle();

    let driver = {
        let handle = handle.clone();
        std::thread::spawn(move || {
            handle
                .await_call(|screen| {
                    screen.set_content(0, 0, 'Z', &[], Style::default());
                    screen.show().unwrap();
                })
                .unwrap();
            // The closure ran to completion before await_call
            // returned, so the cell is committed.
            handle
                .await_call(|screen| {
                    let (ch, _, _, _) = screen.get_content(0, 0);
                    assert_eq!(ch, 'Z');
                })
                .unwrap();
            handle.request_quit().unwrap();
        })
    };

    display.run(|_, _| {}).unwrap();
    driver.join().unwrap();
}

#[test]
fn main_calls_run_on_the_main_thread() {
    let mut display = Display::new(Box::new(OffscreenScreen::new()), DisplayConfig::default());
    display.startup().unwrap();
    let handle = display.handle();
    let main_thread = std::thread::current().id();

    let observed = Arc::new(Mutex::new(None));
    let driver = {
        let handle = handle.clone();
        let observed = observed.clone();
        std::thread::spawn(move || {
            handle
                .await_call_main(move || {
                    *observed.lock().unwrap() = Some(std::thread::current().id());
                })
                .unwrap();
            handle.request_quit().unwrap();
        })
    };

    display.run(|_, _| {}).unwrap();
    driver.join().unwrap();
    assert_eq!(observed.lock().unwrap().unwrap(), main_thread);
}

/// Screen wrapper counting render passes, for coalescing assertions.
struct CountingScreen {
    inner: OffscreenScreen,
    shows: Arc<AtomicUsize>,
}

impl Screen for CountingScreen {
    fn init(&mut self) -> core_events::Result<()> {
        self.inner.init()
    }
    fn close(&mut self) {
        self.inner.close()
    }
    fn set_style(&mut self, style: Style) {
        self.inner.set_style(style)
    }
    fn set_content(&mut self, x: usize, y: usize, ch: char, comb: &[char], style: Style) {
        self.inner.set_content(x, y, ch, comb, style)
    }
    fn get_content(&self, x: usize, y: usize) -> (char, Vec<char>, Style, isize) {
        self.inner.get_content(x, y)
    }
    fn fill(&mut self, ch: char, style: Style) {
        self.inner.fill(ch, style)
    }
    fn clear(&mut self) {
        self.inner.clear()
    }
    fn size(&self) -> (usize, usize) {
        self.inner.size()
    }
    fn colors(&self) -> usize {
        self.inner.colors()
    }
    fn can_display(&self, ch: char, fallbacks: bool) -> bool {
        self.inner.can_display(ch, fallbacks)
    }
    fn has_key(&self, key: Key) -> bool {
        self.inner.has_key(key)
    }
    fn show(&mut self) -> core_events::Result<()> {
        self.shows.fetch_add(1, Ordering::SeqCst);
        self.inner.show()
    }
    fn sync(&mut self) -> core_events::Result<()> {
        self.inner.sync()
    }
    fn set_cursor(&mut self, x: usize, y: usize) {
        self.inner.set_cursor(x, y)
    }
    fn hide_cursor(&mut self) {
        self.inner.hide_cursor()
    }
    fn enable_mouse(&mut self, flags: core_terminal::MouseFlags) -> core_events::Result<()> {
        self.inner.enable_mouse(flags)
    }
    fn disable_mouse(&mut self) -> core_events::Result<()> {
        self.inner.disable_mouse()
    }
    fn enable_paste(&mut self) -> core_events::Result<()> {
        self.inner.enable_paste()
    }
    fn disable_paste(&mut self) -> core_events::Result<()> {
        self.inner.disable_paste()
    }
    fn poll_event(&self) -> Option<Event> {
        self.inner.poll_event()
    }
    fn post_event(&self, ev: Event) -> core_events::Result<()> {
        self.inner.post_event(ev)
    }
    fn event_channel(&self) -> crossbeam_channel::Receiver<Event> {
        self.inner.event_channel()
    }
    fn beep(&mut self) -> core_events::Result<()> {
        self.inner.beep()
    }
    fn register_rune_fallback(&mut self, ch: char, replacement: &str) {
        self.inner.register_rune_fallback(ch, replacement)
    }
    fn unregister_rune_fallback(&mut self, ch: char) {
        self.inner.unregister_rune_fallback(ch)
    }
    fn copy_to_clipboard(&mut self, s: &str) -> core_events::Result<()> {
        self.inner.copy_to_clipboard(s)
    }
    fn call(&mut self, f: core_terminal::CallClosure) -> core_events::Result<()> {
        self.inner.call(f)
    }
    fn keep_file_handle(&mut self, keep: bool) {
        self.inner.keep_file_handle(keep)
    }
    fn set_capture_ctrl_c(&mut self, capture: bool) {
        self.inner.set_capture_ctrl_c(capture)
    }
    fn charset(&self) -> &'static str {
        self.inner.charset()
    }
}

#[test]
fn back_to_back_draws_coalesce() {
    let shows = Arc::new(AtomicUsize::new(0));
    let screen = CountingScreen {
        inner: OffscreenScreen::new(),
        shows: shows.clone(),
    };
    let mut display = Display::new(Box::new(screen), DisplayConfig::default());
    display.startup().unwrap();
    let handle = display.handle();

    let driver = {
        let handle = handle.clone();
        std::thread::spawn(move || {
            // Stall the request worker inside a closure so the draw
            // burst piles up behind it, then fence and quit.
            handle
                .async_call(|_| std::thread::sleep(Duration::from_millis(100)))
                .unwrap();
            std::thread::sleep(Duration::from_millis(20));
            for _ in 0..10 {
                handle.request_draw().unwrap();
            }
            handle.await_call(|_| {}).unwrap();
            handle.request_quit().unwrap();
        })
    };

    display.run(|_, _| {}).unwrap();
    driver.join().unwrap();

    let shows = shows.load(Ordering::SeqCst);
    assert!(shows >= 1, "at least one render pass must run");
    assert!(shows <= 2, "10 draws must coalesce, saw {shows} passes");
}

#[test]
fn timers_fire_and_cancel() {
    let mut display = Display::new(Box::new(OffscreenScreen::new()), DisplayConfig::default());
    display.startup().unwrap();
    let handle = display.handle();

    let fired = Arc::new(AtomicBool::new(false));
    let cancelled_fired = Arc::new(AtomicBool::new(false));

    {
        let fired = fired.clone();
        handle
            .add_timeout(Duration::from_millis(10), move |h| {
                fired.store(true, Ordering::SeqCst);
                h.request_quit().unwrap();
            })
            .unwrap();
    }
    {
        let cancelled_fired = cancelled_fired.clone();
        let id = handle
            .add_timeout(Duration::from_millis(5), move |_| {
                cancelled_fired.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert!(handle.cancel_timeout(id));
        assert!(!handle.cancel_timeout(id), "second cancel is a no-op");
    }

    display.run(|_, _| {}).unwrap();
    assert!(fired.load(Ordering::SeqCst));
    assert!(!cancelled_fired.load(Ordering::SeqCst));
}

#[test]
fn shutdown_signal_fires_once_on_teardown() {
    let mut display = Display::new(Box::new(OffscreenScreen::new()), DisplayConfig::default());
    display.startup().unwrap();
    let handle = display.handle();

    let notified = Arc::new(AtomicUsize::new(0));
    {
        let notified = notified.clone();
        handle.on_shutdown(move |_| {
            notified.fetch_add(1, Ordering::SeqCst);
            Flow::Pass
        });
    }

    let driver = {
        let handle = handle.clone();
        std::thread::spawn(move || handle.request_quit().unwrap())
    };
    display.run(|_, _| {}).unwrap();
    driver.join().unwrap();

    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert!(!handle.is_running());
    assert!(matches!(handle.request_draw(), Err(Error::NotRunning)));
}

#[test]
fn resize_bursts_compress_to_last() {
    let mut display = Display::new(Box::new(OffscreenScreen::new()), DisplayConfig::default());
    display.startup().unwrap();
    let handle = display.handle();

    // Queue the burst before the main loop starts draining, then give
    // the coalescer time to fold it into the buffer.
    for w in [100usize, 110, 120] {
        handle
            .post_event(Event::Resize(core_events::ResizeEvent::new(w, 25)))
            .unwrap();
    }
    std::thread::sleep(Duration::from_millis(50));

    let driver = {
        let handle = handle.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.request_quit().unwrap();
        })
    };

    let resizes = Arc::new(Mutex::new(Vec::new()));
    let resizes_in = resizes.clone();
    display
        .run(move |ev, _| {
            if let Event::Resize(r) = &ev {
                resizes_in.lock().unwrap().push((r.width, ev.kind()));
            }
        })
        .unwrap();
    driver.join().unwrap();

    let resizes = resizes.lock().unwrap();
    assert_eq!(resizes.len(), 1, "burst must compress to one event");
    assert_eq!(resizes[0], (120, EventKind::Resize), "last geometry wins");
}
