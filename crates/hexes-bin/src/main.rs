//! hexes entrypoint: a small event-echo application over the display
//! loop, doubling as a smoke test for the runtime.

use anyhow::Result;
use clap::Parser;
use core_config::{Config, Overrides};
use core_display::{Display, DisplayConfig, DisplayHandle};
use core_events::{Event, Key, ModMask};
use core_render::{AttrMask, Color, Style};
use core_terminal::{MouseFlags, Screen, TtyScreen};
use std::path::PathBuf;
use tracing::info;

/// CLI arguments; every knob mirrors its `HEXES_*` environment
/// variable, with the CLI winning.
#[derive(Parser, Debug)]
#[command(name = "hexes", version, about = "hexes terminal runtime demo")]
struct Args {
    /// Log filter, e.g. `info` or `warn,screen.render=trace`.
    #[arg(long)]
    log_level: Option<String>,
    /// Log file path (stderr when unset).
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Log rendering: pretty, text or json.
    #[arg(long)]
    log_format: Option<String>,
    /// Timestamp log records.
    #[arg(long)]
    log_timestamps: Option<bool>,
    /// Chrono timestamp format override.
    #[arg(long)]
    log_timestamp_format: Option<String>,
    /// Record file and line numbers on log events.
    #[arg(long)]
    log_full_paths: Option<bool>,
    /// Profiling mode handed to the external profiler hook.
    #[arg(long)]
    profile: Option<String>,
    /// Profile output path.
    #[arg(long)]
    profile_path: Option<PathBuf>,
}

impl Args {
    fn overrides(self) -> Overrides {
        Overrides {
            log_level: self.log_level,
            log_file: self.log_file,
            log_format: self.log_format,
            log_timestamps: self.log_timestamps,
            log_timestamp_format: self.log_timestamp_format,
            log_full_paths: self.log_full_paths,
            profile: self.profile,
            profile_path: self.profile_path,
        }
    }
}

fn put_str(screen: &mut dyn Screen, x: usize, y: usize, s: &str, style: Style) {
    let mut col = x;
    for ch in s.chars() {
        screen.set_content(col, y, ch, &[], style);
        col += 1;
    }
}

fn draw_chrome(screen: &mut dyn Screen) {
    let (w, h) = screen.size();
    let bar = Style::default()
        .foreground(Color::BLACK)
        .background(Color::SILVER);
    screen.clear();
    for x in 0..w {
        screen.set_content(x, 0, ' ', &[], bar);
        if h > 1 {
            screen.set_content(x, h - 1, ' ', &[], bar);
        }
    }
    put_str(screen, 1, 0, "hexes — q or Ctrl-C quits", bar);
}

fn show_status(screen: &mut dyn Screen, line: &str) {
    let (w, h) = screen.size();
    if h == 0 {
        return;
    }
    let bar = Style::default()
        .foreground(Color::BLACK)
        .background(Color::SILVER)
        .attributes(AttrMask::BOLD);
    for x in 0..w {
        screen.set_content(x, h - 1, ' ', &[], bar);
    }
    put_str(screen, 1, h - 1, line, bar);
}

fn describe(ev: &Event) -> String {
    match ev {
        Event::Key(k) => format!("key {}", k.name()),
        Event::Mouse(m) => format!("mouse {:?} at ({}, {})", m.state, m.x, m.y),
        Event::Resize(r) => format!("resize to {}x{}", r.width, r.height),
        Event::Paste(p) => {
            if p.start {
                "paste start".to_string()
            } else {
                "paste end".to_string()
            }
        }
        Event::Error(e) => format!("error: {}", e.error),
        Event::Interrupt(_) => "interrupt".to_string(),
    }
}

fn handle_event(ev: Event, handle: &DisplayHandle) {
    match &ev {
        Event::Key(k) if k.key == Key::Rune && k.rune == 'q' && k.mods == ModMask::empty() => {
            let _ = handle.request_quit();
            return;
        }
        Event::Interrupt(_) => {
            info!(target: "app", "interrupted, shutting down");
            let _ = handle.request_quit();
            return;
        }
        Event::Resize(_) => {
            let line = describe(&ev);
            let _ = handle.async_call(move |screen| {
                draw_chrome(screen);
                show_status(screen, &line);
            });
            let _ = handle.request_sync();
            return;
        }
        _ => {}
    }
    let line = describe(&ev);
    let _ = handle.async_call(move |screen| show_status(screen, &line));
    let _ = handle.request_draw();
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env().apply(args.overrides());
    let _log_guard = core_config::logging::init(&config.log)?;
    if let Some(mode) = &config.profile.mode {
        info!(target: "app", mode, path = ?config.profile.path, "profiling requested");
    }

    let screen = TtyScreen::new()?;
    let mut display = Display::new(Box::new(screen), DisplayConfig::default());
    display.startup()?;

    let handle = display.handle();
    handle.await_call(|screen| {
        screen.set_capture_ctrl_c(true);
        let _ = screen.enable_mouse(MouseFlags::BUTTONS | MouseFlags::DRAG);
        let _ = screen.enable_paste();
        draw_chrome(screen);
        show_status(screen, "ready");
        let _ = screen.show();
    })?;

    // A panic inside the loop is recovered after cleanup and
    // re-raised here, so the terminal is restored before the process
    // dies with the original panic.
    display.run(handle_event)?;
    info!(target: "app", "clean shutdown");
    Ok(())
}
