//! Builtin capability records.
//!
//! The xterm family is the baseline; other entries override only what
//! differs. Key tables list both normal and application cursor-mode
//! sequences where terminals emit either.

use crate::Terminfo;
use core_events::Key;

const XTERM_KEYS: &[(Key, &str)] = &[
    (Key::Up, "\x1bOA"),
    (Key::Down, "\x1bOB"),
    (Key::Right, "\x1bOC"),
    (Key::Left, "\x1bOD"),
    (Key::Up, "\x1b[A"),
    (Key::Down, "\x1b[B"),
    (Key::Right, "\x1b[C"),
    (Key::Left, "\x1b[D"),
    (Key::Home, "\x1bOH"),
    (Key::End, "\x1bOF"),
    (Key::Home, "\x1b[H"),
    (Key::End, "\x1b[F"),
    (Key::Insert, "\x1b[2~"),
    (Key::Delete, "\x1b[3~"),
    (Key::PageUp, "\x1b[5~"),
    (Key::PageDown, "\x1b[6~"),
    (Key::Backtab, "\x1b[Z"),
    (Key::F(1), "\x1bOP"),
    (Key::F(2), "\x1bOQ"),
    (Key::F(3), "\x1bOR"),
    (Key::F(4), "\x1bOS"),
    (Key::F(5), "\x1b[15~"),
    (Key::F(6), "\x1b[17~"),
    (Key::F(7), "\x1b[18~"),
    (Key::F(8), "\x1b[19~"),
    (Key::F(9), "\x1b[20~"),
    (Key::F(10), "\x1b[21~"),
    (Key::F(11), "\x1b[23~"),
    (Key::F(12), "\x1b[24~"),
];

const LINUX_KEYS: &[(Key, &str)] = &[
    (Key::Up, "\x1b[A"),
    (Key::Down, "\x1b[B"),
    (Key::Right, "\x1b[C"),
    (Key::Left, "\x1b[D"),
    (Key::Home, "\x1b[1~"),
    (Key::End, "\x1b[4~"),
    (Key::Insert, "\x1b[2~"),
    (Key::Delete, "\x1b[3~"),
    (Key::PageUp, "\x1b[5~"),
    (Key::PageDown, "\x1b[6~"),
    (Key::F(1), "\x1b[[A"),
    (Key::F(2), "\x1b[[B"),
    (Key::F(3), "\x1b[[C"),
    (Key::F(4), "\x1b[[D"),
    (Key::F(5), "\x1b[[E"),
    (Key::F(6), "\x1b[17~"),
    (Key::F(7), "\x1b[18~"),
    (Key::F(8), "\x1b[19~"),
    (Key::F(9), "\x1b[20~"),
    (Key::F(10), "\x1b[21~"),
    (Key::F(11), "\x1b[23~"),
    (Key::F(12), "\x1b[24~"),
];

const VT100_KEYS: &[(Key, &str)] = &[
    (Key::Up, "\x1bOA"),
    (Key::Down, "\x1bOB"),
    (Key::Right, "\x1bOC"),
    (Key::Left, "\x1bOD"),
    (Key::F(1), "\x1bOP"),
    (Key::F(2), "\x1bOQ"),
    (Key::F(3), "\x1bOR"),
    (Key::F(4), "\x1bOS"),
];

const SETAF_256: &str = "\x1b[%?%p1%{8}%<%t3%p1%d%e%p1%{16}%<%t9%p1%{8}%-%d%e38;5;%p1%d%;m";
const SETAB_256: &str = "\x1b[%?%p1%{8}%<%t4%p1%d%e%p1%{16}%<%t10%p1%{8}%-%d%e48;5;%p1%d%;m";

const XTERM: Terminfo = Terminfo {
    name: "xterm",
    aliases: &["xterm-xfree86"],
    columns: 80,
    lines: 24,
    colors: 8,
    bell: "\x07",
    clear: "\x1b[H\x1b[2J",
    enter_ca: "\x1b[?1049h",
    exit_ca: "\x1b[?1049l",
    show_cursor: "\x1b[?25h",
    hide_cursor: "\x1b[?25l",
    attr_off: "\x1b[0m",
    bold: "\x1b[1m",
    underline: "\x1b[4m",
    reverse: "\x1b[7m",
    blink: "\x1b[5m",
    dim: "\x1b[2m",
    italic: "\x1b[3m",
    strikethrough: "\x1b[9m",
    enter_acs: "\x1b(0",
    exit_acs: "\x1b(B",
    set_fg: "\x1b[3%p1%dm",
    set_bg: "\x1b[4%p1%dm",
    reset_fg_bg: "\x1b[39;49m",
    set_fg_rgb: "",
    set_bg_rgb: "",
    set_cursor: "\x1b[%i%p1%d;%p2%dH",
    enter_keypad: "\x1b[?1h\x1b=",
    exit_keypad: "\x1b[?1l\x1b>",
    enable_paste: "\x1b[?2004h",
    disable_paste: "\x1b[?2004l",
    mouse: "\x1b[M",
    keys: XTERM_KEYS,
};

const XTERM_256: Terminfo = Terminfo {
    name: "xterm-256color",
    aliases: &["alacritty", "xterm-ghostty", "wezterm", "foot"],
    colors: 256,
    set_fg: SETAF_256,
    set_bg: SETAB_256,
    set_fg_rgb: "\x1b[38;2;%p1%d;%p2%d;%p3%dm",
    set_bg_rgb: "\x1b[48;2;%p1%d;%p2%d;%p3%dm",
    ..XTERM
};

const SCREEN: Terminfo = Terminfo {
    name: "screen",
    aliases: &["tmux"],
    colors: 8,
    enter_ca: "\x1b[?1049h",
    exit_ca: "\x1b[?1049l",
    ..XTERM
};

const SCREEN_256: Terminfo = Terminfo {
    name: "screen-256color",
    aliases: &["tmux-256color"],
    colors: 256,
    set_fg: SETAF_256,
    set_bg: SETAB_256,
    set_fg_rgb: "\x1b[38;2;%p1%d;%p2%d;%p3%dm",
    set_bg_rgb: "\x1b[48;2;%p1%d;%p2%d;%p3%dm",
    ..SCREEN
};

const LINUX: Terminfo = Terminfo {
    name: "linux",
    aliases: &[],
    columns: 80,
    lines: 25,
    colors: 8,
    enter_ca: "",
    exit_ca: "",
    enter_acs: "\x0e",
    exit_acs: "\x0f",
    italic: "",
    strikethrough: "",
    enter_keypad: "",
    exit_keypad: "",
    mouse: "",
    keys: LINUX_KEYS,
    ..XTERM
};

const VT100: Terminfo = Terminfo {
    name: "vt100",
    aliases: &[],
    columns: 80,
    lines: 24,
    colors: 0,
    bell: "\x07",
    clear: "\x1b[H\x1b[J",
    enter_ca: "",
    exit_ca: "",
    show_cursor: "",
    hide_cursor: "",
    attr_off: "\x1b[m\x0f",
    bold: "\x1b[1m",
    underline: "\x1b[4m",
    reverse: "\x1b[7m",
    blink: "\x1b[5m",
    dim: "\x1b[2m",
    italic: "",
    strikethrough: "",
    enter_acs: "\x0e",
    exit_acs: "\x0f",
    set_fg: "",
    set_bg: "",
    reset_fg_bg: "",
    set_fg_rgb: "",
    set_bg_rgb: "",
    set_cursor: "\x1b[%i%p1%d;%p2%dH",
    enter_keypad: "\x1b[?1h\x1b=",
    exit_keypad: "\x1b[?1l\x1b>",
    enable_paste: "",
    disable_paste: "",
    mouse: "",
    keys: VT100_KEYS,
};

const VT220: Terminfo = Terminfo {
    name: "vt220",
    aliases: &[],
    show_cursor: "\x1b[?25h",
    hide_cursor: "\x1b[?25l",
    ..VT100
};

const RXVT_256: Terminfo = Terminfo {
    name: "rxvt-unicode-256color",
    aliases: &["rxvt-unicode"],
    enter_ca: "\x1b[?1049h",
    exit_ca: "\x1b[r\x1b[?1049l",
    ..XTERM_256
};

const ANSI: Terminfo = Terminfo {
    name: "ansi",
    aliases: &[],
    enter_ca: "",
    exit_ca: "",
    enter_keypad: "",
    exit_keypad: "",
    mouse: "",
    enable_paste: "",
    disable_paste: "",
    keys: LINUX_KEYS,
    ..XTERM
};

/// Synthetic record used by the offscreen screen; a 256-color
/// xterm-compatible terminal with fixed default geometry.
const OFFSCREEN: Terminfo = Terminfo {
    name: "offscreen",
    aliases: &["simulation"],
    columns: 80,
    lines: 25,
    ..XTERM_256
};

static ENTRIES: &[&Terminfo] = &[
    &XTERM,
    &XTERM_256,
    &SCREEN,
    &SCREEN_256,
    &LINUX,
    &VT100,
    &VT220,
    &RXVT_256,
    &ANSI,
    &OFFSCREEN,
];

pub(crate) fn find(term: &str) -> Option<&'static Terminfo> {
    ENTRIES
        .iter()
        .find(|ti| ti.name == term || ti.aliases.iter().any(|a| *a == term))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_family() {
        assert_eq!(find("alacritty").unwrap().name, "xterm-256color");
        assert_eq!(find("tmux").unwrap().name, "screen");
        assert_eq!(find("simulation").unwrap().name, "offscreen");
    }

    #[test]
    fn every_entry_has_cursor_addressing() {
        for ti in ENTRIES {
            assert!(!ti.set_cursor.is_empty(), "{} lacks cup", ti.name);
        }
    }

    #[test]
    fn offscreen_defaults() {
        let ti = find("offscreen").unwrap();
        assert_eq!((ti.columns, ti.lines), (80, 25));
        assert_eq!(ti.colors, 256);
    }
}
