//! End-to-end decoder scenarios over realistic byte streams.

use core_encoding::Charset;
use core_events::{ButtonMask, Event, Key, ModMask, MouseState};
use core_input::Decoder;

fn decoder() -> Decoder {
    Decoder::new(core_terminfo::lookup("xterm-256color").unwrap(), Charset::Utf8)
}

fn feed(dec: &mut Decoder, bytes: &[u8]) -> Vec<Event> {
    let mut sink = Vec::new();
    dec.feed(bytes, &mut sink);
    sink
}

#[test]
fn sgr_click_drag_release() {
    let mut dec = decoder();
    let mut evs = feed(&mut dec, b"\x1b[<0;5;5M");
    evs.extend(feed(&mut dec, b"\x1b[<0;6;5M"));
    evs.extend(feed(&mut dec, b"\x1b[<0;6;5m"));

    let mouse: Vec<_> = evs
        .iter()
        .map(|e| match e {
            Event::Mouse(m) => m,
            other => panic!("expected mouse event, got {other:?}"),
        })
        .collect();
    assert_eq!(mouse.len(), 3);

    assert_eq!(mouse[0].state, MouseState::ButtonPress);
    assert_eq!(mouse[0].buttons, ButtonMask::BUTTON1);
    assert_eq!((mouse[0].x, mouse[0].y), (4, 4));

    assert_eq!(mouse[1].state, MouseState::DragStart);
    assert_eq!(mouse[1].buttons, ButtonMask::BUTTON1);
    assert_eq!((mouse[1].x, mouse[1].y), (5, 4));

    assert_eq!(mouse[2].state, MouseState::DragStop);
    assert_eq!((mouse[2].x, mouse[2].y), (5, 4));
}

#[test]
fn sgr_modifiers_decode() {
    let mut dec = decoder();
    // btn 0 + shift(4) + ctrl(16) = 20.
    let evs = feed(&mut dec, b"\x1b[<20;1;1M");
    match &evs[0] {
        Event::Mouse(m) => {
            assert_eq!(m.mods, ModMask::SHIFT | ModMask::CTRL);
            assert_eq!(m.buttons, ButtonMask::BUTTON1);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn paste_brackets_frame_runes() {
    let mut dec = decoder();
    let evs = feed(&mut dec, b"\x1b[200~abc\x1b[201~");
    assert_eq!(evs.len(), 5);
    match &evs[0] {
        Event::Paste(p) => assert!(p.start),
        other => panic!("expected paste start, got {other:?}"),
    }
    for (i, expect) in ['a', 'b', 'c'].into_iter().enumerate() {
        match &evs[i + 1] {
            Event::Key(k) => {
                assert_eq!(k.key, Key::Rune);
                assert_eq!(k.rune, expect);
            }
            other => panic!("expected rune, got {other:?}"),
        }
    }
    match &evs[4] {
        Event::Paste(p) => assert!(!p.start),
        other => panic!("expected paste end, got {other:?}"),
    }
}

#[test]
fn paste_bracket_split_across_chunks() {
    let mut dec = decoder();
    assert!(feed(&mut dec, b"\x1b[20").is_empty());
    let evs = feed(&mut dec, b"0~x\x1b[201~");
    assert_eq!(evs.len(), 3);
    assert!(matches!(&evs[0], Event::Paste(p) if p.start));
    assert!(matches!(&evs[1], Event::Key(k) if k.rune == 'x'));
    assert!(matches!(&evs[2], Event::Paste(p) if !p.start));
}

#[test]
fn utf8_injection_round_trip() {
    let text = "héllo 語 🦀";
    let mut dec = decoder();
    let evs = feed(&mut dec, text.as_bytes());
    let decoded: String = evs
        .iter()
        .map(|e| match e {
            Event::Key(k) if k.key == Key::Rune => k.rune,
            other => panic!("expected rune key, got {other:?}"),
        })
        .collect();
    assert_eq!(decoded, text);
}

#[test]
fn interleaved_keys_and_mouse_preserve_order() {
    let mut dec = decoder();
    let evs = feed(&mut dec, b"a\x1b[<0;2;2Mb\x1b[<0;2;2m");
    assert!(matches!(&evs[0], Event::Key(k) if k.rune == 'a'));
    assert!(matches!(&evs[1], Event::Mouse(m) if m.state == MouseState::ButtonPress));
    assert!(matches!(&evs[2], Event::Key(k) if k.rune == 'b'));
    assert!(matches!(&evs[3], Event::Mouse(m) if m.state == MouseState::ButtonRelease));
}

#[test]
fn wheel_between_drags_keeps_drag_state() {
    let mut dec = decoder();
    let mut evs = feed(&mut dec, b"\x1b[<0;1;1M");
    evs.extend(feed(&mut dec, b"\x1b[<0;2;1M"));
    evs.extend(feed(&mut dec, b"\x1b[<64;2;1M"));
    evs.extend(feed(&mut dec, b"\x1b[<0;3;1M"));
    let states: Vec<_> = evs
        .iter()
        .filter_map(|e| match e {
            Event::Mouse(m) => Some(m.state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            MouseState::ButtonPress,
            MouseState::DragStart,
            MouseState::WheelImpulse,
            MouseState::DragMove,
        ]
    );
}
