//! Escape-sequence key tables derived from a capability record.
//!
//! Each terminfo key sequence is expanded with the xterm modifier
//! suffixes `;2`..`;16`, so `ESC [ 1 ; 5 A` decodes as Ctrl+Up without
//! a dedicated capability. Patterns are kept longest-first so a
//! complete match is always the longest one the buffer supports.

use core_events::{Key, ModMask};
use core_terminfo::Terminfo;

#[derive(Debug, Clone)]
pub(crate) struct KeyPattern {
    pub bytes: Vec<u8>,
    pub key: Key,
    pub mods: ModMask,
}

/// Modifier set encoded by an xterm `;N` suffix.
pub(crate) fn xterm_mods(code: u8) -> ModMask {
    let bits = code.saturating_sub(1);
    let mut mods = ModMask::empty();
    if bits & 1 != 0 {
        mods |= ModMask::SHIFT;
    }
    if bits & 2 != 0 {
        mods |= ModMask::ALT;
    }
    if bits & 4 != 0 {
        mods |= ModMask::CTRL;
    }
    if bits & 8 != 0 {
        mods |= ModMask::META;
    }
    mods
}

pub(crate) fn build(ti: &Terminfo) -> Vec<KeyPattern> {
    let mut map = Vec::new();
    for &(key, seq) in ti.keys {
        let bytes = seq.as_bytes();
        map.push(KeyPattern {
            bytes: bytes.to_vec(),
            key,
            mods: ModMask::empty(),
        });
        for code in 2..=16u8 {
            if let Some(variant) = modifier_variant(bytes, code) {
                map.push(KeyPattern {
                    bytes: variant,
                    key,
                    mods: xterm_mods(code),
                });
            }
        }
    }
    map.sort_by(|a, b| b.bytes.len().cmp(&a.bytes.len()));
    map
}

/// Build the `;N`-modified form of an xterm-style sequence, or `None`
/// for sequences xterm never modifies (e.g. the linux console's
/// `ESC [ [ A` function keys).
fn modifier_variant(seq: &[u8], code: u8) -> Option<Vec<u8>> {
    if seq.len() < 3 || seq[0] != 0x1b {
        return None;
    }
    match (seq[1], seq[2]) {
        (b'[', b'[') => None,
        // SS3 forms and bare CSI finals both modify as CSI 1;N final.
        (b'O', _) | (b'[', _) if seq.len() == 3 => {
            let mut v = format!("\x1b[1;{code}").into_bytes();
            v.push(seq[2]);
            Some(v)
        }
        (b'[', _) if *seq.last().unwrap() == b'~' => {
            let mut v = seq[..seq.len() - 1].to_vec();
            v.extend_from_slice(format!(";{code}~").as_bytes());
            Some(v)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_terminfo::lookup;

    fn find<'a>(map: &'a [KeyPattern], bytes: &[u8]) -> Option<&'a KeyPattern> {
        map.iter().find(|p| p.bytes == bytes)
    }

    #[test]
    fn modifier_codes_decode() {
        assert_eq!(xterm_mods(2), ModMask::SHIFT);
        assert_eq!(xterm_mods(5), ModMask::CTRL);
        assert_eq!(xterm_mods(8), ModMask::SHIFT | ModMask::ALT | ModMask::CTRL);
        assert_eq!(
            xterm_mods(16),
            ModMask::SHIFT | ModMask::ALT | ModMask::CTRL | ModMask::META
        );
    }

    #[test]
    fn ss3_and_csi_arrows_gain_variants() {
        let map = build(lookup("xterm").unwrap());
        let up = find(&map, b"\x1b[1;5A").expect("ctrl-up variant");
        assert_eq!(up.key, Key::Up);
        assert_eq!(up.mods, ModMask::CTRL);
    }

    #[test]
    fn tilde_sequences_insert_before_terminator() {
        let map = build(lookup("xterm").unwrap());
        let del = find(&map, b"\x1b[3;2~").expect("shift-delete variant");
        assert_eq!(del.key, Key::Delete);
        assert_eq!(del.mods, ModMask::SHIFT);
    }

    #[test]
    fn patterns_sorted_longest_first() {
        let map = build(lookup("xterm").unwrap());
        for pair in map.windows(2) {
            assert!(pair[0].bytes.len() >= pair[1].bytes.len());
        }
    }

    #[test]
    fn linux_bracket_keys_are_not_modified() {
        let map = build(lookup("linux").unwrap());
        assert!(find(&map, b"\x1b[[A").is_some());
        assert!(map
            .iter()
            .all(|p| !(p.bytes.starts_with(b"\x1b[[") && !p.mods.is_empty())));
    }
}
