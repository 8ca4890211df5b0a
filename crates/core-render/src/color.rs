//! Terminal colors as a single integer encoding.
//!
//! Three disjoint encodings share one `u64`:
//! * the zero value is the ambient-default sentinel,
//! * `VALID | index` is a palette color,
//! * `VALID | IS_RGB | 0xRRGGBB` is a 24-bit color,
//! * `SPECIAL` marks the reset sentinel that asks the terminal to
//!   restore its own default foreground/background.
//!
//! Palette fitting uses CIE-Lab distance (sRGB, D65 white point) over
//! the active palette; plain RGB distance mispredicts on desaturated
//! colors.

const VALID: u64 = 1 << 32;
const IS_RGB: u64 = 1 << 33;
const SPECIAL: u64 = 1 << 40;

/// A color in one of the encodings described in the module docs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color(u64);

impl Color {
    /// Ambient-default sentinel: use the screen's style.
    pub const DEFAULT: Color = Color(0);
    /// Reset sentinel: restore the terminal's own default colors.
    pub const RESET: Color = Color(SPECIAL);

    pub const BLACK: Color = Color::palette(0);
    pub const MAROON: Color = Color::palette(1);
    pub const GREEN: Color = Color::palette(2);
    pub const OLIVE: Color = Color::palette(3);
    pub const NAVY: Color = Color::palette(4);
    pub const PURPLE: Color = Color::palette(5);
    pub const TEAL: Color = Color::palette(6);
    pub const SILVER: Color = Color::palette(7);
    pub const GRAY: Color = Color::palette(8);
    pub const RED: Color = Color::palette(9);
    pub const LIME: Color = Color::palette(10);
    pub const YELLOW: Color = Color::palette(11);
    pub const BLUE: Color = Color::palette(12);
    pub const FUCHSIA: Color = Color::palette(13);
    pub const AQUA: Color = Color::palette(14);
    pub const WHITE: Color = Color::palette(15);

    // W3C names outside the basic palette carry their RGB value.
    pub const PINK: Color = Color::rgb(0xFF, 0xC0, 0xCB);
    pub const ORANGE: Color = Color::rgb(0xFF, 0xA5, 0x00);
    pub const BROWN: Color = Color::rgb(0xA5, 0x2A, 0x2A);
    pub const GOLD: Color = Color::rgb(0xFF, 0xD7, 0x00);
    pub const SKYBLUE: Color = Color::rgb(0x87, 0xCE, 0xEB);
    pub const VIOLET: Color = Color::rgb(0xEE, 0x82, 0xEE);

    /// Palette color by index.
    pub const fn palette(index: u32) -> Color {
        Color(VALID | index as u64)
    }

    /// 24-bit color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color(VALID | IS_RGB | ((r as u64) << 16) | ((g as u64) << 8) | b as u64)
    }

    pub fn is_valid(&self) -> bool {
        self.0 & VALID != 0
    }

    pub fn is_rgb(&self) -> bool {
        self.0 & IS_RGB != 0
    }

    pub fn is_default(&self) -> bool {
        self.0 == 0
    }

    pub fn is_reset(&self) -> bool {
        self.0 & SPECIAL != 0
    }

    /// Palette index, when this is a palette color.
    pub fn index(&self) -> Option<u32> {
        if self.is_valid() && !self.is_rgb() {
            Some((self.0 & 0xFF_FFFF) as u32)
        } else {
            None
        }
    }

    /// Red/green/blue components. Palette indices below 256 resolve
    /// through the xterm palette; sentinels have no components.
    pub fn components(&self) -> Option<(u8, u8, u8)> {
        if !self.is_valid() {
            return None;
        }
        if self.is_rgb() {
            let v = self.0 & 0xFF_FFFF;
            return Some(((v >> 16) as u8, (v >> 8) as u8, v as u8));
        }
        match self.index() {
            Some(i) if i < 256 => Some(xterm_rgb(i as u8)),
            _ => None,
        }
    }
}

/// RGB value of an xterm 256-color palette entry.
///
/// 0..16 are the standard colors, 16..232 the 6x6x6 cube, 232..256 the
/// grayscale ramp.
pub(crate) fn xterm_rgb(i: u8) -> (u8, u8, u8) {
    const BASE: [(u8, u8, u8); 16] = [
        (0x00, 0x00, 0x00),
        (0x80, 0x00, 0x00),
        (0x00, 0x80, 0x00),
        (0x80, 0x80, 0x00),
        (0x00, 0x00, 0x80),
        (0x80, 0x00, 0x80),
        (0x00, 0x80, 0x80),
        (0xC0, 0xC0, 0xC0),
        (0x80, 0x80, 0x80),
        (0xFF, 0x00, 0x00),
        (0x00, 0xFF, 0x00),
        (0xFF, 0xFF, 0x00),
        (0x00, 0x00, 0xFF),
        (0xFF, 0x00, 0xFF),
        (0x00, 0xFF, 0xFF),
        (0xFF, 0xFF, 0xFF),
    ];
    const CUBE: [u8; 6] = [0, 95, 135, 175, 215, 255];
    match i {
        0..=15 => BASE[i as usize],
        16..=231 => {
            let v = i - 16;
            (
                CUBE[(v / 36) as usize],
                CUBE[((v / 6) % 6) as usize],
                CUBE[(v % 6) as usize],
            )
        }
        _ => {
            let g = 8 + 10 * (i - 232);
            (g, g, g)
        }
    }
}

/// The first `n` entries of the xterm palette, as palette colors.
pub fn standard_palette(n: usize) -> Vec<Color> {
    (0..n.min(256)).map(|i| Color::palette(i as u32)).collect()
}

/// Find the perceptually nearest palette entry for `color`.
///
/// Sentinels and colors with no resolvable components pass through
/// unchanged, as does anything when the palette is empty.
pub fn find_color(color: Color, palette: &[Color]) -> Color {
    let (r, g, b) = match color.components() {
        Some(c) => c,
        None => return color,
    };
    if palette.is_empty() {
        return color;
    }
    if let Some(exact) = palette.iter().find(|p| p.components() == Some((r, g, b))) {
        return *exact;
    }
    let target = lab(r, g, b);
    let mut best = palette[0];
    let mut best_d = f64::INFINITY;
    for p in palette {
        if let Some((pr, pg, pb)) = p.components() {
            let d = lab_distance(target, lab(pr, pg, pb));
            if d < best_d {
                best_d = d;
                best = *p;
            }
        }
    }
    best
}

fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB -> CIE-Lab under the D65 reference white.
fn lab(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let (rl, gl, bl) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));
    let x = 0.4124564 * rl + 0.3575761 * gl + 0.1804375 * bl;
    let y = 0.2126729 * rl + 0.7151522 * gl + 0.0721750 * bl;
    let z = 0.0193339 * rl + 0.1191920 * gl + 0.9503041 * bl;

    // D65 white point.
    let (xn, yn, zn) = (0.95047, 1.0, 1.08883);
    let f = |t: f64| {
        if t > 0.008856 {
            t.cbrt()
        } else {
            (903.3 * t + 16.0) / 116.0
        }
    };
    let (fx, fy, fz) = (f(x / xn), f(y / yn), f(z / zn));
    (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

fn lab_distance(a: (f64, f64, f64), b: (f64, f64, f64)) -> f64 {
    let (dl, da, db) = (a.0 - b.0, a.1 - b.1, a.2 - b.2);
    (dl * dl + da * da + db * db).sqrt()
}
