//! Style triples and SGR escape emission.
//!
//! A style is (foreground, background, attributes). Emission composes one
//! truecolor SGR sequence per style change; adjacent cells sharing the
//! composed style emit nothing. Every sequence starts from a reset so the
//! attribute set never leaks between runs.

use std::fmt::Write;

use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }

    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);

    /// WCAG 2.1 relative luminance.
    pub fn luminance(self) -> f64 {
        fn channel(v: u8) -> f64 {
            let s = v as f64 / 255.0;
            if s <= 0.03928 {
                s / 12.92
            } else {
                ((s + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * channel(self.r) + 0.7152 * channel(self.g) + 0.0722 * channel(self.b)
    }
}

/// WCAG 2.1 contrast ratio, in `[1, 21]`.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (a.luminance(), b.luminance());
    let (hi, lo) = if la > lb { (la, lb) } else { (lb, la) };
    (hi + 0.05) / (lo + 0.05)
}

/// Minimum contrast the theme engine guarantees.
pub const CONTRAST_MIN: f64 = 4.5;

/// Push `fg` toward white (dark backgrounds) or black (light ones) by
/// halving the channel distance per step. Bounded; falls back to pure
/// white or black when the ramp cannot reach the target ratio.
pub fn ensure_contrast(fg: Rgb, bg: Rgb) -> Rgb {
    if contrast_ratio(fg, bg) >= CONTRAST_MIN {
        return fg;
    }
    let target = if bg.luminance() < 0.5 {
        Rgb::WHITE
    } else {
        Rgb::BLACK
    };
    let mut cur = fg;
    for _ in 0..8 {
        cur = Rgb::new(
            half_toward(cur.r, target.r),
            half_toward(cur.g, target.g),
            half_toward(cur.b, target.b),
        );
        if contrast_ratio(cur, bg) >= CONTRAST_MIN {
            return cur;
        }
    }
    target
}

fn half_toward(from: u8, to: u8) -> u8 {
    let delta = (to as i16 - from as i16) / 2;
    (from as i16 + delta) as u8
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attr: u16 {
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const REVERSE = 1 << 4;
        const STRIKE = 1 << 5;
        const CURLY = 1 << 6;
        const OVERLINE = 1 << 7;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub fg: Rgb,
    pub bg: Option<Rgb>,
    pub attr: Attr,
}

impl Style {
    pub const fn plain(fg: Rgb) -> Style {
        Style {
            fg,
            bg: None,
            attr: Attr::empty(),
        }
    }

    pub const fn with_attr(fg: Rgb, attr: Attr) -> Style {
        Style {
            fg,
            bg: None,
            attr,
        }
    }

    pub fn on(mut self, bg: Rgb) -> Style {
        self.bg = Some(bg);
        self
    }
}

/// Append the SGR sequence switching from `prev` to `style`; nothing is
/// emitted when the composed style is unchanged.
pub fn write_style(out: &mut String, style: &Style, prev: Option<&Style>) {
    if prev == Some(style) {
        return;
    }
    out.push_str("\x1b[0");
    if style.attr.contains(Attr::BOLD) {
        out.push_str(";1");
    }
    if style.attr.contains(Attr::DIM) {
        out.push_str(";2");
    }
    if style.attr.contains(Attr::ITALIC) {
        out.push_str(";3");
    }
    if style.attr.contains(Attr::UNDERLINE) {
        out.push_str(";4");
    }
    if style.attr.contains(Attr::CURLY) {
        out.push_str(";4:3");
    }
    if style.attr.contains(Attr::REVERSE) {
        out.push_str(";7");
    }
    if style.attr.contains(Attr::STRIKE) {
        out.push_str(";9");
    }
    if style.attr.contains(Attr::OVERLINE) {
        out.push_str(";53");
    }
    let _ = write!(out, ";38;2;{};{};{}", style.fg.r, style.fg.g, style.fg.b);
    if let Some(bg) = style.bg {
        let _ = write!(out, ";48;2;{};{};{}", bg.r, bg.g, bg.b);
    }
    out.push('m');
}
