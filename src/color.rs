// src/color.rs

//! Stable per-unit colors for log prefixes.
//!
//! A unit's color is picked from a fixed palette by its `color_index`, which
//! is its position in discovery order. The same unit therefore keeps the same
//! color for the whole process.

use colored::{Color, ColoredString, Colorize};

const PALETTE: [Color; 10] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::BrightCyan,
    Color::BrightMagenta,
    Color::BrightYellow,
    Color::BrightGreen,
    Color::BrightBlue,
];

/// Palette color for the given index (wraps around).
pub fn color_for(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

/// Paint a unit name with its palette color.
pub fn paint(name: &str, index: usize) -> ColoredString {
    name.color(color_for(index)).bold()
}

/// Turn colors off globally, e.g. for `--no-color` or non-tty output.
pub fn disable_colors() {
    colored::control::set_override(false);
}
