//! Color handling for routing badges.

use ratatui::style::Color;

/// Parse a `#rrggbb` hex string into a terminal color. Routing metadata
/// carries web-style hex colors; anything that does not parse falls back to
/// the default foreground rather than failing a render.
pub fn hex_color(hex: &str) -> Color {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return Color::Reset;
    }
    let parse = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16);
    match (parse(0..2), parse(2..4), parse(4..6)) {
        (Ok(r), Ok(g), Ok(b)) => Color::Rgb(r, g, b),
        _ => Color::Reset,
    }
}
