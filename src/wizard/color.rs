// ABOUTME: Hex color normalization for alert colors
// Accepts "f0a", "#F0A", " ff00aa " and friends; produces "#FF00AA"

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    /// Canonical form: one '#' and six uppercase hex digits
    static ref HEX_COLOR_REGEX: Regex = Regex::new(r"^#[0-9A-F]{6}$").unwrap();
}

/// Normalized `#RRGGBB` color, uppercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HexColor(String);

impl HexColor {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Red, green and blue components
    pub fn rgb(&self) -> (u8, u8, u8) {
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&self.0[range], 16).unwrap_or_default()
        };
        (channel(1..3), channel(3..5), channel(5..7))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize operator input into a `HexColor`.
///
/// Trims, drops one leading `#`, doubles each digit of a 3-digit shorthand and
/// uppercases. Returns `None` for anything that is not 6 hex digits afterwards.
pub fn normalize(input: &str) -> Option<HexColor> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

    let expanded: String = if digits.chars().count() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };

    let candidate = format!("#{}", expanded.to_ascii_uppercase());
    HEX_COLOR_REGEX
        .is_match(&candidate)
        .then_some(HexColor(candidate))
}

/// True when `input` normalizes to a canonical `#RRGGBB` color
pub fn is_valid(input: &str) -> bool {
    normalize(input).is_some()
}

/// Normalized form for display; empty when the input is not a color
pub fn display(input: &str) -> String {
    normalize(input).map(|c| c.to_string()).unwrap_or_default()
}
