//! Annotation colors.

/// Color for features nothing else resolves a color for
pub const FALLBACK_COLOR: &str = "#FF5722";

/// Color for a matched level style that declares none
pub const LEVEL_DEFAULT_COLOR: &str = "#FF0000";

/// Class-name keywords (lowercase substrings) and their colors, first match wins.
const KEYWORD_COLORS: &[(&str, &str)] = &[
    ("villosit", "#8BC34A"),
    ("villous", "#8BC34A"),
    ("vaisseau", "#00BCD4"),
    ("vessel", "#00BCD4"),
    ("calcif", "#FF9800"),
    ("fibrin", "#795548"),
    ("infarct", "#F44336"),
];

/// Built-in color for a class name, matched case-insensitively by substring.
pub fn keyword_color(class_name: &str) -> Option<&'static str> {
    let lower = class_name.to_lowercase();
    KEYWORD_COLORS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|&(_, color)| color)
}

/// Parse `#RRGGBB` (the `#` is optional).
pub fn parse_hex(s: &str) -> Option<[u8; 3]> {
    let hex = s.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Parse a color, falling back to [`FALLBACK_COLOR`] when invalid.
pub fn parse_or_fallback(s: &str) -> [u8; 3] {
    parse_hex(s).unwrap_or([0xFF, 0x57, 0x22])
}
