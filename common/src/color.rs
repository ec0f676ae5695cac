use rgb::RGB8;
use thiserror::Error;

/// A color as the device sees it: three 8-bit channels.
pub type Color = RGB8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("empty color specification")]
    Empty,
    #[error("`{0}` has an unsupported number of hex digits")]
    Length(String),
    #[error("`{0}` contains a character that is not a hex digit")]
    Digit(String),
    #[error("unknown color name `{0}`")]
    UnknownName(String),
}

// Named colors accepted next to the hex forms. Lookup is case-insensitive.
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0x00, 0x00, 0x00]),
    ("silver", [0xc0, 0xc0, 0xc0]),
    ("gray", [0x80, 0x80, 0x80]),
    ("grey", [0x80, 0x80, 0x80]),
    ("white", [0xff, 0xff, 0xff]),
    ("maroon", [0x80, 0x00, 0x00]),
    ("red", [0xff, 0x00, 0x00]),
    ("purple", [0x80, 0x00, 0x80]),
    ("fuchsia", [0xff, 0x00, 0xff]),
    ("magenta", [0xff, 0x00, 0xff]),
    ("green", [0x00, 0x80, 0x00]),
    ("lime", [0x00, 0xff, 0x00]),
    ("olive", [0x80, 0x80, 0x00]),
    ("yellow", [0xff, 0xff, 0x00]),
    ("navy", [0x00, 0x00, 0x80]),
    ("blue", [0x00, 0x00, 0xff]),
    ("teal", [0x00, 0x80, 0x80]),
    ("aqua", [0x00, 0xff, 0xff]),
    ("cyan", [0x00, 0xff, 0xff]),
    ("orange", [0xff, 0xa5, 0x00]),
    ("gold", [0xff, 0xd7, 0x00]),
    ("pink", [0xff, 0xc0, 0xcb]),
    ("hotpink", [0xff, 0x69, 0xb4]),
    ("brown", [0xa5, 0x2a, 0x2a]),
    ("coral", [0xff, 0x7f, 0x50]),
    ("crimson", [0xdc, 0x14, 0x3c]),
    ("indigo", [0x4b, 0x00, 0x82]),
    ("violet", [0xee, 0x82, 0xee]),
    ("turquoise", [0x40, 0xe0, 0xd0]),
    ("skyblue", [0x87, 0xce, 0xeb]),
    ("warmwhite", [0xff, 0xf4, 0xe5]),
];

/// Parse a color specification.
///
/// Accepts `#rgb`, `#rrggbb`, `#aarrggbb` (the alpha byte is dropped),
/// `#rrrgggbbb` and `#rrrrggggbbbb` (only the high byte of each channel is
/// kept), or one of the known color names.
pub fn parse_color(spec: &str) -> Result<Color, ColorParseError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(ColorParseError::Empty);
    }

    let Some(digits) = spec.strip_prefix('#') else {
        let lowered = spec.to_ascii_lowercase();
        return NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lowered)
            .map(|(_, [r, g, b])| Color::new(*r, *g, *b))
            .ok_or_else(|| ColorParseError::UnknownName(spec.to_string()));
    };

    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ColorParseError::Digit(spec.to_string()));
    }

    // Width of a channel in hex digits, and how far to shift it down to 8 bits
    let (offset, width, shift) = match digits.len() {
        3 => (0, 1, 0),
        6 => (0, 2, 0),
        8 => (2, 2, 0),
        9 => (0, 3, 4),
        12 => (0, 4, 8),
        _ => return Err(ColorParseError::Length(spec.to_string())),
    };

    let channel = |index: usize| -> Result<u8, ColorParseError> {
        let start = offset + index * width;
        let value = u16::from_str_radix(&digits[start..start + width], 16)
            .map_err(|_| ColorParseError::Digit(spec.to_string()))?;
        Ok(match width {
            1 => (value * 0x11) as u8,
            _ => (value >> shift) as u8,
        })
    };

    Ok(Color::new(channel(0)?, channel(1)?, channel(2)?))
}

/// Canonical text of a color: lowercase `#rrggbb`.
pub fn color_name(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}
