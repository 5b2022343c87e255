use crate::{Result, VisualiserError};

/// 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Packs into `0x00RRGGBB`, dropping alpha.
    pub fn to_u32(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    pub fn from_u32(packed: u32) -> Self {
        Self::opaque((packed >> 16) as u8, (packed >> 8) as u8, packed as u8)
    }

    /// Linear interpolation, `t` in `0..=1`.
    pub fn lerp(self, other: Rgba, t: f64) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| ((1.0 - t) * f64::from(a) + t * f64::from(b)).round() as u8;
        Rgba::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Source-over composite of `self` onto an opaque `dst`.
    pub fn over(self, dst: Rgba) -> Rgba {
        match self.a {
            255 => self,
            0 => dst,
            a => {
                let t = f64::from(a) / 255.0;
                let mixed = dst.lerp(Rgba::opaque(self.r, self.g, self.b), t);
                Rgba::opaque(mixed.r, mixed.g, mixed.b)
            }
        }
    }

    /// Perceived brightness in `0..=1`.
    pub fn luminance(self) -> f64 {
        (0.2126 * f64::from(self.r) + 0.7152 * f64::from(self.g) + 0.0722 * f64::from(self.b))
            / 255.0
    }
}

const NAMED: &[(&str, Rgba)] = &[
    ("black", Rgba::opaque(0, 0, 0)),
    ("white", Rgba::opaque(255, 255, 255)),
    ("red", Rgba::opaque(255, 0, 0)),
    ("lime", Rgba::opaque(0, 255, 0)),
    ("green", Rgba::opaque(0, 128, 0)),
    ("blue", Rgba::opaque(0, 0, 255)),
    ("yellow", Rgba::opaque(255, 255, 0)),
    ("gold", Rgba::opaque(255, 215, 0)),
    ("orange", Rgba::opaque(255, 165, 0)),
    ("purple", Rgba::opaque(128, 0, 128)),
    ("magenta", Rgba::opaque(255, 0, 255)),
    ("cyan", Rgba::opaque(0, 255, 255)),
    ("navy", Rgba::opaque(0, 0, 128)),
    ("teal", Rgba::opaque(0, 128, 128)),
    ("gray", Rgba::opaque(128, 128, 128)),
    ("grey", Rgba::opaque(128, 128, 128)),
    ("silver", Rgba::opaque(192, 192, 192)),
    ("transparent", Rgba::TRANSPARENT),
];

/// Parses the CSS colour forms hosts commonly report: `#rgb`, `#rrggbb`,
/// `#rrggbbaa`, `rgb()`, `rgba()` and a handful of named colours.
pub fn parse_color(input: &str) -> Result<Rgba> {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();
    let invalid = || VisualiserError::InvalidColor(trimmed.to_string());

    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(invalid);
    }

    if let Some(body) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_functional(body).ok_or_else(invalid);
    }

    NAMED
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, color)| *color)
        .ok_or_else(invalid)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let nibble = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => {
            let r = nibble(bytes[0])?;
            let g = nibble(bytes[1])?;
            let b = nibble(bytes[2])?;
            Some(Rgba::opaque(r * 17, g * 17, b * 17))
        }
        6 | 8 => {
            let pair = |i: usize| Some(nibble(bytes[i])? * 16 + nibble(bytes[i + 1])?);
            let alpha = if bytes.len() == 8 { pair(6)? } else { 255 };
            Some(Rgba::new(pair(0)?, pair(2)?, pair(4)?, alpha))
        }
        _ => None,
    }
}

fn parse_functional(body: &str) -> Option<Rgba> {
    let parts: Vec<&str> = body
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();

    if !(parts.len() == 3 || parts.len() == 4) {
        return None;
    }

    let channel = |part: &str| -> Option<u8> {
        let value: f64 = part.parse().ok()?;
        Some(value.clamp(0.0, 255.0).round() as u8)
    };
    let alpha = match parts.get(3) {
        Some(part) => {
            let value: f64 = part.parse().ok()?;
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        None => 255,
    };

    Some(Rgba::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}
