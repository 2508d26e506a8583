//! Hex colour values as they appear in `.tmTheme` files and Vim scripts.

use std::fmt;

/// An sRGB colour with an optional alpha channel.
///
/// TextMate themes write colours as `#RRGGBB` or `#RRGGBBAA`; the alpha
/// channel never takes part in palette matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: Option<u8>,
}

impl HexColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: None }
    }

    /// Parse `#rrggbb`, `#rrggbbaa`, or the same without the leading `#`.
    ///
    /// Surrounding whitespace is ignored, anything else returns `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix('#').unwrap_or(s);
        if !s.is_ascii() || (s.len() != 6 && s.len() != 8) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        let a = if s.len() == 8 { Some(byte(6)?) } else { None };
        Some(Self {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a,
        })
    }

    /// Lowercase `#rrggbb`, the key used for palette lookups.
    pub fn rgb_key(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Euclidean distance in RGB space.
    pub fn distance(self, other: HexColor) -> f64 {
        let dr = f64::from(self.r) - f64::from(other.r);
        let dg = f64::from(self.g) - f64::from(other.g);
        let db = f64::from(self.b) - f64::from(other.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if let Some(a) = self.a {
            write!(f, "{a:02x}")?;
        }
        Ok(())
    }
}

/// Replace the RGB part of a colour string.
///
/// An alpha suffix on `original` wins over one on `replacement`; if
/// `original` has none, `replacement` is used whole, alpha included.
/// `replacement` is written as-is so palette spelling (case included)
/// survives into the output.
pub fn splice_rgb(original: &str, replacement: &str) -> String {
    let digits = original.trim().trim_start_matches('#');
    let replacement = replacement.trim();
    if digits.len() == 8 {
        let rgb = &replacement[..replacement.len().min(7)];
        format!("{rgb}{}", &digits[6..])
    } else {
        replacement.to_string()
    }
}
