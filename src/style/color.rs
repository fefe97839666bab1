use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Parse `#rrggbb` or `#rgb`, case-insensitive, with or without the leading `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        match digits.len() {
            6 => Some(Self {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
            }),
            3 => {
                // Each shorthand digit is repeated, so 0xf becomes 0xff.
                let short = |index: usize| channel(index..index + 1).map(|value| value * 17);
                Some(Self {
                    r: short(0)?,
                    g: short(1)?,
                    b: short(2)?,
                })
            }
            _ => None,
        }
    }
}

/// Renders as the decimal `r,g,b` string stored in the `fillRgb` property.
impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// The `fillRgb` value derived from a `fillColor`. Malformed colors fall back to white.
pub fn fill_rgb(hex: &str) -> String {
    match Rgb::from_hex(hex) {
        Some(rgb) => rgb.to_string(),
        None => {
            log::warn!("Could not parse color {:?}, using white", hex);
            Rgb::WHITE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{fill_rgb, Rgb};

    #[rstest]
    #[case("#ff0000", Some((255, 0, 0)))]
    #[case("#1a2B3c", Some((26, 43, 60)))]
    #[case("00ff7f", Some((0, 255, 127)))]
    #[case("#fA0", Some((255, 170, 0)))]
    #[case(" #000000 ", Some((0, 0, 0)))]
    #[case("#ff00", None)]
    #[case("#gg0000", None)]
    #[case("#ff00001", None)]
    #[case("", None)]
    #[case("red", None)]
    #[case("#+f0000", None)]
    fn test_from_hex(#[case] hex: &str, #[case] expected: Option<(u8, u8, u8)>) {
        assert_eq!(
            expected,
            Rgb::from_hex(hex).map(|rgb| (rgb.r, rgb.g, rgb.b))
        );
    }

    #[rstest]
    #[case("#ff8000", "255,128,0")]
    #[case("#abc", "170,187,204")]
    #[case("not a color", "255,255,255")]
    #[case("#12345", "255,255,255")]
    fn test_fill_rgb(#[case] hex: &str, #[case] expected: &str) {
        assert_eq!(expected, fill_rgb(hex));
    }
}
