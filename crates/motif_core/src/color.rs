//! Color types and CSS color parsing

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a CSS color string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color `{0}`")]
pub struct ColorParseError(pub String);

/// RGBA color with f32 components (0.0 to 1.0)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create from u8 components (0-255)
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Create from hex value (0xRRGGBB or 0xRRGGBBAA)
    pub fn from_hex(hex: u32) -> Self {
        if hex > 0xFFFFFF {
            Self::from_rgba8(
                ((hex >> 24) & 0xFF) as u8,
                ((hex >> 16) & 0xFF) as u8,
                ((hex >> 8) & 0xFF) as u8,
                (hex & 0xFF) as u8,
            )
        } else {
            Self::from_rgba8(
                ((hex >> 16) & 0xFF) as u8,
                ((hex >> 8) & 0xFF) as u8,
                (hex & 0xFF) as u8,
                255,
            )
        }
    }

    /// Component-wise linear interpolation
    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Convert to u8 array [r, g, b, a], rounding and clamping each channel
    pub fn to_rgba8(&self) -> [u8; 4] {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }
}

impl fmt::Display for Color {
    /// Formats as `#rrggbb` when opaque, `rgba(r, g, b, a)` otherwise
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            let alpha = (self.a.clamp(0.0, 1.0) * 1000.0).round() / 1000.0;
            write!(f, "rgba({r}, {g}, {b}, {alpha})")
        }
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    /// Parses `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(...)` and `rgba(...)`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let err = || ColorParseError(input.to_string());

        if let Some(hex) = input.strip_prefix('#') {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(err());
            }
            let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
            return match hex.len() {
                3 => Ok(Color::from_rgba8(
                    nibble(0).map_err(|_| err())?,
                    nibble(1).map_err(|_| err())?,
                    nibble(2).map_err(|_| err())?,
                    255,
                )),
                4 => Ok(Color::from_rgba8(
                    nibble(0).map_err(|_| err())?,
                    nibble(1).map_err(|_| err())?,
                    nibble(2).map_err(|_| err())?,
                    nibble(3).map_err(|_| err())?,
                )),
                6 | 8 => u32::from_str_radix(hex, 16)
                    .map(|value| {
                        if hex.len() == 6 {
                            Color::from_hex(value)
                        } else {
                            Color::from_rgba8(
                                (value >> 24) as u8,
                                (value >> 16) as u8,
                                (value >> 8) as u8,
                                value as u8,
                            )
                        }
                    })
                    .map_err(|_| err()),
                _ => Err(err()),
            };
        }

        let lower = input.to_ascii_lowercase();
        let body = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(err)?;

        let parts: Vec<&str> = body
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(err());
        }

        let channel = |p: &str| -> Result<f32, ColorParseError> {
            if let Some(pct) = p.strip_suffix('%') {
                pct.parse::<f32>().map(|v| v / 100.0).map_err(|_| err())
            } else {
                p.parse::<f32>().map(|v| v / 255.0).map_err(|_| err())
            }
        };
        let alpha = match parts.get(3) {
            Some(p) => match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().map(|v| v / 100.0).map_err(|_| err())?,
                None => p.parse::<f32>().map_err(|_| err())?,
            },
            None => 1.0,
        };

        Ok(Color::new(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!("#f00".parse::<Color>().unwrap().to_rgba8(), [255, 0, 0, 255]);
        assert_eq!(
            "#00ff0080".parse::<Color>().unwrap().to_rgba8(),
            [0, 255, 0, 128]
        );
        assert_eq!(
            "#336699".parse::<Color>().unwrap().to_rgba8(),
            [0x33, 0x66, 0x99, 255]
        );
    }

    #[test]
    fn parses_functional_forms() {
        let c: Color = "rgba(255, 0, 0, 0.5)".parse().unwrap();
        assert_eq!(c.to_rgba8()[0], 255);
        assert!((c.a - 0.5).abs() < 1e-6);

        let c: Color = "rgb(0 128 255)".parse().unwrap();
        assert_eq!(c.to_rgba8(), [0, 128, 255, 255]);
    }

    #[test]
    fn rejects_garbage() {
        assert!("red-ish".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("rgb(1, 2)".parse::<Color>().is_err());
    }

    #[test]
    fn display_round_trips_opaque_colors() {
        let c: Color = "#ff8800".parse().unwrap();
        assert_eq!(c.to_string(), "#ff8800");
        assert_eq!(Color::new(1.0, 0.0, 0.0, 0.5).to_string(), "rgba(255, 0, 0, 0.5)");
    }

    #[test]
    fn lerp_midpoint() {
        let mid = Color::BLACK.lerp(&Color::WHITE, 0.5);
        assert_eq!(mid.to_rgba8(), [128, 128, 128, 255]);
    }
}
