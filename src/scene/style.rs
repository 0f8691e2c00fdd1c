//! Polymorphic style values: fills, borders, effects, colors.
//!
//! Each style archives under its own element tag (resolved through the
//! class registry on read), nested inside the owning node's element.

use std::fmt;
use std::str::FromStr;

/// An RGBA color with components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Color {
        Color { r, g, b, a }
    }

    /// Hex form, `#rrggbb` or `#rrggbbaa` when not fully opaque. This is
    /// what the archive writer emits.
    pub fn to_hex(&self) -> String {
        let c = |v: f64| ((v.clamp(0.0, 1.0) * 255.0).round()) as u8;
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                c(self.r),
                c(self.g),
                c(self.b),
                c(self.a)
            )
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ();

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and a handful of color names
    /// written by old documents.
    fn from_str(s: &str) -> Result<Color, ()> {
        if let Some(hex) = s.strip_prefix('#') {
            let byte = |s: &str| u8::from_str_radix(s, 16).map_err(|_| ());
            let f = |v: u8| v as f64 / 255.0;
            return match hex.len() {
                3 => {
                    let nib = |s: &str| byte(s).map(|v| v * 17);
                    Ok(Color::rgb(
                        f(nib(&hex[0..1])?),
                        f(nib(&hex[1..2])?),
                        f(nib(&hex[2..3])?),
                    ))
                }
                6 => Ok(Color::rgb(
                    f(byte(&hex[0..2])?),
                    f(byte(&hex[2..4])?),
                    f(byte(&hex[4..6])?),
                )),
                8 => Ok(Color::rgba(
                    f(byte(&hex[0..2])?),
                    f(byte(&hex[2..4])?),
                    f(byte(&hex[4..6])?),
                    f(byte(&hex[6..8])?),
                )),
                _ => Err(()),
            };
        }
        match s {
            "black" => Ok(Color::BLACK),
            "white" => Ok(Color::WHITE),
            "red" => Ok(Color::rgb(1.0, 0.0, 0.0)),
            "green" => Ok(Color::rgb(0.0, 0.5, 0.0)),
            "blue" => Ok(Color::rgb(0.0, 0.0, 1.0)),
            "yellow" => Ok(Color::rgb(1.0, 1.0, 0.0)),
            "gray" | "grey" => Ok(Color::rgb(0.5, 0.5, 0.5)),
            "clear" => Ok(Color::rgba(0.0, 0.0, 0.0, 0.0)),
            _ => Err(()),
        }
    }
}

/// Paint for a node's interior.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Color),
    /// Axis gradient from `start` to `end`, rotated by `roll` degrees.
    Gradient {
        start: Color,
        end: Color,
        roll: f64,
    },
    /// Paints an archived resource (by generated name) into the bounds.
    Image {
        resource: String,
        tiled: bool,
    },
}

impl Fill {
    /// The element tag this fill archives under.
    pub fn tag(&self) -> &'static str {
        match self {
            Fill::Solid(_) => "fill",
            Fill::Gradient { .. } => "gradient-fill",
            Fill::Image { .. } => "image-fill",
        }
    }
}

/// Stroke around a node's path.
#[derive(Debug, Clone, PartialEq)]
pub struct Border {
    pub color: Color,
    pub width: f64,
    /// Dash pattern in points; `None` paints a solid stroke.
    pub dash: Option<Vec<f64>>,
}

impl Default for Border {
    fn default() -> Self {
        Border {
            color: Color::BLACK,
            width: 1.0,
            dash: None,
        }
    }
}

/// Post-processing filter applied after a node paints itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Shadow {
        radius: f64,
        dx: f64,
        dy: f64,
        color: Color,
    },
    Emboss {
        altitude: f64,
        azimuth: f64,
        radius: f64,
    },
}

impl Effect {
    /// The element tag this effect archives under.
    pub fn tag(&self) -> &'static str {
        match self {
            Effect::Shadow { .. } => "shadow-effect",
            Effect::Emboss { .. } => "emboss-effect",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let c = Color::rgb(1.0, 0.5, 0.0);
        let back: Color = c.to_hex().parse().unwrap();
        assert!((back.r - 1.0).abs() < 0.01);
        assert!((back.g - 0.5).abs() < 0.01);
        assert!((back.b - 0.0).abs() < 0.01);
        assert_eq!(back.a, 1.0);
    }

    #[test]
    fn hex_with_alpha() {
        let c = Color::rgba(0.0, 0.0, 0.0, 0.5);
        let hex = c.to_hex();
        assert_eq!(hex.len(), 9);
        let back: Color = hex.parse().unwrap();
        assert!((back.a - 0.5).abs() < 0.01);
    }

    #[test]
    fn named_and_short_forms_parse() {
        assert_eq!("red".parse::<Color>().unwrap(), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert!("mauve-ish".parse::<Color>().is_err());
    }
}
