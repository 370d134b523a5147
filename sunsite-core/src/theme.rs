use std::{fmt, str::FromStr};

use percent_encoding::utf8_percent_encode;
use serde::{Deserialize, Deserializer, Serialize};

use crate::site::URL_SEGMENT;

const LIGHTEN_AMOUNT: f64 = 0.2;
const DARKEN_AMOUNT: f64 = 0.2;
const VERY_LIGHT_AMOUNT: f64 = 0.8;

const FONT_FALLBACKS: &str =
    "-apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif";
const BOX_SHADOW: &str = "0 4px 6px rgba(0, 0, 0, 0.1)";

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("invalid accent color '{0}': expected #rrggbb")]
    InvalidColor(String),
}

/// Corner rounding preset. Anything unrecognised falls back to `Medium`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(into = "String")]
pub enum Roundness {
    None,
    Small,
    #[default]
    Medium,
    Large,
}

impl Roundness {
    pub fn border_radius(self) -> &'static str {
        match self {
            Roundness::None => "0",
            Roundness::Small => "4px",
            Roundness::Medium => "8px",
            Roundness::Large => "16px",
        }
    }
}

impl From<&str> for Roundness {
    fn from(value: &str) -> Self {
        match value {
            "none" => Roundness::None,
            "small" => Roundness::Small,
            "large" => Roundness::Large,
            _ => Roundness::Medium,
        }
    }
}

// Any value that is not one of the preset names, strings or not, means `Medium`.
impl<'de> Deserialize<'de> for Roundness {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Roundness::from).unwrap_or_default())
    }
}

impl From<Roundness> for String {
    fn from(value: Roundness) -> Self {
        match value {
            Roundness::None => "none",
            Roundness::Small => "small",
            Roundness::Medium => "medium",
            Roundness::Large => "large",
        }
        .to_string()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub accent_color: String,
    pub font: String,
    pub roundness: Roundness,
    pub shadows: bool,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            accent_color: "#3498db".into(),
            font: "Inter".into(),
            roundness: Roundness::Medium,
            shadows: true,
        }
    }
}

/// An RGB colour parsed from a `#rrggbb` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl FromStr for Rgb {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ThemeError::InvalidColor(s.to_string());

        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Rgb {
    /// Mix each channel `amount` of the way toward white.
    pub fn lighten(self, amount: f64) -> Self {
        let mix = |c: u8| {
            let c = f64::from(c);
            (c + (255.0 - c) * amount).round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: mix(self.r),
            g: mix(self.g),
            b: mix(self.b),
        }
    }

    /// Scale each channel by `1 - amount`, rounding down.
    pub fn darken(self, amount: f64) -> Self {
        let scale = |c: u8| (f64::from(c) * (1.0 - amount)).floor().clamp(0.0, 255.0) as u8;
        Rgb {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }
}

/// Presentation artifacts handed to the templates as `theme`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ResolvedTheme {
    pub css_variables: String,
    pub google_fonts_url: String,
}

impl ThemeConfig {
    pub fn resolve(&self) -> Result<ResolvedTheme, ThemeError> {
        Ok(ResolvedTheme {
            css_variables: self.css_variables()?,
            google_fonts_url: self.google_fonts_url(),
        })
    }

    /// CSS custom property declarations, one per line, for a `:root` block.
    pub fn css_variables(&self) -> Result<String, ThemeError> {
        let accent: Rgb = self.accent_color.parse()?;
        let shadow = if self.shadows { BOX_SHADOW } else { "none" };

        let variables = [
            format!("--accent-color: {};", self.accent_color),
            format!("--accent-color-light: {};", accent.lighten(LIGHTEN_AMOUNT)),
            format!("--accent-color-dark: {};", accent.darken(DARKEN_AMOUNT)),
            format!(
                "--accent-color-very-light: {};",
                accent.lighten(VERY_LIGHT_AMOUNT)
            ),
            format!("--primary-font: '{}', {};", self.font, FONT_FALLBACKS),
            format!("--border-radius: {};", self.roundness.border_radius()),
            format!("--box-shadow: {};", shadow),
        ];

        Ok(variables.join("\n  "))
    }

    /// Stylesheet URL for the configured web font. Never fetched here.
    pub fn google_fonts_url(&self) -> String {
        format!(
            "https://fonts.googleapis.com/css2?family={}:wght@400;500;700&display=swap",
            self.font
                .split(' ')
                .map(|word| utf8_percent_encode(word, URL_SEGMENT).to_string())
                .collect::<Vec<_>>()
                .join("+")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(s: &str) -> Rgb {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display_color() {
        let c = rgb("#3498DB");
        assert_eq!(c, Rgb { r: 0x34, g: 0x98, b: 0xdb });
        assert_eq!(c.to_string(), "#3498db");
    }

    #[test]
    fn test_malformed_colors_are_rejected() {
        for bad in ["3498db", "#3498d", "#3498dbff", "#zz98db", "", "#é498d"] {
            assert!(bad.parse::<Rgb>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_lighten_and_darken_accent() {
        let c = rgb("#3498db");
        assert_eq!(c.lighten(0.2).to_string(), "#5dade2");
        assert_eq!(c.darken(0.2).to_string(), "#2979af");
        assert_eq!(c.lighten(0.8).to_string(), "#d6eaf8");
    }

    #[test]
    fn test_zero_amount_is_identity() {
        for s in ["#000000", "#ffffff", "#3498db", "#010203"] {
            let c = rgb(s);
            assert_eq!(c.lighten(0.0), c);
            assert_eq!(c.darken(0.0), c);
        }
    }

    #[test]
    fn test_full_amount_saturates() {
        for s in ["#000000", "#ffffff", "#3498db"] {
            let c = rgb(s);
            assert_eq!(c.lighten(1.0).to_string(), "#ffffff");
            assert_eq!(c.darken(1.0).to_string(), "#000000");
        }
    }

    #[test]
    fn test_black_without_shadows() {
        let theme = ThemeConfig {
            accent_color: "#000000".into(),
            shadows: false,
            ..ThemeConfig::default()
        };
        let css = theme.css_variables().unwrap();
        assert!(css.contains("--box-shadow: none;"));
        assert!(css.contains("--accent-color-dark: #000000;"));
    }

    #[test]
    fn test_default_css_variables() {
        let css = ThemeConfig::default().css_variables().unwrap();
        let lines: Vec<&str> = css.split("\n  ").collect();
        assert_eq!(
            lines,
            vec![
                "--accent-color: #3498db;",
                "--accent-color-light: #5dade2;",
                "--accent-color-dark: #2979af;",
                "--accent-color-very-light: #d6eaf8;",
                "--primary-font: 'Inter', -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif;",
                "--border-radius: 8px;",
                "--box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);",
            ]
        );
    }

    #[test]
    fn test_invalid_accent_is_an_error() {
        let theme = ThemeConfig {
            accent_color: "blue".into(),
            ..ThemeConfig::default()
        };
        assert!(matches!(theme.resolve(), Err(ThemeError::InvalidColor(c)) if c == "blue"));
    }

    #[test]
    fn test_roundness_lookup_and_fallback() {
        let parse = |s: &str| Roundness::from(s).border_radius();
        assert_eq!(parse("none"), "0");
        assert_eq!(parse("small"), "4px");
        assert_eq!(parse("medium"), "8px");
        assert_eq!(parse("large"), "16px");
        assert_eq!(parse("huge"), "8px");
    }

    #[test]
    fn test_partial_theme_keeps_defaults() {
        let theme: ThemeConfig = serde_yaml::from_str("font: Open Sans\nroundness: pill\n").unwrap();
        assert_eq!(theme.font, "Open Sans");
        assert_eq!(theme.roundness, Roundness::Medium);
        assert_eq!(theme.accent_color, "#3498db");
        assert!(theme.shadows);
    }

    #[test]
    fn test_non_string_roundness_falls_back() {
        for yaml in ["roundness: 3\n", "roundness: ~\n", "roundness: [small]\n"] {
            let theme: ThemeConfig = serde_yaml::from_str(yaml).unwrap();
            assert_eq!(theme.roundness, Roundness::Medium, "{yaml}");
        }

        let theme: ThemeConfig = toml::from_str("roundness = 3\n").unwrap();
        assert_eq!(theme.roundness, Roundness::Medium);
        let theme: ThemeConfig = toml::from_str("roundness = \"large\"\n").unwrap();
        assert_eq!(theme.roundness, Roundness::Large);
    }

    #[test]
    fn test_google_fonts_url_escapes_font_name() {
        let theme = ThemeConfig {
            font: "Evil\" onload=\"x".into(),
            ..ThemeConfig::default()
        };
        let url = theme.google_fonts_url();
        assert!(!url.contains('"'));
        assert!(url.contains("family=Evil%22+onload%3D%22x:"));
    }

    #[test]
    fn test_google_fonts_url() {
        let theme = ThemeConfig {
            font: "Open Sans".into(),
            ..ThemeConfig::default()
        };
        assert_eq!(
            theme.google_fonts_url(),
            "https://fonts.googleapis.com/css2?family=Open+Sans:wght@400;500;700&display=swap"
        );
    }
}
