//! Light/dark theme and the colour palettes each one renders with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// UI theme. Always one of the two variants; there is no "unset" theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Colours used by the page shell for a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg_primary: &'static str,
    pub bg_secondary: &'static str,
    pub text_primary: &'static str,
    pub text_secondary: &'static str,
    pub border: &'static str,
}

const LIGHT_PALETTE: Palette = Palette {
    bg_primary: "#f0f2f5",
    bg_secondary: "#ffffff",
    text_primary: "#000000",
    text_secondary: "#666666",
    border: "#e8e8e8",
};

const DARK_PALETTE: Palette = Palette {
    bg_primary: "#0d1117",
    bg_secondary: "#161b22",
    text_primary: "#ffffff",
    text_secondary: "#a6a6a6",
    border: "#30363d",
};

impl Theme {
    /// The storage/wire representation (`"light"` or `"dark"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// The opposite theme.
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Parse an exact `"light"` / `"dark"` value. Anything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// Palette for this theme.
    pub const fn palette(self) -> Palette {
        match self {
            Self::Light => LIGHT_PALETTE,
            Self::Dark => DARK_PALETTE,
        }
    }

    /// Human label shown in the settings card.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidTheme(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_light() {
        assert_eq!(Theme::default(), Theme::Light);
    }

    #[test]
    fn toggled_is_an_involution() {
        for theme in [Theme::Light, Theme::Dark] {
            assert_ne!(theme.toggled(), theme);
            assert_eq!(theme.toggled().toggled(), theme);
        }
    }

    #[test]
    fn parse_accepts_only_exact_values() {
        assert_eq!(Theme::parse("light"), Some(Theme::Light));
        assert_eq!(Theme::parse("dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("Dark"), None);
        assert_eq!(Theme::parse(" dark"), None);
        assert_eq!(Theme::parse("purple"), None);
        assert_eq!(Theme::parse(""), None);
    }

    #[test]
    fn from_str_reports_invalid_value() {
        let err = "purple".parse::<Theme>().unwrap_err();
        assert!(matches!(err, Error::InvalidTheme(ref v) if v == "purple"));
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
        let parsed: Theme = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(parsed, Theme::Light);
    }

    #[test]
    fn palettes_differ_per_theme() {
        assert_eq!(Theme::Dark.palette().bg_primary, "#0d1117");
        assert_eq!(Theme::Light.palette().bg_primary, "#f0f2f5");
        assert_ne!(Theme::Light.palette(), Theme::Dark.palette());
    }
}
