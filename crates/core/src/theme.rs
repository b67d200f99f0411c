//! Built-in color themes.
//!
//! The registry is a process-wide table built once on first use. Lookups
//! never fail: an absent or unknown key resolves to the first theme.

use serde::Serialize;
use std::sync::LazyLock;

use crate::types::TextColors;

/// A two-stop linear color ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradientDescriptor {
    /// Color at position 0, 6-digit hex.
    pub start: &'static str,
    /// Color at position 1, 6-digit hex.
    pub end: &'static str,
    angle_degrees: f64,
    opacity: f64,
}

impl GradientDescriptor {
    /// Create a descriptor, normalizing the angle into `[0, 360)` and
    /// clamping opacity into `[0, 1]`.
    pub fn new(start: &'static str, end: &'static str, angle_degrees: f64, opacity: f64) -> Self {
        let angle_degrees = if angle_degrees.is_finite() {
            let normalized = angle_degrees.rem_euclid(360.0);
            // rem_euclid can round up to exactly 360 for tiny negative inputs
            if normalized >= 360.0 {
                0.0
            } else {
                normalized
            }
        } else {
            0.0
        };
        let opacity = if opacity.is_nan() {
            1.0
        } else {
            opacity.clamp(0.0, 1.0)
        };

        Self {
            start,
            end,
            angle_degrees,
            opacity,
        }
    }

    /// Angle measured clockwise from vertical (0 = towards the top).
    pub fn angle_degrees(&self) -> f64 {
        self.angle_degrees
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }
}

/// A named, immutable set of text colors plus a background gradient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    /// Registry key, e.g. `"ocean"`.
    pub key: &'static str,
    /// Display name, e.g. `"Ocean"`.
    pub name: &'static str,
    pub colors: TextColors,
    pub gradient: GradientDescriptor,
}

impl Theme {
    const fn new(
        key: &'static str,
        name: &'static str,
        colors: TextColors,
        gradient: GradientDescriptor,
    ) -> Self {
        Self {
            key,
            name,
            colors,
            gradient,
        }
    }
}

fn colors(
    title: &'static str,
    subtitle: &'static str,
    text: &'static str,
    bullet: &'static str,
) -> TextColors {
    TextColors {
        title,
        subtitle,
        text,
        bullet,
    }
}

static THEMES: LazyLock<Vec<Theme>> = LazyLock::new(|| {
    vec![
        Theme::new(
            "neutral",
            "Neutral",
            colors("111827", "6B7280", "111827", "374151"),
            GradientDescriptor::new("FFFFFF", "F3F4F6", 90.0, 1.0),
        ),
        Theme::new(
            "salad",
            "Salad",
            colors("222222", "006699", "222222", "00A3CC"),
            GradientDescriptor::new("00C9FF", "92FE9D", 90.0, 1.0),
        ),
        Theme::new(
            "mello",
            "Mello",
            colors("222222", "1F8A6E", "222222", "2D9F80"),
            GradientDescriptor::new("F8FF00", "3AD59F", 90.0, 1.0),
        ),
        Theme::new(
            "ocean",
            "Ocean",
            colors("FFFFFF", "DCEEFF", "FFFFFF", "FFFFFF"),
            GradientDescriptor::new("1CB5E0", "000851", 90.0, 1.0),
        ),
        Theme::new(
            "lilly",
            "Lilly",
            colors("222222", "7C6BFF", "222222", "515ADA"),
            GradientDescriptor::new("EFD5FF", "515ADA", 90.0, 1.0),
        ),
        Theme::new(
            "dusky",
            "Dusky",
            colors("222222", "7A5900", "222222", "C67700"),
            GradientDescriptor::new("FCFF9E", "C67700", 90.0, 1.0),
        ),
        Theme::new(
            "mimosa",
            "Mimosa",
            colors("FFFFFF", "FFCF80", "FFFFFF", "DAAE51"),
            GradientDescriptor::new("D53369", "DAAE51", 90.0, 1.0),
        ),
    ]
});

/// Key of the theme applied behind user-supplied background images.
const NEUTRAL_KEY: &str = "neutral";

/// Read-only lookup over the built-in themes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeRegistry;

impl ThemeRegistry {
    /// All themes in registration order.
    pub fn themes() -> &'static [Theme] {
        &THEMES
    }

    /// Registered keys in registration order, for selection UIs.
    pub fn keys() -> impl Iterator<Item = &'static str> {
        THEMES.iter().map(|t| t.key)
    }

    /// The first registered theme.
    pub fn default_theme() -> &'static Theme {
        &THEMES[0]
    }

    /// Theme forced onto slides with a caller-supplied background image.
    pub fn neutral() -> &'static Theme {
        Self::get(NEUTRAL_KEY).unwrap_or_else(Self::default_theme)
    }

    /// Find a theme by key, without fallback.
    pub fn get(key: &str) -> Option<&'static Theme> {
        let key = key.trim().to_ascii_lowercase();
        THEMES.iter().find(|t| t.key == key)
    }

    /// Find a theme by key, falling back to the default theme when the key
    /// is absent or unknown.
    pub fn lookup(key: Option<&str>) -> &'static Theme {
        match key.and_then(Self::get) {
            Some(theme) => theme,
            None => {
                if let Some(key) = key {
                    log::debug!("Unknown theme '{}', using '{}'", key, Self::default_theme().key);
                }
                Self::default_theme()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_hex6(s: &str) -> bool {
        s.len() == 6 && s.chars().all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn test_registry_invariants() {
        for theme in ThemeRegistry::themes() {
            let g = theme.gradient;
            assert!((0.0..=1.0).contains(&g.opacity()), "{}", theme.key);
            assert!((0.0..360.0).contains(&g.angle_degrees()), "{}", theme.key);
            for color in [
                g.start,
                g.end,
                theme.colors.title,
                theme.colors.subtitle,
                theme.colors.text,
                theme.colors.bullet,
            ] {
                assert!(is_hex6(color), "{}: {}", theme.key, color);
            }
        }
    }

    #[test]
    fn test_keys_in_registration_order() {
        let keys: Vec<&str> = ThemeRegistry::keys().collect();
        assert_eq!(
            keys,
            vec!["neutral", "salad", "mello", "ocean", "lilly", "dusky", "mimosa"]
        );
        assert_eq!(ThemeRegistry::default_theme().key, "neutral");
    }

    #[test]
    fn test_lookup_falls_back_to_default() {
        assert_eq!(ThemeRegistry::lookup(Some("ocean")).key, "ocean");
        assert_eq!(ThemeRegistry::lookup(Some(" Ocean ")).key, "ocean");
        assert_eq!(ThemeRegistry::lookup(Some("no-such-theme")).key, "neutral");
        assert_eq!(ThemeRegistry::lookup(None).key, "neutral");
        assert!(ThemeRegistry::get("no-such-theme").is_none());
    }

    #[test]
    fn test_gradient_normalization() {
        let g = GradientDescriptor::new("000000", "FFFFFF", -90.0, 1.5);
        assert_eq!(g.angle_degrees(), 270.0);
        assert_eq!(g.opacity(), 1.0);

        let g = GradientDescriptor::new("000000", "FFFFFF", 720.0, -0.2);
        assert_eq!(g.angle_degrees(), 0.0);
        assert_eq!(g.opacity(), 0.0);

        let g = GradientDescriptor::new("000000", "FFFFFF", f64::NAN, f64::NAN);
        assert_eq!(g.angle_degrees(), 0.0);
        assert_eq!(g.opacity(), 1.0);
    }
}
