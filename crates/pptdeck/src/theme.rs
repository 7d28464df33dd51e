use eframe::egui::Color32;

use crate::model::DeckTheme;

const FALLBACK_ACCENT: Color32 = Color32::from_rgb(0x3B, 0x82, 0xF6);

#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color32,
    pub foreground: Color32,
    pub heading_color: Color32,
    pub accent: Color32,
    pub panel_background: Color32,
    pub code_background: Color32,
    pub code_foreground: Color32,
    pub h1_size: f32,
    pub h2_size: f32,
    pub h3_size: f32,
    pub body_size: f32,
    pub code_size: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color32::from_rgb(0x0F, 0x17, 0x2A),
            foreground: Color32::from_rgb(0xCB, 0xD5, 0xE1),
            heading_color: Color32::WHITE,
            accent: FALLBACK_ACCENT,
            panel_background: Color32::from_rgb(0x1E, 0x29, 0x3B),
            code_background: Color32::from_rgb(0x1E, 0x29, 0x3B),
            code_foreground: Color32::from_rgb(0xE2, 0xE8, 0xF0),
            h1_size: 88.0,
            h2_size: 64.0,
            h3_size: 48.0,
            body_size: 40.0,
            code_size: 28.0,
        }
    }
}

impl Theme {
    /// Palette for a deck: the default dark palette with the deck's primary
    /// color as accent.
    pub fn from_deck(deck: &DeckTheme) -> Self {
        let accent = parse_hex_color(&deck.primary_color).unwrap_or_else(|| {
            tracing::debug!(color = %deck.primary_color, "unsupported primary color");
            FALLBACK_ACCENT
        });
        Self {
            accent,
            ..Self::default()
        }
    }

    /// Apply opacity to a color
    pub fn with_opacity(color: Color32, opacity: f32) -> Color32 {
        Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), (opacity * 255.0) as u8)
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        match level {
            1 => self.h1_size,
            2 => self.h2_size,
            3 => self.h3_size,
            _ => self.body_size,
        }
    }
}

/// `#rgb` or `#rrggbb`.
pub fn parse_hex_color(value: &str) -> Option<Color32> {
    let hex = value.trim().strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut parts = hex.chars().map(|c| channel(&c.to_string()).map(|v| v * 17));
            Some(Color32::from_rgb(parts.next()??, parts.next()??, parts.next()??))
        }
        6 => Some(Color32::from_rgb(
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(
            parse_hex_color("#3b82f6"),
            Some(Color32::from_rgb(0x3B, 0x82, 0xF6))
        );
        assert_eq!(parse_hex_color("#fff"), Some(Color32::WHITE));
        assert_eq!(parse_hex_color("3b82f6"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(parse_hex_color("rgb(1,2,3)"), None);
    }

    #[test]
    fn test_from_deck_falls_back_on_bad_color() {
        let deck = DeckTheme {
            primary_color: "tomato".into(),
            ..DeckTheme::default()
        };
        assert_eq!(Theme::from_deck(&deck).accent, FALLBACK_ACCENT);

        let deck = DeckTheme {
            primary_color: "#ff0000".into(),
            ..DeckTheme::default()
        };
        assert_eq!(Theme::from_deck(&deck).accent, Color32::from_rgb(255, 0, 0));
    }
}
