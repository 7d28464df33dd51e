//! Slide HTML reduced to text blocks the native viewer can draw.
//!
//! Only headings, paragraphs, list items and preformatted blocks are kept;
//! scripts, styles and every other tag are dropped.

use std::sync::LazyLock;

use eframe::egui;
use regex::Regex;

use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Preformatted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideContent {
    /// `<title>` of the document, if any.
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|head)\b[^>]*>.*?</(script|style|head)>|<!--.*?-->").unwrap()
});
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(h[1-6]|p|li|pre)\b[^>]*>(.*?)</(h[1-6]|p|li|pre)>").unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").unwrap());

impl SlideContent {
    pub fn parse(html: &str) -> Self {
        let title = TITLE
            .captures(html)
            .map(|c| clean(&c[1], false))
            .filter(|t| !t.is_empty());

        let body = NOISE.replace_all(html, "");
        let blocks = BLOCK
            .captures_iter(&body)
            .filter_map(|c| {
                let tag = c[1].to_ascii_lowercase();
                let kind = match tag.as_str() {
                    "p" => BlockKind::Paragraph,
                    "li" => BlockKind::ListItem,
                    "pre" => BlockKind::Preformatted,
                    h => BlockKind::Heading(h[1..].parse().unwrap_or(1)),
                };
                let text = clean(&c[2], kind == BlockKind::Preformatted);
                (!text.is_empty()).then_some(Block { kind, text })
            })
            .collect();

        Self { title, blocks }
    }

    /// Placeholder shown when a slide's HTML could not be fetched.
    pub fn unavailable(file: &str, reason: &str) -> Self {
        Self {
            title: None,
            blocks: vec![
                Block {
                    kind: BlockKind::Heading(2),
                    text: format!("Could not load {file}"),
                },
                Block {
                    kind: BlockKind::Paragraph,
                    text: reason.to_string(),
                },
            ],
        }
    }

    pub fn heading(&self) -> Option<&str> {
        self.blocks
            .iter()
            .find(|b| matches!(b.kind, BlockKind::Heading(_)))
            .map(|b| b.text.as_str())
    }
}

fn clean(fragment: &str, keep_lines: bool) -> String {
    let text = TAG.replace_all(fragment, "");
    let text = decode_entities(&text);
    if keep_lines {
        text.trim_matches('\n').to_string()
    } else {
        SPACE.replace_all(&text, " ").trim().to_string()
    }
}

/// Named entities for markup characters plus decimal and hex references.
/// `&amp;` goes last so `&amp;lt;` stays literal.
fn decode_entities(text: &str) -> String {
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&mdash;", "\u{2014}")
        .replace("&ndash;", "\u{2013}")
        .replace("&hellip;", "\u{2026}");
    let text = NUMERIC_ENTITY.replace_all(&text, |c: &regex::Captures| {
        let code = match (c.get(1), c.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse().ok(),
            _ => None,
        };
        match code.and_then(char::from_u32) {
            Some(ch) => ch.to_string(),
            None => c[0].to_string(),
        }
    });
    text.replace("&amp;", "&")
}

/// Lays the blocks out top to bottom inside `rect`.
pub fn paint(ui: &egui::Ui, content: &SlideContent, theme: &Theme, rect: egui::Rect, scale: f32) {
    let padding = 96.0 * scale;
    let width = rect.width() - padding * 2.0;
    let mut y = rect.top() + padding;

    for block in &content.blocks {
        let (font, color, gap, prefix) = match block.kind {
            BlockKind::Heading(level) => (
                egui::FontId::proportional(theme.heading_size(level) * scale),
                theme.heading_color,
                28.0,
                "",
            ),
            BlockKind::Paragraph => (
                egui::FontId::proportional(theme.body_size * scale),
                theme.foreground,
                20.0,
                "",
            ),
            BlockKind::ListItem => (
                egui::FontId::proportional(theme.body_size * scale),
                theme.foreground,
                12.0,
                "\u{2022}  ",
            ),
            BlockKind::Preformatted => (
                egui::FontId::monospace(theme.code_size * scale),
                theme.code_foreground,
                20.0,
                "",
            ),
        };

        let galley = ui
            .painter()
            .layout(format!("{prefix}{}", block.text), font, color, width);
        let size = galley.rect.size();
        let pos = egui::pos2(rect.left() + padding, y);
        if block.kind == BlockKind::Preformatted {
            let bg = egui::Rect::from_min_size(pos, size).expand(12.0 * scale);
            ui.painter().rect_filled(bg, 8.0 * scale, theme.code_background);
        }
        ui.painter().galley(pos, galley, color);

        y += size.y + gap * scale;
        if y > rect.bottom() {
            break;
        }
    }
}
