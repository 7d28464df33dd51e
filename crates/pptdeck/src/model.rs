use serde::{Deserialize, Serialize};

pub const DEFAULT_GROUP: &str = "example";
pub const CONFIG_FILENAME: &str = "slides.config.json";

/// A presentation description as stored in `slides.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub theme: DeckTheme,

    #[serde(default)]
    pub settings: DeckSettings,

    #[serde(default)]
    pub slides: Vec<Slide>,
}

fn default_title() -> String {
    "My Presentation".to_string()
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            author: String::new(),
            description: String::new(),
            theme: DeckTheme::default(),
            settings: DeckSettings::default(),
            slides: Vec::new(),
        }
    }
}

impl PresentationConfig {
    /// Config written for a freshly created group folder.
    pub fn blank(title: &str) -> Self {
        Self {
            title: title.to_string(),
            theme: DeckTheme {
                transition: "random".to_string(),
                ..DeckTheme::default()
            },
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeckTheme {
    pub primary_color: String,
    pub font_family: String,
    pub transition: String,
}

impl Default for DeckTheme {
    fn default() -> Self {
        Self {
            primary_color: "#3b82f6".to_string(),
            font_family: "system-ui".to_string(),
            transition: "slide".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeckSettings {
    pub auto_play: bool,
    /// Milliseconds between automatic advances.
    pub auto_play_interval: u64,
    #[serde(rename = "loop")]
    pub loop_slides: bool,
    pub show_progress: bool,
    pub show_thumbnails: bool,
    pub enable_keyboard_nav: bool,
    pub enable_touch_nav: bool,
    pub auto_start_on_home: bool,
    pub auto_fullscreen_on_home: bool,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            auto_play: false,
            auto_play_interval: 5000,
            loop_slides: false,
            show_progress: true,
            show_thumbnails: true,
            enable_keyboard_nav: true,
            enable_touch_nav: true,
            auto_start_on_home: true,
            auto_fullscreen_on_home: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// HTML resource path, relative to the group's `slides/` folder.
    #[serde(default)]
    pub file: String,

    /// Anything but an explicit `false` counts as visible.
    #[serde(default = "default_visible", deserialize_with = "visible_flag")]
    pub visible: bool,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub duration: Option<f64>,
}

fn default_visible() -> bool {
    true
}

fn visible_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)? != Some(false))
}

/// Input for appending a slide.
#[derive(Debug, Clone, Default)]
pub struct NewSlide {
    pub title: String,
    pub file: String,
    pub notes: Option<String>,
}

impl NewSlide {
    pub fn new(title: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file: file.into(),
            notes: None,
        }
    }
}

/// Shallow patch merged into an existing slide. `None` leaves a field alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlidePatch {
    pub title: Option<String>,
    pub file: Option<String>,
    pub visible: Option<bool>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub duration: Option<Option<f64>>,
}

impl SlidePatch {
    pub fn apply(self, slide: &mut Slide) {
        if let Some(title) = self.title {
            slide.title = title;
        }
        if let Some(file) = self.file {
            slide.file = file;
        }
        if let Some(visible) = self.visible {
            slide.visible = visible;
        }
        if let Some(notes) = self.notes {
            slide.notes = notes;
        }
        if let Some(duration) = self.duration {
            slide.duration = duration;
        }
    }
}

/// Distinguishes a missing `duration` key from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer).map(Some)
    }
}

/// File name for a copy of `file`, e.g. `intro.html` -> `intro-copy-1700000000000.html`.
pub fn copy_file_name(file: &str, stamp: i64) -> String {
    let base = file.strip_suffix(".html").unwrap_or(file);
    format!("{base}-copy-{stamp}.html")
}

/// Millisecond stamps that never repeat for one owner, even when two are
/// taken within the same millisecond.
#[derive(Debug, Default)]
pub struct IdClock {
    last: i64,
}

impl IdClock {
    pub fn next(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let stamp = now.max(self.last + 1);
        self.last = stamp;
        stamp
    }
}

pub fn slide_id(stamp: i64) -> String {
    format!("slide-{stamp}")
}

/// Group names double as folder names.
pub fn is_valid_group_name(group: &str) -> bool {
    !group.is_empty()
        && group
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
