//! File-backed authoring operations on a `presentations/` tree.
//!
//! Each group is a folder holding `slides.config.json` and a `slides/`
//! directory of HTML files. Every mutation is a read-modify-write of the
//! whole config file, taken under one lock so concurrent requests never
//! interleave.

use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};

use regex::{NoExpand, Regex};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{
    CONFIG_FILENAME, DEFAULT_GROUP, IdClock, PresentationConfig, Slide, copy_file_name,
    is_valid_group_name, slide_id,
};

const BUILTIN_BLANK: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
    <title>New Slide</title>\n</head>\n<body>\n<h1>New Slide</h1>\n</body>\n</html>\n";

#[derive(Debug, Error)]
pub enum FileOpsError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Malformed(String),

    #[error("{} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, FileOpsError>;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FileOpsError + '_ {
    move |source| FileOpsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Locations inside one group folder.
#[derive(Debug, Clone)]
pub struct GroupPaths {
    pub group: String,
    pub dir: PathBuf,
    pub slides_dir: PathBuf,
    pub config_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CreatedPresentation {
    pub paths: GroupPaths,
    pub config: Value,
}

pub struct PresentationFiles {
    root: PathBuf,
    presentations: PathBuf,
    templates: PathBuf,
    lock: Mutex<IdClock>,
}

impl PresentationFiles {
    /// `root` is the project directory: presentations live in
    /// `root/presentations`, templates in `root/public/templates`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            presentations: root.join("presentations"),
            templates: root.join("public").join("templates"),
            root,
            lock: Mutex::new(IdClock::default()),
        }
    }

    pub fn presentations_dir(&self) -> &Path {
        &self.presentations
    }

    /// Ensures `presentations/` exists and moves a legacy single-deck layout
    /// (`slides.config.json` and `slides/` at the project root) into the
    /// example group. Best effort: problems are logged, never returned.
    pub fn prepare(&self) {
        if let Err(e) = std::fs::create_dir_all(&self.presentations) {
            tracing::warn!("Could not create {}: {e}", self.presentations.display());
            return;
        }
        let example = self.presentations.join(DEFAULT_GROUP);
        if example.exists() {
            return;
        }
        if let Err(e) = self.migrate_legacy(&example) {
            tracing::warn!("Legacy slide migration failed: {e}");
        }
    }

    fn migrate_legacy(&self, example: &Path) -> Result<()> {
        let slides_dir = example.join("slides");
        std::fs::create_dir_all(&slides_dir).map_err(io_err(&slides_dir))?;

        let legacy_config = self.root.join(CONFIG_FILENAME);
        let target_config = example.join(CONFIG_FILENAME);
        if legacy_config.exists() {
            if let Err(e) = std::fs::copy(&legacy_config, &target_config) {
                tracing::warn!("Could not copy {}: {e}", legacy_config.display());
            }
        } else {
            let blank = to_value(&PresentationConfig::blank("Example Presentation"));
            write_json(&target_config, &blank)?;
        }

        let legacy_slides = self.root.join("slides");
        let Ok(entries) = std::fs::read_dir(&legacy_slides) else {
            return Ok(());
        };
        let mut copied = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "html") {
                match std::fs::copy(&path, slides_dir.join(entry.file_name())) {
                    Ok(_) => copied += 1,
                    Err(e) => tracing::warn!("Could not copy {}: {e}", path.display()),
                }
            }
        }
        tracing::info!(copied, "migrated legacy slides into the example group");
        Ok(())
    }

    /// Resolves a group name (empty means the example group), creating the
    /// folder with a blank config on first use.
    pub fn resolve(&self, group: &str) -> Result<GroupPaths> {
        let group = match group.trim() {
            "" => DEFAULT_GROUP,
            g => g,
        };
        if !is_valid_group_name(group) {
            return Err(FileOpsError::Invalid("Invalid group name".into()));
        }
        let dir = self.presentations.join(group);
        let paths = GroupPaths {
            group: group.to_string(),
            slides_dir: dir.join("slides"),
            config_path: dir.join(CONFIG_FILENAME),
            dir,
        };
        if !paths.dir.exists() {
            std::fs::create_dir_all(&paths.slides_dir).map_err(io_err(&paths.slides_dir))?;
            write_json(&paths.config_path, &to_value(&PresentationConfig::blank(group)))?;
            tracing::info!(group, "created presentation folder");
        }
        Ok(paths)
    }

    /// Writes a new slide from a template and appends its entry.
    pub fn create_slide(&self, group: &str, file: &str, template: &str, title: &str) -> Result<Slide> {
        let file = checked_slide_file(file, "Invalid filename")?;
        let title = non_empty_or(title, "New Slide");
        let template = non_empty_or(template, "blank");

        let mut clock = self.transaction();
        let paths = self.resolve(group)?;
        let mut config = read_json(&paths.config_path)?;
        slides_mut(&mut config)?;
        let html = inject_title(&self.template_html(&template)?, &title);
        let target = paths.slides_dir.join(&file);
        std::fs::write(&target, html).map_err(io_err(&target))?;

        let slide = new_entry(slide_id(clock.next()), title, file);
        slides_mut(&mut config)?.push(to_value(&slide));
        write_json(&paths.config_path, &config)?;
        tracing::info!(group = %paths.group, file = %slide.file, "created slide");
        Ok(slide)
    }

    /// Copies a slide file and inserts the copy right after the source entry.
    pub fn duplicate_slide(&self, group: &str, source_file: &str, source_title: &str) -> Result<Slide> {
        let source_file = checked_slide_file(source_file, "Invalid source file")?;
        let source_title = non_empty_or(source_title, "Slide");

        let mut clock = self.transaction();
        let paths = self.resolve(group)?;
        let source = paths.slides_dir.join(&source_file);
        if !source.exists() {
            return Err(FileOpsError::NotFound("Source file not found".into()));
        }

        let mut config = read_json(&paths.config_path)?;
        slides_mut(&mut config)?;
        let stamp = clock.next();
        let file = copy_file_name(&source_file, stamp);
        let target = paths.slides_dir.join(&file);
        std::fs::copy(&source, &target).map_err(io_err(&target))?;

        let slide = new_entry(slide_id(stamp), format!("{source_title} (Copy)"), file);
        let slides = slides_mut(&mut config)?;
        let position = slides
            .iter()
            .position(|s| s.get("file").and_then(Value::as_str) == Some(source_file.as_str()));
        match position {
            Some(i) => slides.insert(i + 1, to_value(&slide)),
            None => slides.push(to_value(&slide)),
        }
        write_json(&paths.config_path, &config)?;
        Ok(slide)
    }

    /// Moves the entry at `from` to `to`, where `to` may equal the length.
    pub fn reorder_slides(&self, group: &str, from: i64, to: i64) -> Result<()> {
        let _guard = self.transaction();
        let paths = self.resolve(group)?;
        let mut config = read_json(&paths.config_path)?;
        let slides = slides_mut(&mut config)?;
        let len = slides.len() as i64;
        if from < 0 || from >= len || to < 0 || to > len {
            return Err(FileOpsError::Invalid("Index out of range".into()));
        }
        let moved = slides.remove(from as usize);
        let to = (to as usize).min(slides.len());
        slides.insert(to, moved);
        write_json(&paths.config_path, &config)
    }

    /// Drops every entry matching `id` or `file` and deletes the HTML file.
    /// When only `id` is given the file is looked up from its entry.
    pub fn delete_slide(&self, group: &str, id: &str, file: &str) -> Result<()> {
        let _guard = self.transaction();
        let paths = self.resolve(group)?;
        let mut config = read_json(&paths.config_path)?;
        let slides = slides_mut(&mut config)?;

        let id = id.trim();
        let mut file = file.trim().to_string();
        if file.is_empty() && !id.is_empty() {
            file = slides
                .iter()
                .find(|s| field(s, "id") == id)
                .map(|s| field(s, "file").to_string())
                .unwrap_or_default();
        }

        slides.retain(|s| {
            let matches_id = !id.is_empty() && field(s, "id") == id;
            let matches_file = !file.is_empty() && field(s, "file") == file;
            !matches_id && !matches_file
        });
        write_json(&paths.config_path, &config)?;

        if !file.is_empty() {
            match checked_slide_file(&file, "Invalid filename") {
                Ok(file) => {
                    let target = paths.slides_dir.join(file);
                    if target.exists() {
                        if let Err(e) = std::fs::remove_file(&target) {
                            tracing::warn!("Could not delete {}: {e}", target.display());
                        }
                    }
                }
                Err(_) => tracing::warn!(file, "refusing to delete file outside slides dir"),
            }
        }
        Ok(())
    }

    /// Creates a group, or updates title and description of an existing one.
    pub fn create_presentation(
        &self,
        group: &str,
        title: &str,
        description: &str,
    ) -> Result<CreatedPresentation> {
        let group = group.trim();
        if !is_valid_group_name(group) {
            return Err(FileOpsError::Invalid("Invalid group name".into()));
        }
        let title = title.trim();
        let description = description.trim();

        let _guard = self.transaction();
        let paths = self.resolve(group)?;
        let mut config = match read_json(&paths.config_path) {
            Ok(config) if config.is_object() => config,
            Ok(_) | Err(_) => {
                tracing::warn!(group, "replacing unreadable config with a blank one");
                let mut blank = PresentationConfig::blank(non_empty_or(title, "New Presentation").as_str());
                blank.description = description.to_string();
                to_value(&blank)
            }
        };
        if let Some(object) = config.as_object_mut() {
            if !title.is_empty() {
                object.insert("title".into(), Value::from(title));
            }
            if !description.is_empty() {
                object.insert("description".into(), Value::from(description));
            }
        }
        write_json(&paths.config_path, &config)?;
        Ok(CreatedPresentation { paths, config })
    }

    /// Replaces a group's config. Anything but a JSON object is stored as `{}`.
    pub fn save_config(&self, group: &str, config: Value) -> Result<()> {
        if group.trim().is_empty() {
            return Err(FileOpsError::Invalid("Missing group".into()));
        }
        let config = if config.is_object() {
            config
        } else {
            Value::Object(Map::new())
        };
        let _guard = self.transaction();
        let paths = self.resolve(group)?;
        write_json(&paths.config_path, &config)
    }

    pub fn save_slide_html(&self, group: &str, file: &str, html: &str) -> Result<()> {
        let file = checked_slide_file(file, "Invalid file")?;
        let _guard = self.transaction();
        let paths = self.resolve(group)?;
        let target = paths.slides_dir.join(file);
        std::fs::write(&target, html).map_err(io_err(&target))
    }

    /// Typed view of a group's config.
    pub fn load_config(&self, group: &str) -> Result<PresentationConfig> {
        let _guard = self.transaction();
        let paths = self.resolve(group)?;
        let config = read_json(&paths.config_path)?;
        serde_json::from_value(config).map_err(|source| FileOpsError::Json {
            path: paths.config_path.clone(),
            source,
        })
    }

    fn transaction(&self) -> MutexGuard<'_, IdClock> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Named template, then `blank.html`, then the built-in page.
    fn template_html(&self, template: &str) -> Result<String> {
        let named = is_plain_name(template).then(|| self.templates.join(format!("{template}.html")));
        let blank = self.templates.join("blank.html");
        for path in named.iter().chain(std::iter::once(&blank)) {
            if path.exists() {
                return std::fs::read_to_string(path).map_err(io_err(path));
            }
        }
        Ok(BUILTIN_BLANK.to_string())
    }
}

fn new_entry(id: String, title: String, file: String) -> Slide {
    Slide {
        id,
        title,
        file,
        visible: true,
        notes: String::new(),
        duration: None,
    }
}

static TITLE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<title>.*?</title>").unwrap());
static H1_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<h1[^>]*>.*?</h1>").unwrap());

/// Replaces the first `<title>` and the first `<h1>` with `title`.
pub fn inject_title(html: &str, title: &str) -> String {
    let out = TITLE_TAG.replacen(html, 1, NoExpand(&format!("<title>{title}</title>")));
    H1_TAG
        .replacen(&out, 1, NoExpand(&format!("<h1>{title}</h1>")))
        .into_owned()
}

fn checked_slide_file(file: &str, message: &str) -> Result<String> {
    let file = file.trim();
    if file.ends_with(".html") && is_plain_name(file) {
        Ok(file.to_string())
    } else {
        Err(FileOpsError::Invalid(message.into()))
    }
}

/// A single path component with no traversal.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    match value.trim() {
        "" => fallback.to_string(),
        v => v.to_string(),
    }
}

fn field<'a>(slide: &'a Value, key: &str) -> &'a str {
    slide.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// The `slides` list of a config, created when absent. Anything else in its
/// place is left untouched and reported.
fn slides_mut(config: &mut Value) -> Result<&mut Vec<Value>> {
    let Some(object) = config.as_object_mut() else {
        return Err(FileOpsError::Malformed("Config is not a JSON object".into()));
    };
    let slides = object
        .entry("slides")
        .or_insert_with(|| Value::Array(Vec::new()));
    if slides.is_null() {
        *slides = Value::Array(Vec::new());
    }
    slides
        .as_array_mut()
        .ok_or_else(|| FileOpsError::Malformed("Config slides is not an array".into()))
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path).map_err(io_err(path))?;
    serde_json::from_str(&contents).map_err(|source| FileOpsError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| FileOpsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err(path))
}
