//! The presentation state store: which group is shown, which slide is
//! current, and the editable slide list.
//!
//! `current_index` always points into the *visible* slides, never the raw
//! list. Every operation that can shrink the visible set re-clamps it.

use crate::loader::{ConfigLoader, LoadError, LoadOutcome};
use crate::model::{DEFAULT_GROUP, IdClock, NewSlide, PresentationConfig, Slide, SlidePatch};
use crate::model::{copy_file_name, slide_id};
use crate::nav::SiteLocation;

#[derive(Debug)]
pub struct PresentationStore {
    site: SiteLocation,
    config: PresentationConfig,
    current_group: String,
    current_index: usize,
    is_presenting: bool,
    is_sidebar_collapsed: bool,
    is_expanded: bool,
    is_homepage_mode: bool,
    loading_config: bool,
    config_ready: bool,
    ids: IdClock,
}

impl PresentationStore {
    pub fn new(site: SiteLocation) -> Self {
        Self {
            site,
            config: PresentationConfig::default(),
            current_group: DEFAULT_GROUP.to_string(),
            current_index: 0,
            is_presenting: false,
            is_sidebar_collapsed: false,
            is_expanded: false,
            is_homepage_mode: false,
            loading_config: false,
            config_ready: false,
            ids: IdClock::default(),
        }
    }

    // --- state ---

    pub fn site(&self) -> &SiteLocation {
        &self.site
    }

    pub fn config(&self) -> &PresentationConfig {
        &self.config
    }

    pub fn slides(&self) -> &[Slide] {
        &self.config.slides
    }

    pub fn current_group(&self) -> &str {
        &self.current_group
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_presenting(&self) -> bool {
        self.is_presenting
    }

    pub fn is_sidebar_collapsed(&self) -> bool {
        self.is_sidebar_collapsed
    }

    pub fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    pub fn is_homepage_mode(&self) -> bool {
        self.is_homepage_mode
    }

    pub fn loading_config(&self) -> bool {
        self.loading_config
    }

    pub fn config_ready(&self) -> bool {
        self.config_ready
    }

    // --- derived views ---

    pub fn group_base_path(&self) -> String {
        self.site.group_base_path(&self.current_group)
    }

    pub fn visible_slides(&self) -> Vec<&Slide> {
        self.config.slides.iter().filter(|s| s.visible).collect()
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.config
            .slides
            .iter()
            .filter(|s| s.visible)
            .nth(self.current_index)
    }

    pub fn total_slides(&self) -> usize {
        self.config.slides.iter().filter(|s| s.visible).count()
    }

    /// Percentage through the deck, counting the current slide as seen.
    pub fn progress(&self) -> f64 {
        let total = self.total_slides();
        if total == 0 {
            return 0.0;
        }
        (self.current_index + 1) as f64 / total as f64 * 100.0
    }

    pub fn can_go_next(&self) -> bool {
        self.current_index + 1 < self.total_slides()
    }

    pub fn can_go_prev(&self) -> bool {
        self.current_index > 0
    }

    /// Position in the raw slide list of the `visible_index`-th visible slide.
    pub fn visible_to_raw_index(&self, visible_index: usize) -> Option<usize> {
        self.config
            .slides
            .iter()
            .enumerate()
            .filter(|(_, s)| s.visible)
            .nth(visible_index)
            .map(|(i, _)| i)
    }

    // --- group / mode ---

    pub fn set_group(&mut self, group: &str) {
        self.current_group = group.to_string();
        self.current_index = 0;
        self.is_homepage_mode = false;
    }

    /// While on the landing surface nothing counts as loaded or presenting.
    pub fn set_homepage_mode(&mut self, enabled: bool) {
        self.is_homepage_mode = enabled;
        if enabled {
            self.is_presenting = false;
            self.config_ready = false;
        }
    }

    // --- loading ---

    /// Loads the current group's config. Failures are logged and leave
    /// `config_ready` false; they are never returned.
    pub fn load_config(&mut self, loader: &ConfigLoader) {
        if self.is_homepage_mode {
            return;
        }
        self.loading_config = true;
        self.config_ready = false;
        let group = self.current_group.clone();
        let result = loader.load(&group);
        self.apply_loaded(&group, result);
    }

    /// Applies a load result for `group`. A result for a group that is no
    /// longer current is dropped.
    pub fn apply_loaded(&mut self, group: &str, result: Result<LoadOutcome, LoadError>) {
        self.loading_config = false;
        if group != self.current_group {
            tracing::debug!(group, current = %self.current_group, "dropping stale config load");
            return;
        }
        match result {
            Ok(outcome) => {
                tracing::info!(
                    group,
                    source = ?outcome.source,
                    slides = outcome.config.slides.len(),
                    "presentation config loaded"
                );
                self.config = outcome.config;
                self.config_ready = true;
                self.clamp_index();
            }
            Err(e) => {
                tracing::warn!("Failed to load slides config for {group}: {e}");
                self.config_ready = false;
            }
        }
    }

    // --- navigation ---

    pub fn go_to_slide(&mut self, index: usize) {
        if index < self.total_slides() {
            self.current_index = index;
        }
    }

    pub fn next_slide(&mut self) {
        if self.can_go_next() {
            self.current_index += 1;
        } else if self.config.settings.loop_slides && self.total_slides() > 0 {
            self.current_index = 0;
        }
    }

    pub fn prev_slide(&mut self) {
        if self.can_go_prev() {
            self.current_index -= 1;
        } else if self.config.settings.loop_slides && self.total_slides() > 0 {
            self.current_index = self.total_slides() - 1;
        }
    }

    pub fn first_slide(&mut self) {
        self.go_to_slide(0);
    }

    pub fn last_slide(&mut self) {
        if let Some(last) = self.total_slides().checked_sub(1) {
            self.go_to_slide(last);
        }
    }

    // --- UI flags ---

    pub fn toggle_presentation(&mut self) {
        self.is_presenting = !self.is_presenting;
    }

    pub fn toggle_sidebar(&mut self) {
        self.is_sidebar_collapsed = !self.is_sidebar_collapsed;
    }

    pub fn toggle_expand(&mut self, explicit: Option<bool>) {
        self.is_expanded = explicit.unwrap_or(!self.is_expanded);
    }

    // --- slide mutations ---

    pub fn add_slide(&mut self, input: NewSlide) -> &Slide {
        let stamp = self.ids.next();
        self.config.slides.push(Slide {
            id: slide_id(stamp),
            title: input.title,
            file: input.file,
            visible: true,
            notes: input.notes.unwrap_or_default(),
            duration: None,
        });
        &self.config.slides[self.config.slides.len() - 1]
    }

    /// Hard delete. Unknown ids are ignored.
    pub fn remove_slide(&mut self, id: &str) -> bool {
        let before = self.config.slides.len();
        self.config.slides.retain(|s| s.id != id);
        let removed = self.config.slides.len() != before;
        if removed {
            self.clamp_index();
        }
        removed
    }

    /// Copies a slide and places the copy right after the original.
    pub fn duplicate_slide(&mut self, id: &str) -> Option<Slide> {
        let position = self.config.slides.iter().position(|s| s.id == id)?;
        let stamp = self.ids.next();
        let original = &self.config.slides[position];
        let copy = Slide {
            id: slide_id(stamp),
            title: format!("{} (Copy)", original.title),
            file: copy_file_name(&original.file, stamp),
            visible: true,
            notes: original.notes.clone(),
            duration: None,
        };
        self.config.slides.insert(position + 1, copy.clone());
        Some(copy)
    }

    /// Moves a slide within the raw list. `to` past the end appends.
    pub fn reorder_slides(&mut self, from: usize, to: usize) {
        if from >= self.config.slides.len() {
            return;
        }
        let slide = self.config.slides.remove(from);
        let to = to.min(self.config.slides.len());
        self.config.slides.insert(to, slide);
    }

    pub fn update_slide(&mut self, id: &str, patch: SlidePatch) -> bool {
        let Some(slide) = self.config.slides.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        patch.apply(slide);
        self.clamp_index();
        true
    }

    fn clamp_index(&mut self) {
        let total = self.total_slides();
        if self.current_index >= total {
            self.current_index = total.saturating_sub(1);
        }
    }
}
