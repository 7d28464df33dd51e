use eframe::egui;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::api::ApiClient;
use crate::api::ppts::{ListParams, PptsApi};
use crate::loader::ConfigLoader;
use crate::model::DEFAULT_GROUP;
use crate::nav::{AddressBar, NavigationSync};
use crate::render::{self, SlideContent};
use crate::store::PresentationStore;
use crate::theme::Theme;

/// Horizontal drag distance that counts as a swipe.
const SWIPE_THRESHOLD: f32 = 50.0;
const SIDEBAR_WIDTH: f32 = 260.0;
const HOME_LIST_LIMIT: u32 = 50;

/// How the viewer starts.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub group: String,
    /// 0-based.
    pub start_slide: usize,
    pub homepage: bool,
    pub windowed: bool,
}

/// The viewer's own address bar: the latest deep link, shown in the chrome
/// and the window title.
#[derive(Debug, Default)]
struct WindowAddress {
    origin: String,
    path: String,
}

impl AddressBar for WindowAddress {
    fn replace(&mut self, path: &str) {
        tracing::debug!(path, "address updated");
        self.path = path.to_string();
    }
}

impl WindowAddress {
    fn full(&self) -> String {
        format!("{}{}", self.origin, self.path)
    }
}

/// One choice on the homepage list.
#[derive(Debug, Clone, PartialEq)]
struct HomeEntry {
    group: String,
    label: String,
}

struct Toast {
    message: String,
    start: Instant,
}

impl Toast {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            start: Instant::now(),
        }
    }

    fn opacity(&self) -> f32 {
        let elapsed = self.start.elapsed().as_secs_f32();
        let duration = 1.5;
        let fade_start = 1.0;
        if elapsed < fade_start {
            1.0
        } else if elapsed < duration {
            1.0 - (elapsed - fade_start) / (duration - fade_start)
        } else {
            0.0
        }
    }

    fn is_expired(&self) -> bool {
        self.start.elapsed().as_secs_f32() >= 1.5
    }
}

/// Input gathered in one frame, applied after the input closure.
#[derive(Debug, Default)]
struct FrameInput {
    next: bool,
    prev: bool,
    first: bool,
    last: bool,
    toggle_presenting: bool,
    toggle_sidebar: bool,
    toggle_expand: bool,
    toggle_help: bool,
    fullscreen: Option<bool>,
    quit: bool,
    escape: bool,
    home_up: bool,
    home_down: bool,
    home_open: bool,
    back_home: bool,
}

struct PresentationViewer {
    store: PresentationStore,
    loader: ConfigLoader,
    nav: NavigationSync,
    address: WindowAddress,
    theme: Theme,
    slides: HashMap<String, Rc<SlideContent>>,
    home_entries: Vec<HomeEntry>,
    home_selected: usize,
    from_home: bool,
    show_help: bool,
    toast: Option<Toast>,
    last_esc: Option<Instant>,
    drag_origin: Option<egui::Pos2>,
    last_advance: Instant,
    pending_fullscreen: Option<bool>,
    window_title: String,
}

impl PresentationViewer {
    fn new(
        mut store: PresentationStore,
        loader: ConfigLoader,
        options: &ViewerOptions,
        home_entries: Vec<HomeEntry>,
    ) -> Self {
        let address = WindowAddress {
            origin: store.site().origin().to_string(),
            path: String::new(),
        };

        if options.homepage {
            store.set_homepage_mode(true);
        } else {
            store.set_group(&options.group);
            store.load_config(&loader);
            store.go_to_slide(options.start_slide);
            if store.config_ready() {
                store.toggle_presentation();
            }
        }

        let home_selected = home_entries
            .iter()
            .position(|e| e.group == options.group)
            .unwrap_or(0);

        let mut viewer = Self {
            theme: Theme::from_deck(&store.config().theme),
            store,
            loader,
            nav: NavigationSync::new(),
            address,
            slides: HashMap::new(),
            home_entries,
            home_selected,
            from_home: options.homepage,
            show_help: false,
            toast: None,
            last_esc: None,
            drag_origin: None,
            last_advance: Instant::now(),
            pending_fullscreen: None,
            window_title: String::new(),
        };
        if !viewer.store.is_homepage_mode() && !viewer.store.config_ready() {
            viewer.toast = Some(Toast::new(format!(
                "Could not load \"{}\"",
                viewer.store.current_group()
            )));
        }
        viewer
    }

    /// Leaves the homepage for `group` and honours the deck's home settings.
    fn open_group(&mut self, group: &str) {
        self.store.set_group(group);
        self.store.load_config(&self.loader);
        self.slides.clear();
        self.theme = Theme::from_deck(&self.store.config().theme);
        self.last_advance = Instant::now();

        if !self.store.config_ready() {
            self.toast = Some(Toast::new(format!("Could not load \"{group}\"")));
            return;
        }
        let settings = self.store.config().settings.clone();
        if settings.auto_start_on_home && !self.store.is_presenting() {
            self.store.toggle_presentation();
        }
        if settings.auto_fullscreen_on_home {
            self.pending_fullscreen = Some(true);
        }
    }

    fn back_to_home(&mut self) {
        self.store.set_homepage_mode(true);
        self.pending_fullscreen = Some(false);
    }

    /// Parsed content of the current slide, fetched on first use.
    fn current_content(&mut self) -> Option<Rc<SlideContent>> {
        let file = self.store.current_slide()?.file.clone();
        if let Some(content) = self.slides.get(&file) {
            return Some(content.clone());
        }
        let content = match self
            .loader
            .fetch_slide_html(self.store.current_group(), &file)
        {
            Ok(html) => SlideContent::parse(&html),
            Err(e) => {
                tracing::warn!("Failed to load slide {file}: {e}");
                SlideContent::unavailable(&file, &e.to_string())
            }
        };
        let content = Rc::new(content);
        self.slides.insert(file, content.clone());
        Some(content)
    }

    fn read_input(&self, ctx: &egui::Context) -> FrameInput {
        let mut input = FrameInput::default();
        let keyboard = self.store.config().settings.enable_keyboard_nav || self.store.is_homepage_mode();
        let touch = self.store.config().settings.enable_touch_nav;

        ctx.input(|i| {
            if i.key_pressed(egui::Key::Q) {
                input.quit = true;
                return;
            }
            if i.key_pressed(egui::Key::Escape) {
                input.escape = true;
                return;
            }
            if i.key_pressed(egui::Key::F) {
                input.fullscreen = Some(!i.viewport().fullscreen.unwrap_or(false));
            }
            if i.key_pressed(egui::Key::H) {
                input.toggle_help = true;
            }
            if !keyboard {
                return;
            }

            if self.store.is_homepage_mode() {
                input.home_up = i.key_pressed(egui::Key::ArrowUp);
                input.home_down = i.key_pressed(egui::Key::ArrowDown);
                input.home_open = i.key_pressed(egui::Key::Enter);
                return;
            }

            input.next = i.key_pressed(egui::Key::ArrowRight)
                || i.key_pressed(egui::Key::Space)
                || i.key_pressed(egui::Key::PageDown)
                || i.key_pressed(egui::Key::N);
            input.prev = i.key_pressed(egui::Key::ArrowLeft)
                || i.key_pressed(egui::Key::PageUp)
                || i.key_pressed(egui::Key::P);
            input.first = i.key_pressed(egui::Key::Home);
            input.last = i.key_pressed(egui::Key::End);
            input.toggle_presenting = i.key_pressed(egui::Key::Enter);
            input.toggle_sidebar = i.key_pressed(egui::Key::S);
            input.toggle_expand = i.key_pressed(egui::Key::E);
            input.back_home = self.from_home && i.key_pressed(egui::Key::Backspace);
        });

        if touch && !self.store.is_homepage_mode() {
            ctx.input(|i| {
                if i.pointer.primary_released() {
                    if let (Some(origin), Some(pos)) = (self.drag_origin, i.pointer.interact_pos()) {
                        let dx = pos.x - origin.x;
                        if dx.abs() > SWIPE_THRESHOLD && dx.abs() > (pos.y - origin.y).abs() {
                            if dx < 0.0 {
                                input.next = true;
                            } else {
                                input.prev = true;
                            }
                        }
                    }
                }
            });
        }
        input
    }

    fn track_drag(&mut self, ctx: &egui::Context) {
        let (pressed, released, pos) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
            )
        });
        if pressed {
            self.drag_origin = pos;
        } else if released {
            self.drag_origin = None;
        }
    }

    fn apply_input(&mut self, input: FrameInput, ctx: &egui::Context) {
        if input.quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }
        if input.escape {
            if self.show_help {
                self.show_help = false;
                return;
            }
            if let Some(last) = self.last_esc {
                if last.elapsed().as_secs_f32() < 1.0 {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    return;
                }
            }
            self.last_esc = Some(Instant::now());
            self.toast = Some(Toast::new("Press Esc again to exit"));
            return;
        }
        if let Some(fullscreen) = input.fullscreen {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(fullscreen));
        }
        if input.toggle_help {
            self.show_help = !self.show_help;
        }

        if self.store.is_homepage_mode() {
            let count = self.home_entries.len();
            if input.home_up {
                self.home_selected = self.home_selected.saturating_sub(1);
            }
            if input.home_down && self.home_selected + 1 < count {
                self.home_selected += 1;
            }
            if input.home_open {
                if let Some(entry) = self.home_entries.get(self.home_selected).cloned() {
                    self.open_group(&entry.group);
                }
            }
            return;
        }
        if input.back_home {
            self.back_to_home();
            return;
        }

        let before = self.store.current_index();
        if input.next {
            self.store.next_slide();
        }
        if input.prev {
            self.store.prev_slide();
        }
        if input.first {
            self.store.first_slide();
        }
        if input.last {
            self.store.last_slide();
        }
        if self.store.current_index() != before {
            self.last_advance = Instant::now();
        }
        if input.toggle_presenting {
            self.store.toggle_presentation();
            self.last_advance = Instant::now();
        }
        if input.toggle_sidebar {
            self.store.toggle_sidebar();
        }
        if input.toggle_expand {
            self.store.toggle_expand(None);
        }
    }

    /// Advances on a timer while presenting with auto-play on.
    fn auto_advance(&mut self, ctx: &egui::Context) {
        let settings = &self.store.config().settings;
        if !self.store.is_presenting() || !self.store.config_ready() || !settings.auto_play {
            return;
        }
        let interval = Duration::from_millis(settings.auto_play_interval.max(100));
        let elapsed = self.last_advance.elapsed();
        if elapsed >= interval {
            self.store.next_slide();
            self.last_advance = Instant::now();
            ctx.request_repaint_after(interval);
        } else {
            ctx.request_repaint_after(interval - elapsed);
        }
    }

    fn sync_address(&mut self, ctx: &egui::Context) {
        if self.nav.sync(&self.store, &mut self.address).is_some() {
            let title = format!("{} | {}", self.store.config().title, self.address.full());
            if title != self.window_title {
                ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
                self.window_title = title;
            }
        }
    }

    fn draw_sidebar(&mut self, ctx: &egui::Context) {
        let mut clicked = None;
        let current = self.store.current_index();
        egui::SidePanel::left("slides")
            .resizable(false)
            .exact_width(SIDEBAR_WIDTH)
            .frame(
                egui::Frame::new()
                    .fill(self.theme.panel_background)
                    .inner_margin(12.0),
            )
            .show(ctx, |ui| {
                ui.heading(self.store.config().title.as_str());
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for (i, slide) in self.store.visible_slides().iter().enumerate() {
                        let label = if slide.title.is_empty() {
                            slide.file.clone()
                        } else {
                            slide.title.clone()
                        };
                        if ui
                            .selectable_label(i == current, format!("{}. {label}", i + 1))
                            .clicked()
                        {
                            clicked = Some(i);
                        }
                    }
                });
            });
        if let Some(i) = clicked {
            self.store.go_to_slide(i);
            self.last_advance = Instant::now();
        }
    }

    fn draw_notes(&self, ctx: &egui::Context) {
        let notes = self
            .store
            .current_slide()
            .map(|s| s.notes.clone())
            .unwrap_or_default();
        egui::TopBottomPanel::bottom("notes")
            .resizable(true)
            .min_height(80.0)
            .frame(
                egui::Frame::new()
                    .fill(self.theme.panel_background)
                    .inner_margin(12.0),
            )
            .show(ctx, |ui| {
                ui.label(egui::RichText::new("Speaker notes").strong());
                if notes.is_empty() {
                    ui.label(egui::RichText::new("No notes for this slide.").italics());
                } else {
                    ui.label(notes);
                }
            });
    }

    fn draw_deck(&self, ui: &egui::Ui, rect: egui::Rect, scale: f32, content: Option<&SlideContent>) {
        if !self.store.config_ready() {
            let message = if self.store.loading_config() {
                "Loading\u{2026}".to_string()
            } else {
                format!("No presentation found for \"{}\"", self.store.current_group())
            };
            draw_centered(ui, rect, &message, 32.0 * scale, self.theme.foreground);
            return;
        }

        match content {
            Some(content) => render::paint(ui, content, &self.theme, rect, scale),
            None => draw_centered(
                ui,
                rect,
                "This presentation has no visible slides",
                32.0 * scale,
                self.theme.foreground,
            ),
        }

        self.draw_chrome(ui, rect, scale);
    }

    fn draw_chrome(&self, ui: &egui::Ui, rect: egui::Rect, scale: f32) {
        let settings = &self.store.config().settings;

        if settings.show_progress {
            let height = 6.0 * scale.max(0.5);
            let track = egui::Rect::from_min_size(
                egui::pos2(rect.left(), rect.bottom() - height),
                egui::vec2(rect.width(), height),
            );
            ui.painter()
                .rect_filled(track, 0.0, Theme::with_opacity(self.theme.foreground, 0.1));
            let filled = egui::Rect::from_min_size(
                track.min,
                egui::vec2(rect.width() * self.store.progress() as f32 / 100.0, height),
            );
            ui.painter().rect_filled(filled, 0.0, self.theme.accent);
        }

        let counter_text = format!(
            "{} / {}",
            self.store.current_index() + 1,
            self.store.total_slides()
        );
        let counter_color = Theme::with_opacity(self.theme.foreground, 0.4);
        let counter_galley = ui.painter().layout_no_wrap(
            counter_text,
            egui::FontId::monospace(16.0 * scale.max(0.75)),
            counter_color,
        );
        let counter_pos = egui::pos2(
            rect.right() - counter_galley.rect.width() - 16.0,
            rect.bottom() - counter_galley.rect.height() - 16.0,
        );
        ui.painter().galley(counter_pos, counter_galley, counter_color);

        if !self.store.is_presenting() {
            let link_color = Theme::with_opacity(self.theme.accent, 0.8);
            let galley = ui.painter().layout_no_wrap(
                self.address.full(),
                egui::FontId::monospace(13.0),
                link_color,
            );
            ui.painter()
                .galley(egui::pos2(rect.left() + 12.0, rect.top() + 10.0), galley, link_color);
        }
    }

    fn draw_home(&mut self, ui: &egui::Ui, rect: egui::Rect, scale: f32) -> Option<String> {
        let mut chosen = None;
        let title = ui.painter().layout_no_wrap(
            "Presentations".to_string(),
            egui::FontId::proportional(56.0 * scale.max(0.5)),
            self.theme.heading_color,
        );
        let mut y = rect.top() + rect.height() * 0.2;
        ui.painter().galley(
            egui::pos2(rect.center().x - title.rect.width() / 2.0, y),
            title,
            self.theme.heading_color,
        );
        y += 96.0 * scale.max(0.5);

        if self.home_entries.is_empty() {
            draw_centered(ui, rect, "No presentations available", 28.0 * scale, self.theme.foreground);
            return None;
        }

        let row_height = 56.0 * scale.max(0.5);
        let row_width = rect.width().min(720.0);
        let hover = ui.ctx().input(|i| i.pointer.hover_pos());
        let clicked = ui.ctx().input(|i| i.pointer.primary_clicked());

        for (i, entry) in self.home_entries.iter().enumerate() {
            let row = egui::Rect::from_min_size(
                egui::pos2(rect.center().x - row_width / 2.0, y),
                egui::vec2(row_width, row_height - 8.0),
            );
            let hovered = hover.is_some_and(|p| row.contains(p));
            if hovered {
                self.home_selected = i;
            }
            let selected = i == self.home_selected;
            let bg = if selected {
                Theme::with_opacity(self.theme.accent, 0.35)
            } else {
                Theme::with_opacity(self.theme.panel_background, 0.9)
            };
            ui.painter().rect_filled(row, 8.0, bg);
            let galley = ui.painter().layout_no_wrap(
                entry.label.clone(),
                egui::FontId::proportional(24.0 * scale.max(0.75)),
                self.theme.foreground,
            );
            ui.painter().galley(
                egui::pos2(row.left() + 20.0, row.center().y - galley.rect.height() / 2.0),
                galley,
                self.theme.foreground,
            );
            if hovered && clicked {
                chosen = Some(entry.group.clone());
            }
            y += row_height;
        }
        chosen
    }

    fn draw_toast(&self, ui: &egui::Ui, rect: egui::Rect, scale: f32) {
        let Some(toast) = &self.toast else {
            return;
        };
        let opacity = toast.opacity();
        if opacity <= 0.0 {
            return;
        }
        let scale = scale.max(0.75);
        let toast_color = Theme::with_opacity(self.theme.foreground, opacity * 0.9);
        let toast_bg = Theme::with_opacity(self.theme.code_background, opacity * 0.9);
        let galley = ui.painter().layout_no_wrap(
            toast.message.clone(),
            egui::FontId::proportional(20.0 * scale),
            toast_color,
        );
        let padding = 16.0 * scale;
        let toast_rect = egui::Rect::from_min_size(
            egui::pos2(
                rect.center().x - galley.rect.width() / 2.0 - padding,
                rect.bottom() - 80.0 * scale,
            ),
            egui::vec2(
                galley.rect.width() + padding * 2.0,
                galley.rect.height() + padding * 2.0,
            ),
        );
        ui.painter().rect_filled(toast_rect, 8.0 * scale, toast_bg);
        let text_pos = egui::pos2(toast_rect.left() + padding, toast_rect.top() + padding);
        ui.painter().galley(text_pos, galley, toast_color);
        ui.ctx().request_repaint();
    }

    fn compute_scale(rect: egui::Rect) -> f32 {
        let ref_w = 1920.0;
        let ref_h = 1080.0;
        (rect.width() / ref_w).min(rect.height() / ref_h)
    }
}

impl eframe::App for PresentationViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let input = self.read_input(ctx);
        self.track_drag(ctx);
        self.apply_input(input, ctx);

        if let Some(fullscreen) = self.pending_fullscreen.take() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(fullscreen));
        }

        self.auto_advance(ctx);
        self.sync_address(ctx);

        if self.toast.as_ref().is_some_and(|t| t.is_expired()) {
            self.toast = None;
        }

        let homepage = self.store.is_homepage_mode();
        let presenting = self.store.is_presenting();
        let settings = self.store.config().settings.clone();

        if !homepage && !presenting && self.store.config_ready() {
            if settings.show_thumbnails && !self.store.is_sidebar_collapsed() {
                self.draw_sidebar(ctx);
            }
            if self.store.is_expanded() {
                self.draw_notes(ctx);
            }
        }

        let content = if homepage { None } else { self.current_content() };
        let bg = self.theme.background;
        let mut chosen = None;

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(bg).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                ui.painter().rect_filled(rect, 0.0, bg);
                let scale = Self::compute_scale(rect);

                if homepage {
                    chosen = self.draw_home(ui, rect, scale);
                } else {
                    self.draw_deck(ui, rect, scale, content.as_deref());
                }

                self.draw_toast(ui, rect, scale);
                if self.show_help {
                    draw_help(ui, &self.theme, rect, scale);
                }
            });

        if let Some(group) = chosen {
            self.open_group(&group);
        }
    }
}

fn draw_centered(ui: &egui::Ui, rect: egui::Rect, text: &str, size: f32, color: egui::Color32) {
    let galley = ui.painter().layout_no_wrap(
        text.to_string(),
        egui::FontId::proportional(size.max(16.0)),
        color,
    );
    let pos = rect.center() - galley.rect.size() / 2.0;
    ui.painter().galley(pos, galley, color);
}

fn draw_help(ui: &egui::Ui, theme: &Theme, rect: egui::Rect, scale: f32) {
    let shortcuts = [
        ("Space / N / \u{2192} / PgDn", "Next slide"),
        ("P / \u{2190} / PgUp", "Previous slide"),
        ("Home / End", "First / last slide"),
        ("Swipe", "Next / previous slide"),
        ("Enter", "Toggle presenting"),
        ("S", "Toggle slide list"),
        ("E", "Toggle speaker notes"),
        ("Backspace", "Back to presentations"),
        ("F", "Toggle fullscreen"),
        ("H", "Toggle this help"),
        ("Esc", "\u{00d7}2 exit"),
        ("Q", "Quit"),
    ];

    let scale = scale.max(0.75);
    let bg = Theme::with_opacity(theme.code_background, 0.92);
    let text_color = Theme::with_opacity(theme.foreground, 0.9);
    let key_color = Theme::with_opacity(theme.accent, 0.9);

    let padding = 24.0 * scale;
    let line_height = 32.0 * scale;
    let height = shortcuts.len() as f32 * line_height + padding * 2.0 + 40.0 * scale;
    let width = 440.0 * scale;
    let panel = egui::Rect::from_center_size(rect.center(), egui::vec2(width, height));
    ui.painter().rect_filled(panel, 12.0 * scale, bg);

    let title = ui.painter().layout_no_wrap(
        "Keyboard Shortcuts".to_string(),
        egui::FontId::proportional(20.0 * scale),
        theme.heading_color,
    );
    ui.painter().galley(
        egui::pos2(panel.left() + padding, panel.top() + padding),
        title,
        text_color,
    );

    let mut y = panel.top() + padding + 40.0 * scale;
    for (key, desc) in shortcuts {
        let key_galley = ui.painter().layout_no_wrap(
            key.to_string(),
            egui::FontId::monospace(15.0 * scale),
            key_color,
        );
        ui.painter()
            .galley(egui::pos2(panel.left() + padding, y), key_galley, key_color);
        let desc_galley = ui.painter().layout_no_wrap(
            desc.to_string(),
            egui::FontId::proportional(15.0 * scale),
            text_color,
        );
        ui.painter().galley(
            egui::pos2(panel.left() + padding + 220.0 * scale, y),
            desc_galley,
            text_color,
        );
        y += line_height;
    }
}

/// Presentations offered on the homepage: the signed-in user's records, or
/// just the requested group.
fn home_entries(client: Option<&ApiClient>, fallback_group: &str) -> Vec<HomeEntry> {
    let fallback = || {
        let mut groups = vec![fallback_group.to_string()];
        if fallback_group != DEFAULT_GROUP {
            groups.push(DEFAULT_GROUP.to_string());
        }
        groups
            .into_iter()
            .map(|group| HomeEntry {
                label: group.clone(),
                group,
            })
            .collect()
    };

    let Some(client) = client.filter(|c| c.session().is_authenticated()) else {
        return fallback();
    };
    let params = ListParams {
        limit: Some(HOME_LIST_LIMIT),
        ..ListParams::default()
    };
    match PptsApi::new(client).list(&params) {
        Ok(page) if !page.items.is_empty() => page
            .items
            .into_iter()
            .map(|r| HomeEntry {
                label: r
                    .title
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| r.name.clone()),
                group: r.name,
            })
            .collect(),
        Ok(_) => fallback(),
        Err(e) => {
            tracing::warn!("Could not list presentations: {e}");
            fallback()
        }
    }
}

pub fn run(loader: ConfigLoader, client: Option<ApiClient>, options: ViewerOptions) -> anyhow::Result<()> {
    let store = PresentationStore::new(loader.site().clone());
    let entries = if options.homepage {
        home_entries(client.as_ref(), &options.group)
    } else {
        Vec::new()
    };

    let title = format!("pptdeck | {}", options.group);
    let viewport = if options.windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(&title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(&title)
    };

    let native = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        &title,
        native,
        Box::new(move |_cc| {
            Ok(Box::new(PresentationViewer::new(
                store, loader, &options, entries,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeTransport;
    use crate::nav::SiteLocation;
    use crate::session::{SessionContext, sample_session};

    fn client(transport: &Rc<FakeTransport>, signed_in: bool) -> ApiClient {
        let session = Rc::new(SessionContext::in_memory());
        if signed_in {
            session.set(sample_session());
        }
        ApiClient::new(transport.clone(), "http://api.test/api/v1", session)
    }

    fn viewer(transport: &Rc<FakeTransport>, options: &ViewerOptions) -> PresentationViewer {
        let site = SiteLocation::new("http://site.test", "/");
        let loader = ConfigLoader::new(transport.clone(), site.clone());
        PresentationViewer::new(PresentationStore::new(site), loader, options, Vec::new())
    }

    fn options(group: &str, start_slide: usize, homepage: bool) -> ViewerOptions {
        ViewerOptions {
            group: group.into(),
            start_slide,
            homepage,
            windowed: true,
        }
    }

    const DECK: &str = r#"{"title":"Deck","settings":{"autoStartOnHome":true,"autoFullscreenOnHome":true},
        "slides":[{"id":"a","file":"a.html"},{"id":"b","file":"b.html"}]}"#;

    #[test]
    fn test_home_entries_anonymous_fallback() {
        let transport = Rc::new(FakeTransport::new());
        let entries = home_entries(Some(&client(&transport, false)), "demo");
        let groups: Vec<_> = entries.iter().map(|e| e.group.as_str()).collect();
        assert_eq!(groups, vec!["demo", "example"]);
        assert!(transport.requests.borrow().is_empty());
    }

    #[test]
    fn test_home_entries_from_records() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(
            200,
            r#"{"items":[{"id":1,"name":"q3","title":"Q3 Review"},{"id":2,"name":"launch"}]}"#,
        );
        let entries = home_entries(Some(&client(&transport, true)), "example");
        assert_eq!(
            entries,
            vec![
                HomeEntry {
                    group: "q3".into(),
                    label: "Q3 Review".into()
                },
                HomeEntry {
                    group: "launch".into(),
                    label: "launch".into()
                },
            ]
        );
    }

    #[test]
    fn test_viewer_starts_presenting_at_requested_slide() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(200, DECK);
        let viewer = viewer(&transport, &options("demo", 1, false));
        assert!(viewer.store.is_presenting());
        assert_eq!(viewer.store.current_index(), 1);
        assert!(viewer.toast.is_none());
    }

    #[test]
    fn test_viewer_reports_failed_load() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(404, "");
        let viewer = viewer(&transport, &options("missing", 0, false));
        assert!(!viewer.store.is_presenting());
        assert!(viewer.toast.is_some());
    }

    #[test]
    fn test_open_group_from_home_honours_settings() {
        let transport = Rc::new(FakeTransport::new());
        let mut viewer = viewer(&transport, &options("demo", 0, true));
        assert!(viewer.store.is_homepage_mode());
        assert!(transport.requests.borrow().is_empty());

        transport.respond(200, DECK);
        viewer.open_group("demo");
        assert!(!viewer.store.is_homepage_mode());
        assert!(viewer.store.is_presenting());
        assert_eq!(viewer.pending_fullscreen, Some(true));

        viewer.back_to_home();
        assert!(viewer.store.is_homepage_mode());
        assert!(!viewer.store.is_presenting());
    }

    #[test]
    fn test_slide_content_is_cached_per_file() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(200, DECK).respond(200, "<h1>A</h1>");
        let mut viewer = viewer(&transport, &options("demo", 0, false));

        let first = viewer.current_content().unwrap();
        let again = viewer.current_content().unwrap();
        assert_eq!(first.heading(), Some("A"));
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(transport.requests.borrow().len(), 2);
    }

    #[test]
    fn test_address_follows_navigation() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(200, DECK);
        let mut viewer = viewer(&transport, &options("demo", 0, false));

        viewer.nav.sync(&viewer.store, &mut viewer.address);
        assert_eq!(viewer.address.full(), "http://site.test/demo?slide=1");
        viewer.store.next_slide();
        viewer.nav.sync(&viewer.store, &mut viewer.address);
        assert_eq!(viewer.address.full(), "http://site.test/demo?slide=2");
    }
}
