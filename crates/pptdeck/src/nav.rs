//! Deep links and the one-way sync of navigation state into an address bar.
//!
//! A deep link is `{base}{group}?slide=N` where `N` is 1-based. The group is
//! the last path segment after the base prefix.

use crate::model::DEFAULT_GROUP;
use crate::store::PresentationStore;

/// Where presentations are published: origin plus the base path the site is
/// mounted under (always starting and ending with `/`).
#[derive(Debug, Clone, PartialEq)]
pub struct SiteLocation {
    origin: String,
    base_path: String,
}

impl SiteLocation {
    pub fn new(origin: &str, base_path: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            base_path: normalize_base(base_path),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Path of a group folder, e.g. `/presentations/demo`.
    pub fn group_base_path(&self, group: &str) -> String {
        if group.is_empty() {
            String::new()
        } else {
            format!("{}presentations/{group}", self.base_path)
        }
    }

    pub fn absolute(&self, path: &str) -> String {
        format!("{}{path}", self.origin)
    }

    pub fn config_url(&self, group: &str) -> String {
        self.absolute(&format!(
            "{}/{}",
            self.group_base_path(group),
            crate::model::CONFIG_FILENAME
        ))
    }

    pub fn slide_url(&self, group: &str, file: &str) -> String {
        self.absolute(&format!("{}/slides/{file}", self.group_base_path(group)))
    }

    pub fn deep_link(&self, group: &str, index: usize) -> String {
        self.absolute(&deep_link_path(&self.base_path, group, index))
    }
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

pub fn deep_link_path(base_path: &str, group: &str, index: usize) -> String {
    format!("{}{group}?slide={}", normalize_base(base_path), index + 1)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeepLink {
    pub group: String,
    /// 0-based.
    pub slide_index: usize,
}

impl DeepLink {
    /// Accepts a full URL or a path with optional query. Unknown or missing
    /// parts fall back to the default group and the first slide.
    pub fn parse(link: &str, base_path: &str) -> Self {
        let (path, query) = match url::Url::parse(link) {
            Ok(url) => (
                url.path().to_string(),
                url.query().map(str::to_string).unwrap_or_default(),
            ),
            Err(_) => match link.split_once('?') {
                Some((p, q)) => (p.to_string(), q.to_string()),
                None => (link.to_string(), String::new()),
            },
        };

        let base = normalize_base(base_path);
        let rest = path
            .strip_prefix(&base)
            .or_else(|| path.strip_prefix(base.trim_end_matches('/')))
            .unwrap_or(&path);
        let group = rest
            .trim_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_GROUP)
            .to_string();

        let slide_index = url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "slide")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n - 1)
            .unwrap_or(0);

        Self { group, slide_index }
    }
}

/// Anything that can show the current location.
pub trait AddressBar {
    fn replace(&mut self, path: &str);
}

/// Pushes the store's group and slide into an address bar whenever they
/// change. Homepage mode is never reflected.
#[derive(Debug, Default)]
pub struct NavigationSync {
    last: Option<String>,
}

impl NavigationSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path when it was pushed.
    pub fn sync(&mut self, store: &PresentationStore, bar: &mut dyn AddressBar) -> Option<String> {
        if store.is_homepage_mode() {
            return None;
        }
        let path = deep_link_path(
            store.site().base_path(),
            store.current_group(),
            store.current_index(),
        );
        if self.last.as_deref() == Some(path.as_str()) {
            return None;
        }
        bar.replace(&path);
        self.last = Some(path.clone());
        Some(path)
    }
}

/// Base path the static site is published under. Local builds use `/`; on
/// GitHub Pages user/org sites (`<owner>.github.io`) use `/`, project sites
/// use `/<repo>/`.
pub fn site_base_path(github_pages: bool, repository: Option<&str>) -> String {
    let repository = repository.unwrap_or_default();
    if !github_pages && repository.is_empty() {
        return "/".to_string();
    }
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
            if repo.eq_ignore_ascii_case(&format!("{owner}.github.io")) {
                "/".to_string()
            } else {
                format!("/{repo}/")
            }
        }
        _ => "/".to_string(),
    }
}

pub fn site_base_path_from_env() -> String {
    let pages = std::env::var("GITHUB_PAGES").is_ok_and(|v| v == "true");
    let repository = std::env::var("GITHUB_REPOSITORY").ok();
    site_base_path(pages, repository.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBar(Vec<String>);

    impl AddressBar for RecordingBar {
        fn replace(&mut self, path: &str) {
            self.0.push(path.to_string());
        }
    }

    #[test]
    fn test_site_location_urls() {
        let site = SiteLocation::new("http://localhost:5173/", "deck");
        assert_eq!(site.base_path(), "/deck/");
        assert_eq!(site.group_base_path("demo"), "/deck/presentations/demo");
        assert_eq!(
            site.config_url("demo"),
            "http://localhost:5173/deck/presentations/demo/slides.config.json"
        );
        assert_eq!(
            site.slide_url("demo", "intro.html"),
            "http://localhost:5173/deck/presentations/demo/slides/intro.html"
        );
        assert_eq!(site.group_base_path(""), "");
    }

    #[test]
    fn test_deep_link_path_is_one_based() {
        assert_eq!(deep_link_path("/", "demo", 0), "/demo?slide=1");
        assert_eq!(deep_link_path("/repo/", "demo", 4), "/repo/demo?slide=5");
    }

    #[test]
    fn test_parse_full_url_with_base() {
        let link = DeepLink::parse("https://me.github.io/repo/q3-review?slide=3", "/repo/");
        assert_eq!(link.group, "q3-review");
        assert_eq!(link.slide_index, 2);
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(
            DeepLink::parse("/", "/"),
            DeepLink {
                group: "example".into(),
                slide_index: 0
            }
        );
        let link = DeepLink::parse("/repo", "/repo/");
        assert_eq!(link.group, "example");

        let link = DeepLink::parse("/demo?slide=0", "/");
        assert_eq!(link.slide_index, 0);
        let link = DeepLink::parse("/demo?slide=abc&x=1", "/");
        assert_eq!(link.group, "demo");
        assert_eq!(link.slide_index, 0);
    }

    #[test]
    fn test_parse_uses_trailing_segment() {
        let link = DeepLink::parse("/presentations/demo/?slide=2", "/");
        assert_eq!(link.group, "demo");
        assert_eq!(link.slide_index, 1);
    }

    #[test]
    fn test_sync_skips_unchanged_and_homepage() {
        let mut store = PresentationStore::new(SiteLocation::new("http://x", "/"));
        let mut bar = RecordingBar::default();
        let mut sync = NavigationSync::new();

        assert_eq!(sync.sync(&store, &mut bar).as_deref(), Some("/example?slide=1"));
        assert!(sync.sync(&store, &mut bar).is_none());

        store.set_group("demo");
        sync.sync(&store, &mut bar);
        store.set_homepage_mode(true);
        assert!(sync.sync(&store, &mut bar).is_none());

        assert_eq!(bar.0, vec!["/example?slide=1", "/demo?slide=1"]);
    }

    #[test]
    fn test_site_base_path_rules() {
        assert_eq!(site_base_path(false, None), "/");
        assert_eq!(site_base_path(true, Some("ada/slides")), "/slides/");
        assert_eq!(site_base_path(false, Some("ada/Ada.GitHub.io")), "/");
        assert_eq!(site_base_path(true, None), "/");
    }
}
