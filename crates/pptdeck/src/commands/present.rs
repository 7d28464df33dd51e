use anyhow::Result;

use crate::app::{self, ViewerOptions};
use crate::config::Config;
use crate::loader::ConfigLoader;
use crate::nav::DeepLink;

pub struct PresentArgs {
    pub group: Option<String>,
    /// 1-indexed.
    pub slide: Option<usize>,
    pub link: Option<String>,
    pub home: bool,
    pub windowed: bool,
}

pub fn run(args: PresentArgs) -> Result<()> {
    let config = Config::load_or_default();
    let site = super::site(&config);
    let (group, start_slide) = target(&args, &config, site.base_path());
    tracing::info!(group = %group, slide = start_slide + 1, "opening presentation");

    let transport = super::transport();
    let client = super::api_client(&config, transport.clone());
    let loader = ConfigLoader::new(transport, site).with_records(client.clone());

    app::run(
        loader,
        Some(client),
        ViewerOptions {
            group,
            start_slide,
            homepage: args.home,
            windowed: args.windowed,
        },
    )
}

/// Group and 0-based slide to open: a deep link wins, then the arguments,
/// then the configured default group.
fn target(args: &PresentArgs, config: &Config, base_path: &str) -> (String, usize) {
    if let Some(link) = &args.link {
        let parsed = DeepLink::parse(link, base_path);
        return (parsed.group, parsed.slide_index);
    }
    let group = args
        .group
        .clone()
        .unwrap_or_else(|| config.default_group());
    let slide = args.slide.unwrap_or(1).saturating_sub(1);
    (group, slide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    fn args() -> PresentArgs {
        PresentArgs {
            group: None,
            slide: None,
            link: None,
            home: false,
            windowed: true,
        }
    }

    #[test]
    fn test_target_defaults_to_configured_group() {
        let config = Config {
            site: Some(SiteConfig {
                default_group: Some("welcome".into()),
                ..SiteConfig::default()
            }),
            ..Config::default()
        };
        assert_eq!(target(&args(), &config, "/"), ("welcome".to_string(), 0));
    }

    #[test]
    fn test_target_slide_is_one_indexed() {
        let a = PresentArgs {
            group: Some("demo".into()),
            slide: Some(3),
            ..args()
        };
        assert_eq!(target(&a, &Config::default(), "/"), ("demo".to_string(), 2));

        let a = PresentArgs {
            group: Some("demo".into()),
            slide: Some(0),
            ..args()
        };
        assert_eq!(target(&a, &Config::default(), "/"), ("demo".to_string(), 0));
    }

    #[test]
    fn test_target_from_deep_link() {
        let a = PresentArgs {
            link: Some("https://me.github.io/decks/q3?slide=4".into()),
            ..args()
        };
        assert_eq!(target(&a, &Config::default(), "/decks/"), ("q3".to_string(), 3));
    }
}
