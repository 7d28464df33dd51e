use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::devserver::PresentationFiles;

pub fn run(
    group: &str,
    title: Option<String>,
    description: Option<String>,
    root: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load_or_default();
    let files = PresentationFiles::new(super::project_root(root, &config));

    let created = files.create_presentation(
        group,
        title.as_deref().unwrap_or_default(),
        description.as_deref().unwrap_or_default(),
    )?;

    println!(
        "{} {}",
        "Created presentation".green(),
        created.paths.group.bold()
    );
    println!("  {}  {}", "config".dimmed(), created.paths.config_path.display());
    println!("  {}  {}", "slides".dimmed(), created.paths.slides_dir.display());
    println!();
    println!(
        "Add a slide with: pptdeck slides add {} intro.html --title \"Intro\"",
        created.paths.group
    );
    Ok(())
}
