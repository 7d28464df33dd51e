use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::cli::SlidesCommands;
use crate::config::Config;
use crate::devserver::PresentationFiles;
use crate::model::PresentationConfig;

pub fn run(root: Option<PathBuf>, command: SlidesCommands) -> Result<()> {
    let config = Config::load_or_default();
    let files = PresentationFiles::new(super::project_root(root, &config));

    match command {
        SlidesCommands::List { group } => {
            let deck = files.load_config(&group)?;
            print!("{}", format_listing(&deck));
        }
        SlidesCommands::Add {
            group,
            file,
            title,
            template,
        } => {
            let slide = files.create_slide(
                &group,
                &file,
                template.as_deref().unwrap_or_default(),
                title.as_deref().unwrap_or_default(),
            )?;
            println!(
                "{} {} ({})",
                "Added".green(),
                slide.file.bold(),
                slide.id.dimmed()
            );
        }
        SlidesCommands::Duplicate { group, file, title } => {
            let title = match title {
                Some(t) => t,
                None => files
                    .load_config(&group)?
                    .slides
                    .into_iter()
                    .find(|s| s.file == file)
                    .map(|s| s.title)
                    .unwrap_or_default(),
            };
            let slide = files.duplicate_slide(&group, &file, &title)?;
            println!(
                "{} {} as {}",
                "Duplicated".green(),
                file,
                slide.file.bold()
            );
        }
        SlidesCommands::Reorder { group, from, to } => {
            if from < 1 || to < 1 {
                anyhow::bail!("Positions start at 1");
            }
            files.reorder_slides(&group, from - 1, to - 1)?;
            println!("{} slide {from} to position {to}", "Moved".green());
        }
        SlidesCommands::Remove { group, file, id } => {
            let file = file.unwrap_or_default();
            let id = id.unwrap_or_default();
            files.delete_slide(&group, &id, &file)?;
            let target = if file.is_empty() { id } else { file };
            println!("{} {}", "Removed".green(), target);
        }
        SlidesCommands::Save { group, file, from } => {
            let html = read_source(&from)?;
            files.save_slide_html(&group, &file, &html)?;
            println!("{} {} ({} bytes)", "Saved".green(), file.bold(), html.len());
        }
    }
    Ok(())
}

fn read_source(from: &Path) -> Result<String> {
    if from == Path::new("-") {
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .context("Failed to read slide HTML from stdin")?;
        return Ok(html);
    }
    std::fs::read_to_string(from).with_context(|| format!("Failed to read {}", from.display()))
}

fn format_listing(deck: &PresentationConfig) -> String {
    let mut out = format!("{}\n", deck.title.bold());
    if deck.slides.is_empty() {
        out.push_str(&format!("  {}\n", "No slides".dimmed()));
        return out;
    }
    for (i, slide) in deck.slides.iter().enumerate() {
        let title = if slide.title.is_empty() {
            "(untitled)".to_string()
        } else {
            slide.title.clone()
        };
        let hidden = if slide.visible {
            String::new()
        } else {
            format!(" {}", "[hidden]".yellow())
        };
        out.push_str(&format!(
            "  {:>3}. {title}  {}{hidden}\n",
            i + 1,
            slide.file.dimmed()
        ));
    }
    out
}
