//! Prepares a built site for static hosting: a fresh copy of every
//! presentation under `dist/presentations`, and a `404.html` so hosts without
//! rewrites still reach the app on deep links.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use walkdir::WalkDir;

pub fn run(dist: &Path, presentations: &Path) -> Result<()> {
    let copied = copy_presentations(presentations, dist)?;
    match copied {
        Some(count) => println!(
            "{} {count} files into {}",
            "Copied".green(),
            dist.join("presentations").display()
        ),
        None => eprintln!(
            "{} {} not found, nothing copied",
            "Warning:".yellow(),
            presentations.display()
        ),
    }

    if write_not_found_page(dist)? {
        println!("{} {}", "Wrote".green(), dist.join("404.html").display());
    } else {
        eprintln!(
            "{} no index.html in {}, skipped 404.html",
            "Warning:".yellow(),
            dist.display()
        );
    }
    Ok(())
}

/// Replaces `dist/presentations` with a copy of `src`. Returns the number of
/// files copied, or `None` when `src` does not exist.
fn copy_presentations(src: &Path, dist: &Path) -> Result<Option<usize>> {
    if !src.is_dir() {
        return Ok(None);
    }
    let dest = dist.join("presentations");
    if dest.exists() {
        std::fs::remove_dir_all(&dest)
            .with_context(|| format!("Failed to remove {}", dest.display()))?;
    }
    std::fs::create_dir_all(&dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;

    let mut count = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            count += 1;
        }
    }
    tracing::debug!(count, dest = %dest.display(), "presentations copied");
    Ok(Some(count))
}

/// Copies `index.html` to `404.html`. Returns false when there is no index.
fn write_not_found_page(dist: &Path) -> Result<bool> {
    let index = dist.join("index.html");
    if !index.is_file() {
        return Ok(false);
    }
    let html = std::fs::read_to_string(&index)
        .with_context(|| format!("Failed to read {}", index.display()))?;
    let target = dist.join("404.html");
    std::fs::write(&target, html).with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(true)
}
