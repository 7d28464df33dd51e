use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;
use crate::devserver::DevServer;

pub fn run(
    root: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    site: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load_or_default();
    let root = super::project_root(root, &config);
    if !root.is_dir() {
        anyhow::bail!("Project root not found: {}", root.display());
    }

    let mut server = DevServer::new(
        &root,
        host.unwrap_or_else(|| config.server_host()),
        port.unwrap_or_else(|| config.server_port()),
    );
    if let Some(site) = site {
        if !site.join("index.html").is_file() {
            anyhow::bail!("No index.html in {}", site.display());
        }
        server = server.with_site_dir(site);
    }

    eprintln!(
        "{} {}",
        "Serving presentations from".dimmed(),
        root.join("presentations").display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(server.run())
}
