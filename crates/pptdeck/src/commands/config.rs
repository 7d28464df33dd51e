use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let path = Config::path()?;
    let config = Config::load_or_default();

    println!("{} {}", "Config file:".bold(), path.display());
    if !path.exists() {
        println!("  {}", "(not created yet, showing defaults)".dimmed());
    }
    println!();
    println!("{}", "api".bold());
    println!("  base_url      {}", config.api_base_url());
    println!("{}", "site".bold());
    println!("  url           {}", config.site_url());
    println!("  base_path     {}", config.site_base_path());
    println!("  default_group {}", config.default_group());
    println!("{}", "server".bold());
    println!("  host          {}", config.server_host());
    println!("  port          {}", config.server_port());
    println!("  root          {}", config.server_root().display());
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_or_default();
    config.set(key, value)?;
    let path = config.save()?;
    println!("{} {key} = {value}", "Set".green());
    println!("  {}", path.display().to_string().dimmed());
    Ok(())
}
