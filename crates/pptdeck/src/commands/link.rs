use anyhow::Result;

use crate::config::Config;
use crate::model::is_valid_group_name;

pub fn run(group: &str, slide: usize) -> Result<()> {
    if !is_valid_group_name(group) {
        anyhow::bail!("Invalid group name: {group}");
    }
    if slide == 0 {
        anyhow::bail!("Slides are numbered from 1");
    }
    let config = Config::load_or_default();
    println!("{}", super::site(&config).deep_link(group, slide - 1));
    Ok(())
}
