//! Config inspection commands

use std::path::Path;

use anyhow::Result;

use super::{config_target, load_config};

pub fn cmd_config_path(config_path: Option<&Path>) -> Result<()> {
    let target = config_target(config_path)?;
    let state = if target.exists() {
        "exists"
    } else {
        "not created yet, using built-in defaults"
    };
    println!("{} ({})", target.display(), state);
    Ok(())
}

pub fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
