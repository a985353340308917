//! Config subcommands handler

use anyhow::Result;
use std::path::Path;

use super::load_config;

/// Show the effective configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show(cache_dir: Option<&Path>) -> Result<()> {
    let config = load_config(cache_dir)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
