//! `profile` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;

use crate::cli::ProfileArgs;

/// Print the effective capture profile as TOML or JSON
pub fn run_profile(args: &ProfileArgs) -> Result<()> {
    println!("{}", render_profile(args)?);
    Ok(())
}

fn render_profile(args: &ProfileArgs) -> Result<String> {
    let profile = ConfigLoader::load(args.profile.as_deref()).context("Failed to load profile")?;
    let rendered = if args.json {
        ConfigLoader::to_json(&profile)
    } else {
        ConfigLoader::to_toml(&profile)
    };
    rendered.context("Failed to render profile")
}
