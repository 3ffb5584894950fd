use anyhow::{Context, Result};
use std::path::Path;

mod config;
mod counts;
mod gtf;
mod io;
mod manifest;
mod normalize;
mod regions;
mod strandedness;
mod table;
mod tasks;
mod tin;
mod transcripts;

use config::Config;
use tasks::Step;

pub fn run(toml_file: &Path) -> Result<()> {
    let raw_config = ex::fs::read_to_string(toml_file)
        .with_context(|| format!("Could not read toml file: {}", toml_file.to_string_lossy()))?;
    let mut parsed = toml::from_str::<Config>(&raw_config)
        .with_context(|| format!("Could not parse toml file: {}", toml_file.to_string_lossy()))?;
    parsed.check().context("Error in configuration")?;

    log::info!("Running {}", parsed.task);
    parsed
        .task
        .run(&parsed.input, &parsed.output)
        .with_context(|| format!("Error in {}", parsed.task))?;

    Ok(())
}
