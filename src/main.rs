use anyhow::{Context, Result};
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    if std::env::var("NO_FRIENDLY_PANIC").is_err() {
        human_panic::setup_panic!();
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let toml_file: PathBuf = std::env::args()
        .nth(1)
        .context("Usage: mbf-count-matrix <config.toml>")?
        .into();
    mbf_count_matrix::run(&toml_file)
}
