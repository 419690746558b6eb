//! CLI command implementations.

pub mod config;
pub mod list;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use tessera_config::{ConfigLoader, TesseraConfig};

/// Loads layered configuration rooted at `dir`, or the current directory.
pub fn load_config(dir: Option<&Path>) -> Result<TesseraConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(dir) = dir {
        loader = loader.with_project_dir(dir);
    }
    loader.load().context("Failed to load configuration")
}
