//! Configuration display.

use anyhow::Result;
use tessera_config::TesseraConfig;

/// Prints the merged configuration as TOML.
pub fn show(config: &TesseraConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
