//! Show and create the client configuration.

use anyhow::{Context, Result};
use escape_client::ClientConfig;
use std::path::Path;

/// Print the effective configuration.
pub fn show(path: &Path, config: &ClientConfig) -> Result<()> {
    let source = if path.exists() { "file" } else { "defaults" };
    println!("# {} ({})", path.display(), source);
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Write a default configuration file.
pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file {} already exists (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create config directory")?;
    }

    let contents = ClientConfig::default().to_toml()?;
    tokio::fs::write(path, contents)
        .await
        .context("Failed to write config file")?;

    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
