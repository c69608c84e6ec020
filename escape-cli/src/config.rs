//! Configuration resolution for escape-room.

use anyhow::{Context, Result};
use escape_client::ClientConfig;
use std::path::{Path, PathBuf};

/// Default configuration file path (`<config dir>/escape-room/client.toml`).
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "ydun", "escape-room")
        .context("Could not determine home directory")?;
    Ok(dirs.config_dir().join("client.toml"))
}

/// Load the configuration at `path` (defaults when missing), then apply the
/// command-line server override.
pub fn load(path: &Path, server: Option<&str>) -> Result<ClientConfig> {
    let mut config = ClientConfig::load_or_default(path)?;
    if let Some(server) = server {
        config.server.base_url = server.to_string();
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("client.toml"), None).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn server_flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "[server]\nbase_url = \"http://from-file:5000\"\n").unwrap();

        let from_file = load(&path, None).unwrap();
        assert_eq!(from_file.server.base_url, "http://from-file:5000");

        let overridden = load(&path, Some("http://from-flag:5000")).unwrap();
        assert_eq!(overridden.server.base_url, "http://from-flag:5000");
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "[server\n").unwrap();
        assert!(load(&path, None).is_err());
    }
}
