use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    /// Flags handed to the `ls` stage of the result pipeline.
    #[serde(default = "default_switches")]
    pub switches: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            switches: default_switches(),
        }
    }
}

fn default_switches() -> String {
    "-dilsb".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Directory names excluded from indexing, resolved relative to the root.
    #[serde(default = "default_prunepaths")]
    pub prunepaths: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            prunepaths: default_prunepaths(),
        }
    }
}

fn default_prunepaths() -> Vec<String> {
    vec![
        ".git".to_string(),
        ".hg".to_string(),
        ".svn".to_string(),
        ".bzr".to_string(),
        "CVS".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ToolsConfig {
    /// Name of the search executable.
    #[serde(default = "default_locate")]
    pub locate: String,
    /// Name of the index-build executable.
    #[serde(default = "default_updatedb")]
    pub updatedb: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            locate: default_locate(),
            updatedb: default_updatedb(),
        }
    }
}

fn default_locate() -> String {
    "locate".to_string()
}

fn default_updatedb() -> String {
    "updatedb".to_string()
}

/// Load configuration from a TOML file. A missing file is not an error:
/// every option has a default, so the tool runs unconfigured.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.listing.switches.trim().is_empty() {
        anyhow::bail!("listing.switches must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let config = load_config(Path::new("/nonexistent/dblocate.toml")).unwrap();
        assert_eq!(config.listing.switches, "-dilsb");
        assert_eq!(config.tools.locate, "locate");
        assert_eq!(config.tools.updatedb, "updatedb");
        assert!(config.index.prunepaths.contains(&".git".to_string()));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [tools]
            locate = "glocate"
            "#,
        )
        .unwrap();
        assert_eq!(config.tools.locate, "glocate");
        assert_eq!(config.tools.updatedb, "updatedb");
        assert_eq!(config.listing.switches, "-dilsb");
    }

    #[test]
    fn prune_list_can_be_emptied() {
        let config: Config = toml::from_str(
            r#"
            [index]
            prunepaths = []
            "#,
        )
        .unwrap();
        assert!(config.index.prunepaths.is_empty());
    }
}
