//! Runtime configuration for keep-alive-cache.
//!
//! Configuration can be loaded from a JSON file or constructed programmatically.
//! Provider knobs (capacity, include/exclude matchers, identification) live here.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::cache::evictor::DEFAULT_CAPACITY;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "keep-alive-host", about = "Keep-alive provider host with an inspection API")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Capacity override; 0 disables the bound.
    #[arg(long)]
    pub max: Option<usize>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Caller-supplied name matcher. Forwarded to consumers, never evaluated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Matcher {
    Name(String),
    List(Vec<String>),
    Pattern { pattern: String },
}

/// Keep-alive provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider identification; generated when absent.
    #[serde(default)]
    pub identification: Option<String>,

    /// Maximum retained entries. `null` or `0` disables the bound.
    #[serde(default = "default_max")]
    pub max: Option<usize>,

    #[serde(default)]
    pub include: Option<Matcher>,

    #[serde(default)]
    pub exclude: Option<Matcher>,

    /// Field of a JSON content value holding its owner key.
    #[serde(default = "default_owner_field")]
    pub owner_field: String,
}

fn default_max() -> Option<usize> {
    Some(DEFAULT_CAPACITY)
}

fn default_owner_field() -> String {
    "key".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            identification: None,
            max: default_max(),
            include: None,
            exclude: None,
            owner_field: default_owner_field(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply command-line overrides on top of the loaded file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if let Some(max) = cli.max {
            self.provider.max = Some(max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.provider.max, Some(10));
        assert_eq!(cfg.provider.owner_field, "key");
        assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"provider": {{"max": 3, "include": ["home", "list"], "exclude": {{"pattern": "^tmp"}}}}}}"#
        )
        .unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.provider.max, Some(3));
        assert_eq!(
            cfg.provider.include,
            Some(Matcher::List(vec!["home".into(), "list".into()]))
        );
        assert_eq!(
            cfg.provider.exclude,
            Some(Matcher::Pattern { pattern: "^tmp".into() })
        );
        assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    }

    #[test]
    fn test_null_max_disables_bound() {
        let cfg: Config = serde_json::from_str(r#"{"provider": {"max": null}}"#).unwrap();
        assert_eq!(cfg.provider.max, None);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg.provider.max, Some(10));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["keep-alive-host", "--max", "0", "--listen", "127.0.0.1:9000"]);
        let mut cfg = Config::default();
        cfg.apply_cli(&cli);
        assert_eq!(cfg.provider.max, Some(0));
        assert_eq!(cfg.server.listen, "127.0.0.1:9000");
    }
}
