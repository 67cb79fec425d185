use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub scte35: Scte35Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Role-specific ceilings for the bounded fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_manifest_timeout", with = "duration_serde::duration")]
    pub manifest_timeout: Duration,
    #[serde(default = "default_fragment_timeout", with = "duration_serde::duration")]
    pub fragment_timeout: Duration,
    #[serde(default = "default_max_manifest_size")]
    pub max_manifest_size: u64,
    #[serde(default = "default_max_fragment_size")]
    pub max_fragment_size: u64,
}

/// Fragment probing via ffprobe. Disable to skip fragment sampling
/// entirely (the analysis then reports manifest-declared data only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ffprobe_command")]
    pub ffprobe_command: String,
    #[serde(default = "default_probe_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
    #[serde(default = "default_fragments_per_level")]
    pub fragments_per_level: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scte35Config {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            manifest_timeout: default_manifest_timeout(),
            fragment_timeout: default_fragment_timeout(),
            max_manifest_size: default_max_manifest_size(),
            max_fragment_size: default_max_fragment_size(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ffprobe_command: default_ffprobe_command(),
            timeout: default_probe_timeout(),
            fragments_per_level: default_fragments_per_level(),
        }
    }
}

impl Default for Scte35Config {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            fetch: FetchConfig::default(),
            probe: ProbeConfig::default(),
            scte35: Scte35Config::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, creating it with defaults
    /// when it does not exist yet.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.fetch.manifest_timeout, Duration::from_secs(30));
        assert_eq!(config.fetch.max_manifest_size, 10 * 1024 * 1024);
        assert!(config.probe.enabled);
        assert_eq!(config.probe.fragments_per_level, 2);
        assert!(config.scte35.enabled);
    }

    #[test]
    fn partial_config_overrides() {
        let config: Config = toml::from_str(
            r#"
            [fetch]
            fragment_timeout = "5s"
            max_fragment_size = 1048576

            [probe]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.fragment_timeout, Duration::from_secs(5));
        assert_eq!(config.fetch.max_fragment_size, 1_048_576);
        assert!(!config.probe.enabled);
        // untouched sections keep defaults
        assert_eq!(config.fetch.manifest_timeout, Duration::from_secs(30));
    }
}
