//! Configuration management for the partwise CLI
//!
//! Config file location: ~/.partwise/config.toml
//!
//! Example config:
//! ```toml
//! [default]
//! endpoint = "http://localhost:9000"
//! access_key = "minioadmin"
//! secret_key = "minioadmin"
//! region = "us-east-1"
//! part_size = 41943040
//!
//! [backups]
//! region = "eu-west-1"
//! path_style = false
//! on_part_size_conflict = "restart"
//! ```
//!
//! A profile without an endpoint or credentials falls back to the standard
//! AWS environment and shared config files. Transfer settings a profile leaves
//! out come from the `--config` file, or from `PARTWISE_*` variables when no
//! file is given.

use anyhow::{Context, Result};
use partwise_core::{PartSizeConflict, TransferConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// One named profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// S3 endpoint URL
    pub endpoint: Option<String>,

    /// Access key ID
    pub access_key: Option<String>,

    /// Secret access key
    pub secret_key: Option<String>,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Path style access (use path instead of virtual hosted style)
    #[serde(default = "default_true")]
    pub path_style: bool,

    /// Part size for multipart uploads (bytes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_size: Option<u64>,

    /// Smallest part size the endpoint accepts (bytes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_part_size: Option<u64>,

    /// Files below this size are uploaded in a single request (bytes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multipart_threshold: Option<u64>,

    /// Download copy buffer (bytes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,

    /// What to do with an open session that used another part size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_part_size_conflict: Option<PartSizeConflict>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: None,
            secret_key: None,
            region: default_region(),
            path_style: default_true(),
            part_size: None,
            min_part_size: None,
            multipart_threshold: None,
            buffer_size: None,
            on_part_size_conflict: None,
        }
    }
}

/// Configuration file with multiple profiles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub profiles: BTreeMap<String, Config>,
}

impl ConfigFile {
    fn read() -> Result<Self> {
        let config_path = Config::config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")
    }

    fn write(&self) -> Result<()> {
        let config_path = Config::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let home = directories::BaseDirs::new()
            .context("Could not determine home directory")?
            .home_dir()
            .to_path_buf();

        Ok(home.join(".partwise"))
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load a profile from the config file, then apply environment overrides
    pub fn load(profile: Option<&str>) -> Result<Self> {
        let profile_name = profile.unwrap_or("default");

        let mut config = ConfigFile::read()?
            .profiles
            .remove(profile_name)
            .unwrap_or_default();

        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `PARTWISE_*` and `AWS_*` overrides; the AWS names win when both are set
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(endpoint) = var("PARTWISE_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = var("AWS_ENDPOINT_URL") {
            self.endpoint = Some(endpoint);
        }
        if let Some(access_key) = var("PARTWISE_ACCESS_KEY") {
            self.access_key = Some(access_key);
        }
        if let Some(access_key) = var("AWS_ACCESS_KEY_ID") {
            self.access_key = Some(access_key);
        }
        if let Some(secret_key) = var("PARTWISE_SECRET_KEY") {
            self.secret_key = Some(secret_key);
        }
        if let Some(secret_key) = var("AWS_SECRET_ACCESS_KEY") {
            self.secret_key = Some(secret_key);
        }
        if let Some(region) = var("PARTWISE_REGION") {
            self.region = region;
        }
        if let Some(region) = var("AWS_REGION") {
            self.region = region;
        }
        if let Some(size) = var("PARTWISE_PART_SIZE") {
            self.part_size = Some(
                size.parse()
                    .with_context(|| format!("Invalid PARTWISE_PART_SIZE: {}", size))?,
            );
        }
        if let Some(size) = var("PARTWISE_MULTIPART_THRESHOLD") {
            self.multipart_threshold = Some(
                size.parse()
                    .with_context(|| format!("Invalid PARTWISE_MULTIPART_THRESHOLD: {}", size))?,
            );
        }
        if let Some(policy) = var("PARTWISE_ON_PART_SIZE_CONFLICT") {
            self.on_part_size_conflict = Some(policy.parse()?);
        }
        Ok(())
    }

    /// Save this profile, keeping the others in the file
    pub fn save(&self, profile: Option<&str>) -> Result<()> {
        let profile_name = profile.unwrap_or("default");

        let mut config_file = ConfigFile::read()?;
        config_file
            .profiles
            .insert(profile_name.to_string(), self.clone());
        config_file.write()
    }

    /// List all profiles
    pub fn list_profiles() -> Result<Vec<String>> {
        Ok(ConfigFile::read()?.profiles.keys().cloned().collect())
    }

    /// Delete a profile
    pub fn delete_profile(profile: &str) -> Result<()> {
        let mut config_file = ConfigFile::read()?;
        if config_file.profiles.remove(profile).is_some() {
            config_file.write()?;
        }
        Ok(())
    }

    /// Engine settings: this profile's values laid over `base`
    pub fn transfer_config(&self, base: TransferConfig) -> Result<TransferConfig> {
        let config = TransferConfig {
            part_size: self.part_size.unwrap_or(base.part_size),
            min_part_size: self.min_part_size.unwrap_or(base.min_part_size),
            buffer_size: self.buffer_size.unwrap_or(base.buffer_size),
            multipart_threshold: self.multipart_threshold.unwrap_or(base.multipart_threshold),
            on_part_size_conflict: self
                .on_part_size_conflict
                .unwrap_or(base.on_part_size_conflict),
        };
        config.validate()?;
        Ok(config)
    }

    /// Get a config value by key name
    pub fn get_value(&self, key: &str) -> Option<String> {
        match key {
            "endpoint" => self.endpoint.clone(),
            "access_key" => self.access_key.clone(),
            "secret_key" => self.secret_key.as_ref().map(|_| "***".to_string()), // Hide secret
            "region" => Some(self.region.clone()),
            "path_style" => Some(self.path_style.to_string()),
            "part_size" => self.part_size.map(|v| v.to_string()),
            "min_part_size" => self.min_part_size.map(|v| v.to_string()),
            "multipart_threshold" => self.multipart_threshold.map(|v| v.to_string()),
            "buffer_size" => self.buffer_size.map(|v| v.to_string()),
            "on_part_size_conflict" => self.on_part_size_conflict.map(|p| {
                match p {
                    PartSizeConflict::Reject => "reject",
                    PartSizeConflict::Restart => "restart",
                }
                .to_string()
            }),
            _ => None,
        }
    }

    /// Set a config value by key name
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "endpoint" => self.endpoint = Some(value.to_string()),
            "access_key" => self.access_key = Some(value.to_string()),
            "secret_key" => self.secret_key = Some(value.to_string()),
            "region" => self.region = value.to_string(),
            "path_style" => self.path_style = value.parse()?,
            "part_size" => self.part_size = Some(value.parse()?),
            "min_part_size" => self.min_part_size = Some(value.parse()?),
            "multipart_threshold" => self.multipart_threshold = Some(value.parse()?),
            "buffer_size" => self.buffer_size = Some(value.parse()?),
            "on_part_size_conflict" => self.on_part_size_conflict = Some(value.parse()?),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get all config keys
    pub fn keys() -> &'static [&'static str] {
        &[
            "endpoint",
            "access_key",
            "secret_key",
            "region",
            "path_style",
            "part_size",
            "min_part_size",
            "multipart_threshold",
            "buffer_size",
            "on_part_size_conflict",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.region, "us-east-1");
        assert!(config.path_style);
        assert_eq!(config.part_size, None);

        let transfer = config.transfer_config(TransferConfig::default()).unwrap();
        assert_eq!(transfer.part_size, 40 * 1024 * 1024);
    }

    #[test]
    fn test_profiles_parse_with_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [default]
            endpoint = "http://localhost:9000"

            [backups]
            region = "eu-west-1"
            on_part_size_conflict = "restart"
            "#,
        )
        .unwrap();

        assert_eq!(file.profiles.len(), 2);
        let backups = &file.profiles["backups"];
        assert_eq!(backups.region, "eu-west-1");
        assert_eq!(backups.on_part_size_conflict, Some(PartSizeConflict::Restart));
        assert_eq!(backups.multipart_threshold, None);

        let out = toml::to_string_pretty(&file).unwrap();
        assert!(!out.contains("part_size"));
    }

    #[test]
    fn test_profile_overrides_base_settings() {
        let base = TransferConfig::from_toml(
            r#"
            part_size = 16777216
            buffer_size = 4096
            multipart_threshold = 0
            "#,
        )
        .unwrap();

        let mut config = Config::default();
        config.set_value("part_size", "8388608").unwrap();
        config.set_value("on_part_size_conflict", "restart").unwrap();

        let transfer = config.transfer_config(base).unwrap();
        assert_eq!(transfer.part_size, 8 * 1024 * 1024);
        assert_eq!(transfer.buffer_size, 4096);
        assert_eq!(transfer.multipart_threshold, 0);
        assert_eq!(transfer.on_part_size_conflict, PartSizeConflict::Restart);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PARTWISE_ENDPOINT", "http://partwise:9000"),
            ("AWS_REGION", "ap-south-1"),
            ("PARTWISE_PART_SIZE", "8388608"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("http://partwise:9000"));
        assert_eq!(config.region, "ap-south-1");
        assert_eq!(config.part_size, Some(8 * 1024 * 1024));
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(|name| (name == "PARTWISE_PART_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("PARTWISE_PART_SIZE"));
    }

    #[test]
    fn test_get_set_values() {
        let mut config = Config::default();
        config.set_value("secret_key", "hunter2").unwrap();
        config.set_value("on_part_size_conflict", "restart").unwrap();
        config.set_value("part_size", "6291456").unwrap();

        assert_eq!(config.get_value("secret_key").as_deref(), Some("***"));
        assert_eq!(
            config.get_value("on_part_size_conflict").as_deref(),
            Some("restart")
        );
        assert_eq!(config.get_value("part_size").as_deref(), Some("6291456"));
        assert_eq!(config.get_value("buffer_size"), None);
        assert!(config.set_value("bogus", "1").is_err());
        assert!(config.set_value("part_size", "big").is_err());
    }

    #[test]
    fn test_part_size_below_minimum_rejected() {
        let mut config = Config::default();
        config.part_size = Some(1024);
        assert!(config.transfer_config(TransferConfig::default()).is_err());
    }
}
