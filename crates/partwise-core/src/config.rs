//! Configuration for partwise transfers

use serde::{Deserialize, Serialize};

/// What to do when an open session was started with a different part size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartSizeConflict {
    /// Fail with `PartSizeMismatch` and leave the session alone
    Reject,
    /// Abort the stale session and start over
    Restart,
}

impl Default for PartSizeConflict {
    fn default() -> Self {
        Self::Reject
    }
}

impl std::str::FromStr for PartSizeConflict {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "restart" => Ok(Self::Restart),
            other => Err(crate::Error::Config(format!(
                "Unknown part size conflict policy: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Nominal part size for new sessions (bytes)
    #[serde(default = "default_part_size")]
    pub part_size: u64,

    /// Smallest part size the store accepts for non-final parts (bytes)
    #[serde(default = "default_min_part_size")]
    pub min_part_size: u64,

    /// Copy buffer used when streaming (bytes)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Files below this size go up in a single request (bytes)
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold: u64,

    #[serde(default)]
    pub on_part_size_conflict: PartSizeConflict,
}

fn default_part_size() -> u64 {
    crate::DEFAULT_PART_SIZE
}

fn default_min_part_size() -> u64 {
    crate::MIN_PART_SIZE
}

fn default_buffer_size() -> usize {
    crate::DEFAULT_BUFFER_SIZE
}

fn default_multipart_threshold() -> u64 {
    64 * 1024 * 1024 // 64MB
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            part_size: default_part_size(),
            min_part_size: default_min_part_size(),
            buffer_size: default_buffer_size(),
            multipart_threshold: default_multipart_threshold(),
            on_part_size_conflict: PartSizeConflict::default(),
        }
    }
}

impl TransferConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(size) = std::env::var("PARTWISE_PART_SIZE") {
            if let Ok(s) = size.parse() {
                config.part_size = s;
            }
        }
        if let Ok(size) = std::env::var("PARTWISE_MIN_PART_SIZE") {
            if let Ok(s) = size.parse() {
                config.min_part_size = s;
            }
        }
        if let Ok(size) = std::env::var("PARTWISE_BUFFER_SIZE") {
            if let Ok(s) = size.parse() {
                config.buffer_size = s;
            }
        }
        if let Ok(size) = std::env::var("PARTWISE_MULTIPART_THRESHOLD") {
            if let Ok(s) = size.parse() {
                config.multipart_threshold = s;
            }
        }
        if let Ok(policy) = std::env::var("PARTWISE_ON_PART_SIZE_CONFLICT") {
            if let Ok(p) = policy.parse() {
                config.on_part_size_conflict = p;
            }
        }

        config
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.buffer_size == 0 {
            return Err(crate::Error::Config("buffer_size must be positive".into()));
        }
        if self.part_size < self.min_part_size {
            return Err(crate::Error::Config(format!(
                "part_size {} is below min_part_size {}",
                self.part_size, self.min_part_size
            )));
        }
        if self.part_size == 0 {
            return Err(crate::Error::Config("part_size must be positive".into()));
        }
        Ok(())
    }
}
