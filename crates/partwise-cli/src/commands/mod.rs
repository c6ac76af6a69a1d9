//! CLI command implementations

pub mod abort;
pub mod configure;
pub mod download;
pub mod status;
pub mod upload;

use crate::config::Config;
use crate::s3_client::create_client;
use crate::OutputFormat;
use anyhow::Result;
use partwise_core::TransferConfig;
use partwise_store::S3Store;
use partwise_transfer::TransferEngine;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context passed to all commands
pub struct CommandContext {
    pub config: Config,
    pub profile: Option<String>,
    /// Transfer settings file given with `--config`
    pub config_file: Option<String>,
    pub output_format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
    /// Cancelled on Ctrl-C
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Whether to draw progress bars
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.is_json()
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print verbose message if verbose mode
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            eprintln!("[DEBUG] {}", msg);
        }
    }

    /// Print error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg);
    }

    /// Settings the profile is laid over: the `--config` file if given,
    /// `PARTWISE_*` variables otherwise
    pub fn base_transfer_config(&self) -> Result<TransferConfig> {
        match &self.config_file {
            Some(path) => Ok(TransferConfig::from_file(path)?),
            None => Ok(TransferConfig::from_env()),
        }
    }

    /// Transfer engine over the profile's S3 endpoint
    pub async fn engine(&self) -> Result<TransferEngine> {
        let transfer = self.config.transfer_config(self.base_transfer_config()?)?;
        let client = create_client(&self.config).await?;
        let store = S3Store::new(client);
        let engine = TransferEngine::new(Arc::new(store), transfer)?;
        Ok(engine)
    }
}
