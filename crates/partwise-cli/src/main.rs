//! partwise - resumable transfers to and from S3-compatible storage
//!
//! Large files go up as multipart uploads; an interrupted upload resumes
//! from the parts the server already holds when the same command is run
//! again.

mod commands;
mod config;
mod progress;
mod s3_client;
mod utils;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "partwise")]
#[command(author = "Partwise Team")]
#[command(version = partwise_core::VERSION)]
#[command(about = "Resumable chunked transfers for S3-compatible storage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration profile
    #[arg(long, global = true, env = "PARTWISE_PROFILE")]
    profile: Option<String>,

    /// Transfer settings file (TOML) the profile is laid over
    #[arg(long, global = true, env = "PARTWISE_CONFIG")]
    config: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "PARTWISE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log format (pretty, json)
    #[arg(long, global = true, env = "PARTWISE_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file, resuming an unfinished upload of the same key
    Upload {
        /// Local file
        source: String,

        /// Destination, s3://bucket/key (a trailing / appends the file name)
        destination: String,

        /// Part size, e.g. 40MiB (profile setting by default)
        #[arg(long, value_parser = utils::parse_size)]
        part_size: Option<u64>,

        /// Use a multipart upload even below the multipart threshold
        #[arg(long)]
        multipart: bool,
    },

    /// Download an object to a local file
    Download {
        /// Source, s3://bucket/key
        source: String,

        /// Local file or directory
        destination: String,
    },

    /// Show the unfinished upload for a key, if any
    Status {
        /// s3://bucket/key
        path: String,
    },

    /// Discard the unfinished upload for a key
    Abort {
        /// s3://bucket/key
        path: String,
    },

    /// Manage configuration profiles
    Configure {
        #[command(subcommand)]
        action: Option<ConfigureAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigureAction {
    /// Set a configuration value
    Set { key: String, value: String },

    /// Get a configuration value
    Get { key: String },

    /// List configuration values and profiles
    List,

    /// Remove a profile
    RemoveProfile { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let json_logs = cli.log_format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(
            json_logs.then(|| fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!json_logs).then(|| fmt::layer().with_target(true).with_writer(std::io::stderr)),
        )
        .with(filter)
        .init();

    let config = config::Config::load(cli.profile.as_deref())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current part");
            on_interrupt.cancel();
        }
    });

    let ctx = CommandContext {
        config,
        profile: cli.profile.clone(),
        config_file: cli.config.clone(),
        output_format: cli.output,
        verbose: cli.verbose,
        quiet: cli.quiet,
        cancel,
    };
    debug!(profile = ?ctx.profile, config_file = ?ctx.config_file, "Loaded configuration");

    match cli.command {
        Commands::Upload {
            source,
            destination,
            part_size,
            multipart,
        } => {
            let opts = commands::upload::UploadOptions {
                part_size,
                force_multipart: multipart || part_size.is_some(),
            };
            commands::upload::execute(&ctx, &source, &destination, opts).await
        }
        Commands::Download {
            source,
            destination,
        } => commands::download::execute(&ctx, &source, &destination).await,
        Commands::Status { path } => commands::status::execute(&ctx, &path).await,
        Commands::Abort { path } => commands::abort::execute(&ctx, &path).await,
        Commands::Configure { action } => commands::configure::execute(&ctx, action).await,
    }
}
