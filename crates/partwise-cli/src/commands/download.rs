//! download command - stream an object to a local file

use super::CommandContext;
use crate::progress::{
    bar_callback, create_transfer_progress, format_bytes, format_duration, format_rate,
};
use crate::s3_client::S3Uri;
use anyhow::{Context, Result};
use colored::Colorize;
use partwise_transfer::TransferOptions;
use std::path::PathBuf;

pub async fn execute(ctx: &CommandContext, source: &str, destination: &str) -> Result<()> {
    let src = S3Uri::parse(source)?;

    let mut dest = PathBuf::from(destination);
    if destination.ends_with('/') || dest.is_dir() {
        let name = src.key.rsplit('/').next().unwrap_or(&src.key);
        dest.push(name);
    }

    let engine = ctx.engine().await?;
    ctx.debug(&format!("Downloading {} to {}", src, dest.display()));

    // Length comes from object metadata on the first callback
    let progress = ctx
        .show_progress()
        .then(|| create_transfer_progress(0, &src.key));

    let mut options = TransferOptions::default().with_cancel(ctx.cancel.clone());
    if let Some(pb) = &progress {
        options = options.with_progress(bar_callback(pb));
    }

    let summary = match engine.download(&src.bucket, &src.key, &dest, options).await {
        Ok(summary) => {
            if let Some(pb) = &progress {
                pb.finish_with_message("Done");
            }
            summary
        }
        Err(err) => {
            if let Some(pb) = &progress {
                pb.abandon();
            }
            return Err(err).with_context(|| format!("Download of {} failed", src));
        }
    };

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    ctx.info(&format!(
        "{}: {} -> {} ({} in {}, {})",
        "download".green(),
        src,
        dest.display(),
        format_bytes(summary.total_bytes),
        format_duration(summary.elapsed.as_secs()),
        format_rate(summary.bytes_per_second())
    ));

    Ok(())
}
