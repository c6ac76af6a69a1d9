//! upload command - resumable upload of a local file

use super::CommandContext;
use crate::progress::{
    bar_callback, create_transfer_progress, format_bytes, format_duration, format_rate,
};
use crate::s3_client::S3Uri;
use anyhow::{Context, Result};
use colored::Colorize;
use partwise_transfer::TransferOptions;
use std::path::Path;
use tokio::fs;

pub struct UploadOptions {
    /// Part size override; the profile's part size otherwise
    pub part_size: Option<u64>,
    /// Use a multipart session even below the multipart threshold
    pub force_multipart: bool,
}

pub async fn execute(
    ctx: &CommandContext,
    source: &str,
    destination: &str,
    opts: UploadOptions,
) -> Result<()> {
    let source_path = Path::new(source);
    let dest = S3Uri::parse_for_upload(destination, source_path)?;

    let metadata = fs::metadata(source_path)
        .await
        .with_context(|| format!("Cannot read source file: {}", source))?;
    if !metadata.is_file() {
        anyhow::bail!("Source is not a regular file: {}", source);
    }
    let file_size = metadata.len();

    let engine = ctx.engine().await?;
    let part_size = opts.part_size.unwrap_or(engine.config().part_size);
    let multipart = opts.force_multipart || file_size >= engine.config().multipart_threshold;

    ctx.debug(&format!(
        "Uploading {} ({}) to {} {}",
        source,
        format_bytes(file_size),
        dest,
        if multipart {
            format!("in parts of {}", format_bytes(part_size))
        } else {
            "in a single request".to_string()
        }
    ));

    let filename = source_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(source);
    let progress = ctx
        .show_progress()
        .then(|| create_transfer_progress(file_size, filename));

    let mut options = TransferOptions::default().with_cancel(ctx.cancel.clone());
    if let Some(pb) = &progress {
        options = options.with_progress(bar_callback(pb));
    }

    let result = if multipart {
        engine
            .upload(&dest.bucket, &dest.key, source_path, part_size, options)
            .await
    } else {
        engine
            .put_file(&dest.bucket, &dest.key, source_path, options)
            .await
    };

    let summary = match result {
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
            if multipart && err.is_resumable() && !ctx.is_json() {
                ctx.error(&format!(
                    "{} parts already uploaded are kept; run the same command again to resume",
                    "hint:".yellow()
                ));
            }
            return Err(err).with_context(|| format!("Upload to {} failed", dest));
        }
    };

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut line = format!(
        "{}: {} -> {} ({} in {}, {})",
        "upload".green(),
        source,
        dest,
        format_bytes(summary.total_bytes),
        format_duration(summary.elapsed.as_secs()),
        format_rate(summary.bytes_per_second())
    );
    if summary.resumed {
        line.push_str(&format!(
            ", resumed with {} of {} parts already stored",
            summary.parts_skipped,
            summary.parts_skipped + summary.parts_uploaded
        ));
    }
    ctx.info(&line);

    Ok(())
}
