//! status command - show an unfinished upload for a key

use super::CommandContext;
use crate::progress::format_bytes;
use crate::s3_client::S3Uri;
use crate::utils::format_datetime;
use anyhow::{Context, Result};
use colored::Colorize;

pub async fn execute(ctx: &CommandContext, path: &str) -> Result<()> {
    let uri = S3Uri::parse(path)?;
    let engine = ctx.engine().await?;

    let pending = engine
        .pending(&uri.bucket, &uri.key)
        .await
        .with_context(|| format!("Failed to check uploads for {}", uri))?;

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    let Some(pending) = pending else {
        println!("No unfinished upload for {}", uri);
        return Ok(());
    };

    println!("{}", uri.to_string().blue().bold());
    println!();
    println!("  {}: {}", "Upload ID".cyan(), pending.handle.token);
    println!("  {}: {}", "Committed parts".cyan(), pending.committed_parts);
    println!(
        "  {}: {} ({})",
        "Committed bytes".cyan(),
        pending.committed_bytes,
        format_bytes(pending.committed_bytes)
    );
    if let Some(size) = pending.part_size_hint {
        println!("  {}: {}", "Part size".cyan(), format_bytes(size));
    }
    println!("  {}: {}", "Checked".cyan(), format_datetime(&pending.checked_at));

    Ok(())
}
