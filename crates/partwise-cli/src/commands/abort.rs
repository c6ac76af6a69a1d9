//! abort command - discard an unfinished upload and its parts

use super::CommandContext;
use crate::s3_client::S3Uri;
use anyhow::{Context, Result};
use colored::Colorize;

pub async fn execute(ctx: &CommandContext, path: &str) -> Result<()> {
    let uri = S3Uri::parse(path)?;
    let engine = ctx.engine().await?;

    let aborted = engine
        .abort(&uri.bucket, &uri.key)
        .await
        .with_context(|| format!("Failed to abort upload for {}", uri))?;

    if ctx.is_json() {
        println!(
            "{}",
            serde_json::json!({ "uri": uri.to_string(), "aborted": aborted })
        );
    } else if aborted {
        ctx.info(&format!("{}: {}", "aborted".red(), uri));
    } else {
        ctx.info(&format!("No unfinished upload for {}", uri));
    }

    Ok(())
}
