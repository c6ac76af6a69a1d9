//! configure command - manage profiles in ~/.partwise/config.toml

use super::CommandContext;
use crate::config::Config;
use crate::ConfigureAction;
use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;

pub async fn execute(ctx: &CommandContext, action: Option<ConfigureAction>) -> Result<()> {
    let profile = ctx.profile.as_deref();
    match action {
        Some(ConfigureAction::Set { key, value }) => set_config(ctx, profile, &key, &value),
        Some(ConfigureAction::Get { key }) => get_config(profile, &key),
        Some(ConfigureAction::List) | None => list_config(ctx, profile),
        Some(ConfigureAction::RemoveProfile { name }) => remove_profile(&name),
    }
}

fn set_config(ctx: &CommandContext, profile: Option<&str>, key: &str, value: &str) -> Result<()> {
    let mut config = Config::load(profile)?;
    config.set_value(key, value)?;
    // Catch bad sizes now rather than on the next upload
    config.transfer_config(ctx.base_transfer_config()?)?;
    config.save(profile)?;
    println!("Set {} = {}", key.cyan(), value);
    Ok(())
}

fn get_config(profile: Option<&str>, key: &str) -> Result<()> {
    let config = Config::load(profile)?;
    if !Config::keys().contains(&key) {
        anyhow::bail!("Unknown config key: {}", key);
    }
    match config.get_value(key) {
        Some(value) => println!("{}", value),
        None => println!("(not set)"),
    }
    Ok(())
}

fn list_config(ctx: &CommandContext, profile: Option<&str>) -> Result<()> {
    let config = Config::load(profile)?;
    let profiles = Config::list_profiles()?;

    if ctx.is_json() {
        let values: BTreeMap<&str, Option<String>> = Config::keys()
            .iter()
            .map(|key| (*key, config.get_value(key)))
            .collect();
        let out = serde_json::json!({
            "profile": profile.unwrap_or("default"),
            "values": values,
            "profiles": profiles,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "{} ({})",
        "Current configuration:".bold(),
        profile.unwrap_or("default")
    );
    println!();

    for key in Config::keys() {
        let value = config
            .get_value(key)
            .unwrap_or_else(|| "(not set)".to_string());
        println!("  {}: {}", key.cyan(), value);
    }

    println!();
    println!("{}", "Available profiles:".bold());
    if profiles.is_empty() {
        println!("  (none)");
    } else {
        for profile in profiles {
            println!("  - {}", profile);
        }
    }

    println!();
    println!(
        "Config file: {}",
        Config::config_path()?.display().to_string().dimmed()
    );

    Ok(())
}

fn remove_profile(name: &str) -> Result<()> {
    Config::delete_profile(name)?;
    println!("Removed profile: {}", name.red());
    Ok(())
}
