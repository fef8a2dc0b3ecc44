#[cfg(test)]
mod tests;

use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{Config, ConfigError, FetchSettings, SourcesConfig};
use crate::scrape::page_url;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 WebHarvest Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Storage").bold().yellow());
    configure_storage(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Fetch Settings").bold().yellow());
    eprintln!("How pages are requested from the source sites.");
    eprintln!();
    configure_fetch(&mut config.fetch)?;

    eprintln!();
    eprintln!("{}", style("Source Catalog").bold().yellow());
    eprintln!("Paginated sources take a page template with a '{{}}' counter.");
    eprintln!();
    configure_sources(&mut config.sources)?;

    eprintln!();
    eprintln!("{}", style("Testing source reachability...").yellow());

    if test_source_reachability(&config.sources)? {
        eprintln!("{}", style("✓ Book catalog reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the book catalog").yellow()
        );
        eprintln!("You can continue, but check your network before running a sync.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());

        let config_path = Config::config_file_path().context("Failed to get config file path")?;
        eprintln!(
            "Configuration saved to: {}",
            style(config_path.display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Storage:").bold().yellow());
    match config.database_path() {
        Ok(path) => eprintln!("  Database: {}", style(path.display()).cyan()),
        Err(e) => eprintln!("  Database: {} ({})", style("Unresolved").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Fetch Settings:").bold().yellow());
    eprintln!("  User Agent: {}", style(&config.fetch.user_agent).cyan());
    eprintln!(
        "  Accept-Language: {}",
        style(&config.fetch.accept_language).cyan()
    );
    eprintln!(
        "  Timeout: {}",
        style(format!("{}s", config.fetch.timeout_seconds)).cyan()
    );
    eprintln!("  Retries: {}", style(config.fetch.max_retries).cyan());
    eprintln!(
        "  Retry Delay: {}",
        style(format!("{}ms", config.fetch.retry_delay_ms)).cyan()
    );
    eprintln!(
        "  Page Delay: {}",
        style(format!("{}ms", config.fetch.page_delay_ms)).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Sources:").bold().yellow());
    eprintln!("  Books: {}", style(&config.sources.books_url).cyan());
    eprintln!("  Quotes: {}", style(&config.sources.quotes_url).cyan());
    eprintln!("  Jobs: {}", style(&config.sources.jobs_url).cyan());
    eprintln!(
        "  Default Limit: {}",
        style(config.sources.default_limit).cyan()
    );

    let config_path = Config::config_file_path().context("Failed to get config file path")?;
    eprintln!();
    eprintln!("Config file: {}", style(config_path.display()).dim());

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_storage(config: &mut Config) -> Result<()> {
    let current = config
        .storage
        .database_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_default();

    let database_path: String = Input::new()
        .with_prompt("Database file (leave empty for the default location)")
        .default(current)
        .allow_empty(true)
        .interact_text()?;

    let database_path = database_path.trim();
    config.storage.database_path = if database_path.is_empty() {
        None
    } else {
        Some(PathBuf::from(database_path))
    };

    Ok(())
}

fn configure_fetch(fetch: &mut FetchSettings) -> Result<()> {
    let user_agent: String = Input::new()
        .with_prompt("User agent")
        .default(fetch.user_agent.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("User agent cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout in seconds")
        .default(fetch.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=300).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 300 seconds")
            }
        })
        .interact_text()?;

    let max_retries: u32 = Input::new()
        .with_prompt("Attempts per fetch")
        .default(fetch.max_retries)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (1..=10).contains(input) {
                Ok(())
            } else {
                Err("Attempt budget must be between 1 and 10")
            }
        })
        .interact_text()?;

    let page_delay_ms: u64 = Input::new()
        .with_prompt("Pause between page requests in milliseconds")
        .default(fetch.page_delay_ms)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if *input <= 60_000 {
                Ok(())
            } else {
                Err("Delay must be 60000ms or less")
            }
        })
        .interact_text()?;

    fetch.user_agent = user_agent;
    fetch.timeout_seconds = timeout_seconds;
    fetch.max_retries = max_retries;
    fetch.page_delay_ms = page_delay_ms;

    Ok(())
}

fn configure_sources(sources: &mut SourcesConfig) -> Result<()> {
    let books_url: String = Input::new()
        .with_prompt("Book catalog page template")
        .default(sources.books_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = SourcesConfig {
                books_url: input.clone(),
                ..SourcesConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let quotes_url: String = Input::new()
        .with_prompt("Quote listing page template")
        .default(sources.quotes_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = SourcesConfig {
                quotes_url: input.clone(),
                ..SourcesConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let jobs_url: String = Input::new()
        .with_prompt("Job board URL")
        .default(sources.jobs_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = SourcesConfig {
                jobs_url: input.clone(),
                ..SourcesConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let default_limit: usize = Input::new()
        .with_prompt("Default item limit per run")
        .default(sources.default_limit)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=10_000).contains(input) {
                Ok(())
            } else {
                Err("Limit must be between 1 and 10000")
            }
        })
        .interact_text()?;

    sources.books_url = books_url;
    sources.quotes_url = quotes_url;
    sources.jobs_url = jobs_url;
    sources.default_limit = default_limit;

    Ok(())
}

fn test_source_reachability(sources: &SourcesConfig) -> Result<bool> {
    let url = page_url(&sources.books_url, 1);

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
