use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use tracing::info;

use crate::config::Config;
use crate::database::Database;
use crate::database::models::{DataTable, QuerySpec, SourceKind};
use crate::database::queries::{InsightQueries, RecordQueries};
use crate::pipeline::{Pipeline, RunStatus};

/// Scrape one source, or all of them, and upsert the results
#[inline]
pub async fn run_sources(
    source: Option<String>,
    url: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let kinds: Vec<SourceKind> = match &source {
        Some(name) => vec![name.parse()?],
        None => SourceKind::all().to_vec(),
    };

    if url.is_some() && kinds.len() > 1 {
        anyhow::bail!("--url overrides a single source; pass one of books, quotes or jobs");
    }

    let database = open_database(&config).await?;
    let mut pipeline = Pipeline::new(database.clone(), config.fetch_config());
    let limit = limit.unwrap_or(config.sources.default_limit);

    let mut degraded = 0usize;
    for kind in kinds {
        let template = url.as_deref().unwrap_or_else(|| config.source_url(kind));
        info!("Running {kind} sync");

        let report = pipeline.run(kind, template, limit).await?;
        match report.status() {
            RunStatus::Completed => println!("{report}"),
            RunStatus::Degraded => {
                degraded += 1;
                println!("{} {report}", style("⚠").yellow());
            }
        }
    }

    database.close().await;

    if degraded > 0 {
        anyhow::bail!("{degraded} sync(s) finished without storing their records");
    }
    Ok(())
}

/// Print everything stored for one source
#[inline]
pub async fn list_records(
    source: String,
    limit: Option<u32>,
    fields: Option<Vec<String>>,
    json: bool,
) -> Result<()> {
    let kind: SourceKind = source.parse()?;
    let config = Config::load().context("Failed to load configuration")?;
    let database = open_database(&config).await?;

    let records = match limit {
        Some(n) => RecordQueries::query(database.pool(), kind, &QuerySpec::new().limit(n)).await,
        None => RecordQueries::load(database.pool(), kind).await,
    }
    .context("Failed to load records")?;
    database.close().await;

    if records.is_empty() {
        println!("No {kind} records stored yet.");
        println!("Use 'webharvest run {kind}' to scrape some.");
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print_table(&records.table(fields.as_deref())?);
        println!();
        println!("{} records", records.len());
    }

    Ok(())
}

/// Filter one collection by column predicates
#[inline]
#[allow(clippy::too_many_arguments)]
pub async fn search_records(
    source: String,
    equals: Vec<String>,
    contains: Vec<String>,
    ranges: Vec<String>,
    limit: Option<u32>,
    fields: Option<Vec<String>>,
    json: bool,
) -> Result<()> {
    let kind: SourceKind = source.parse()?;

    let mut spec = QuerySpec::new();
    for arg in &equals {
        let (column, value) = split_filter_arg(arg)?;
        spec = spec.equals(column, value);
    }
    for arg in &contains {
        let (column, value) = split_filter_arg(arg)?;
        spec = spec.contains(column, value);
    }
    for arg in &ranges {
        let (column, value) = split_filter_arg(arg)?;
        let (min, max) = parse_range(value)?;
        spec = spec.range(column, min, max);
    }
    if let Some(limit) = limit {
        spec = spec.limit(limit);
    }

    let config = Config::load().context("Failed to load configuration")?;
    let database = open_database(&config).await?;
    let records = RecordQueries::query(database.pool(), kind, &spec)
        .await
        .context("Search failed")?;
    database.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No {kind} records matched.");
        return Ok(());
    }

    print_table(&records.table(fields.as_deref())?);
    println!();
    println!("{} matching records", records.len());

    Ok(())
}

/// Summarize collection sizes and the built-in insight queries
#[inline]
pub async fn show_stats() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let database = open_database(&config).await?;

    let counts = RecordQueries::counts(database.pool())
        .await
        .context("Failed to count collections")?;

    println!("{}", style("📊 Harvest Overview").bold());
    println!();
    println!("Collections:");
    println!("  Books:  {}", counts.books);
    println!("  Quotes: {}", counts.quotes);
    println!("  Jobs:   {}", counts.jobs);
    println!("  Total:  {}", counts.total());

    let ratings = InsightQueries::avg_price_by_rating(database.pool()).await?;
    if !ratings.is_empty() {
        println!();
        println!("Average book price by rating:");
        for row in &ratings {
            println!(
                "  {:<8} {:>8.2}  ({} titles)",
                row.rating.to_string(),
                row.avg_price,
                row.titles
            );
        }
    }

    let priciest = InsightQueries::top_priced_books(database.pool(), 5).await?;
    if !priciest.is_empty() {
        println!();
        println!("Most expensive books:");
        for row in &priciest {
            println!("  {:>8.2}  {}", row.price, row.title);
        }
    }

    let authors = InsightQueries::author_counts(database.pool(), 5).await?;
    if !authors.is_empty() {
        println!();
        println!("Most quoted authors:");
        for row in &authors {
            println!("  {:>4}  {}", row.quotes, row.author);
        }
    }

    database.close().await;
    Ok(())
}

/// Empty one collection, or all of them, keeping the tables and keys
#[inline]
pub async fn clear_records(source: Option<String>, yes: bool) -> Result<()> {
    let kinds: Vec<SourceKind> = match &source {
        Some(name) => vec![name.parse()?],
        None => SourceKind::all().to_vec(),
    };

    if !yes {
        let target = source.as_deref().unwrap_or("every collection");
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete all stored records from {target}? This cannot be undone"
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Nothing deleted.");
            return Ok(());
        }
    }

    let config = Config::load().context("Failed to load configuration")?;
    let database = open_database(&config).await?;

    for kind in kinds {
        let removed = RecordQueries::clear(database.pool(), kind)
            .await
            .context("Failed to clear collection")?;
        println!("Cleared {removed} records from {}", kind.collection());
    }

    database.close().await;
    Ok(())
}

async fn open_database(config: &Config) -> Result<Database> {
    let db_path = config.database_path()?;
    Database::connect(db_path.to_string_lossy().as_ref())
        .await
        .context("Failed to initialize database")
}

fn split_filter_arg(arg: &str) -> Result<(&str, &str)> {
    arg.split_once('=')
        .map(|(column, value)| (column.trim(), value.trim()))
        .filter(|(column, _)| !column.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Filter must look like column=value, got '{arg}'"))
}

fn parse_range(value: &str) -> Result<(Option<f64>, Option<f64>)> {
    let (low, high) = value
        .split_once("..")
        .ok_or_else(|| anyhow::anyhow!("Range must look like min..max, got '{value}'"))?;
    Ok((parse_bound(low)?, parse_bound(high)?))
}

fn parse_bound(raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("Range bound '{raw}' is not a number"))
}

fn print_table(table: &DataTable) {
    let mut widths: Vec<usize> = table.columns.iter().map(|name| name.chars().count()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let header = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, &width)| format!("{name:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", style(header.trim_end()).bold());

    for row in &table.rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{}", line.trim_end());
    }
}
