use clap::{Parser, Subcommand};
use webharvest::Result;
use webharvest::commands::{clear_records, list_records, run_sources, search_records, show_stats};
use webharvest::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "webharvest")]
#[command(about = "A polite scrape-clean-store pipeline for demo data sources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure fetch behavior, storage and source URLs
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Scrape sources and store the normalized records
    Run {
        /// Source to sync: books, quotes or jobs (default: all three)
        source: Option<String>,
        /// Override the configured page template or URL
        #[arg(long)]
        url: Option<String>,
        /// Stop after this many items per source
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print a stored collection
    List {
        /// Source collection: books, quotes or jobs
        source: String,
        /// Print at most this many records
        #[arg(long)]
        limit: Option<u32>,
        /// Columns to print, e.g. --fields title,price
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Filter a stored collection by column values
    Search {
        /// Source collection: books, quotes or jobs
        source: String,
        /// Exact match, e.g. --equals rating=5 (repeatable)
        #[arg(long, value_name = "COLUMN=VALUE")]
        equals: Vec<String>,
        /// Case-insensitive substring, e.g. --contains title=light (repeatable)
        #[arg(long, value_name = "COLUMN=TEXT")]
        contains: Vec<String>,
        /// Numeric range, e.g. --range price=10..20 (either bound optional, repeatable)
        #[arg(long = "range", value_name = "COLUMN=MIN..MAX")]
        ranges: Vec<String>,
        /// Cap the number of matches
        #[arg(long)]
        limit: Option<u32>,
        /// Columns to print, e.g. --fields title,price
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show collection counts and insight summaries
    Stats,
    /// Delete stored records from one collection or all of them
    Clear {
        /// Source collection: books, quotes or jobs (default: all three)
        source: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Run { source, url, limit } => {
            run_sources(source, url, limit).await?;
        }
        Commands::List {
            source,
            limit,
            fields,
            json,
        } => {
            list_records(source, limit, fields, json).await?;
        }
        Commands::Search {
            source,
            equals,
            contains,
            ranges,
            limit,
            fields,
            json,
        } => {
            search_records(source, equals, contains, ranges, limit, fields, json).await?;
        }
        Commands::Stats => {
            show_stats().await?;
        }
        Commands::Clear { source, yes } => {
            clear_records(source, yes).await?;
        }
    }

    Ok(())
}
