
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::database::Database;
use crate::database::models::{NewRecords, SourceKind};
use crate::database::queries::RecordQueries;
use crate::normalize::{normalize_books, normalize_jobs, normalize_quotes};
use crate::scrape::{self, FetchClient, FetchConfig};
use crate::{HarvestError, Result};

/// Drives fetch → parse → normalize → upsert for one source at a time.
///
/// A run is strictly sequential: one request in flight, each stage awaited
/// before the next. The politeness pause between page fetches lives in the
/// client.
pub struct Pipeline {
    database: Database,
    client: FetchClient,
}

/// How a run ended. `Degraded` means scraping finished but the batch could
/// not be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Degraded,
}

/// What one run did, in numbers. Zero stored records with pages fetched
/// and extraction counts present is distinguishable from "nothing was
/// available".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub source: SourceKind,
    pub pages_fetched: usize,
    pub items_extracted: usize,
    /// Malformed page elements dropped by the parser.
    pub items_skipped: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Records dropped at the storage boundary for empty key fields.
    pub key_skipped: usize,
    pub store_failure: Option<String>,
    pub elapsed: Duration,
}

impl RunReport {
    #[inline]
    pub fn status(&self) -> RunStatus {
        if self.store_failure.is_some() {
            RunStatus::Degraded
        } else {
            RunStatus::Completed
        }
    }

    #[inline]
    pub fn stored(&self) -> usize {
        self.inserted + self.updated
    }
}

impl fmt::Display for RunReport {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Synced {}: {} new, {} updated ({} items from {} pages in {:.1?})",
            self.source,
            self.inserted,
            self.updated,
            self.items_extracted,
            self.pages_fetched,
            self.elapsed
        )?;
        if self.items_skipped > 0 {
            write!(f, "; {} malformed elements skipped", self.items_skipped)?;
        }
        if self.key_skipped > 0 {
            write!(f, "; {} records missing key fields", self.key_skipped)?;
        }
        if let Some(reason) = &self.store_failure {
            write!(f, "; storage failed: {reason}")?;
        }
        Ok(())
    }
}

impl Pipeline {
    #[inline]
    pub fn new(database: Database, fetch_config: FetchConfig) -> Self {
        Self {
            database,
            client: FetchClient::new(fetch_config),
        }
    }

    /// Runs one source end to end and reports what happened.
    ///
    /// The URL is validated before any I/O. A storage failure is logged
    /// and absorbed into the report's `store_failure` so the scrape work
    /// is still accounted for; every other failure surfaces as an error.
    #[inline]
    pub async fn run(&mut self, kind: SourceKind, url: &str, limit: usize) -> Result<RunReport> {
        validate_source_url(kind, url)?;

        let started = Instant::now();
        info!("starting {kind} run against {url} (limit {limit})");

        let (batch, stats) = match kind {
            SourceKind::Books => {
                let extracted = scrape::scrape_books(&mut self.client, url, limit).await?;
                (
                    NewRecords::Books(normalize_books(extracted.records)),
                    extracted.stats,
                )
            }
            SourceKind::Quotes => {
                let extracted = scrape::scrape_quotes(&mut self.client, url, limit).await?;
                (
                    NewRecords::Quotes(normalize_quotes(extracted.records)),
                    extracted.stats,
                )
            }
            SourceKind::Jobs => {
                let extracted = scrape::scrape_jobs(&mut self.client, url, limit).await?;
                (
                    NewRecords::Jobs(normalize_jobs(extracted.records)),
                    extracted.stats,
                )
            }
        };

        let mut report = RunReport {
            source: kind,
            pages_fetched: stats.pages_fetched,
            items_extracted: stats.items_extracted,
            items_skipped: stats.items_skipped,
            inserted: 0,
            updated: 0,
            key_skipped: 0,
            store_failure: None,
            elapsed: Duration::ZERO,
        };

        match RecordQueries::upsert(self.database.pool(), &batch).await {
            Ok(outcome) => {
                report.inserted = outcome.inserted;
                report.updated = outcome.updated;
                report.key_skipped = outcome.skipped;
            }
            Err(e) => {
                error!("storing {kind} records failed: {e}");
                report.store_failure = Some(e.to_string());
            }
        }

        report.elapsed = started.elapsed();
        info!("{report}");
        Ok(report)
    }
}

/// Paginated sources need the `{}` page placeholder; the single-page job
/// board must not carry one.
fn validate_source_url(kind: SourceKind, url: &str) -> Result<()> {
    if kind.paginated() {
        if !scrape::has_page_placeholder(url) {
            return Err(HarvestError::InvalidUrl(format!(
                "{kind} needs a page template containing '{{}}', got {url}"
            )));
        }
        scrape::validate_url(&scrape::page_url(url, 1))?;
    } else {
        if scrape::has_page_placeholder(url) {
            return Err(HarvestError::InvalidUrl(format!(
                "{kind} is a single page; drop the '{{}}' placeholder from {url}"
            )));
        }
        scrape::validate_url(url)?;
    }
    Ok(())
}
