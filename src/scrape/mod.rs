
pub mod books;
pub mod jobs;
pub mod quotes;

use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use tracing::{debug, error, warn};
use url::Url;

use crate::{HarvestError, Result};

pub use books::{RawBook, scrape_books};
pub use jobs::{RawJob, scrape_jobs};
pub use quotes::{RawQuote, scrape_quotes};

/// Browser-like default user agent; the demo targets serve plain bots a
/// different experience.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// HTTP settings for one fetch client. Always passed in explicitly; there
/// is no process-global client state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub user_agent: String,
    pub accept_language: String,
    /// Global per-request timeout.
    pub timeout: Duration,
    /// Attempt budget per fetch.
    pub max_retries: u32,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
    /// Politeness pause between consecutive requests.
    pub page_delay: Duration,
}

impl Default for FetchConfig {
    #[inline]
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            page_delay: Duration::from_millis(500),
        }
    }
}

/// HTTP client used by all page parsers.
#[derive(Debug)]
pub struct FetchClient {
    agent: ureq::Agent,
    config: FetchConfig,
    last_request_time: Option<Instant>,
}

enum FetchFailure {
    Status(u16),
    Timeout,
    Transport(String),
}

impl FetchClient {
    #[inline]
    pub fn new(config: FetchConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self {
            agent,
            config,
            last_request_time: None,
        }
    }

    /// Fetches one page, returning the body on any 2xx response.
    ///
    /// Timeouts and transport errors consume one attempt each and are
    /// retried after `retry_delay`; an HTTP error status aborts right away.
    /// Once the budget is spent (or on abort) the result is `None`; the
    /// log output is the only place the two are told apart.
    #[inline]
    pub async fn fetch(&mut self, url: &str) -> Option<String> {
        self.apply_page_delay().await;

        for attempt in 1..=self.config.max_retries {
            match self.try_get(url) {
                Ok(body) => return Some(body),
                Err(FetchFailure::Status(code)) => {
                    error!("HTTP {code} fetching {url}; giving up");
                    return None;
                }
                Err(FetchFailure::Timeout) => {
                    warn!(
                        "timeout fetching {url} (attempt {attempt}/{})",
                        self.config.max_retries
                    );
                }
                Err(FetchFailure::Transport(message)) => {
                    error!(
                        "request failed for {url} (attempt {attempt}/{}): {message}",
                        self.config.max_retries
                    );
                }
            }

            if attempt < self.config.max_retries {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        warn!(
            "giving up on {url} after {} attempts",
            self.config.max_retries
        );
        None
    }

    fn try_get(&mut self, url: &str) -> std::result::Result<String, FetchFailure> {
        debug!("fetching {url}");
        let result = self
            .agent
            .get(url)
            .header("Accept-Language", &self.config.accept_language)
            .call();
        self.last_request_time = Some(Instant::now());

        match result {
            Ok(mut response) => response
                .body_mut()
                .read_to_string()
                .map_err(|e| FetchFailure::Transport(e.to_string())),
            Err(ureq::Error::StatusCode(code)) => Err(FetchFailure::Status(code)),
            Err(ureq::Error::Timeout(_)) => Err(FetchFailure::Timeout),
            Err(ureq::Error::Io(e)) if e.kind() == std::io::ErrorKind::TimedOut => {
                Err(FetchFailure::Timeout)
            }
            Err(e) => Err(FetchFailure::Transport(e.to_string())),
        }
    }

    async fn apply_page_delay(&mut self) {
        if let Some(last) = self.last_request_time {
            let elapsed = last.elapsed();
            if elapsed < self.config.page_delay {
                tokio::time::sleep(self.config.page_delay - elapsed).await;
            }
        }
    }
}

/// Per-run extraction accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    pub pages_fetched: usize,
    pub items_extracted: usize,
    /// Elements dropped because a required piece was missing.
    pub items_skipped: usize,
}

/// A parsed raw batch plus its accounting.
#[derive(Debug, Clone)]
pub struct Extracted<T> {
    pub records: Vec<T>,
    pub stats: ScrapeStats,
}

impl<T> Extracted<T> {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            stats: ScrapeStats::default(),
        }
    }
}

/// One page's parse yield: records, container elements seen, malformed
/// elements dropped.
pub(crate) struct PageCatch<T> {
    pub(crate) records: Vec<T>,
    pub(crate) containers: usize,
    pub(crate) skipped: usize,
}

impl<T> PageCatch<T> {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
            containers: 0,
            skipped: 0,
        }
    }
}

/// Substitutes the page counter into a paginated URL template.
#[inline]
pub fn page_url(template: &str, page: usize) -> String {
    template.replacen("{}", &page.to_string(), 1)
}

/// Whether a template carries the `{}` page placeholder.
#[inline]
pub fn has_page_placeholder(template: &str) -> bool {
    template.contains("{}")
}

/// Checks that a source URL parses and uses an http(s) scheme.
#[inline]
pub fn validate_url(raw: &str) -> Result<Url> {
    let url =
        Url::parse(raw).map_err(|e| HarvestError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(HarvestError::InvalidUrl(format!(
            "unsupported scheme '{}' in {raw}",
            url.scheme()
        )));
    }
    Ok(url)
}

fn progress_spinner(message: String) -> ProgressBar {
    if console::user_attended_stderr() {
        let bar = ProgressBar::new_spinner();
        bar.set_message(message);
        bar
    } else {
        ProgressBar::hidden()
    }
}

fn selector(css: &'static str) -> Result<scraper::Selector> {
    scraper::Selector::parse(css)
        .map_err(|e| HarvestError::Selector(format!("bad selector '{css}': {e}")))
}
