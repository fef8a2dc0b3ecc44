use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::HarvestError;

/// The three supported scrape targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Books,
    Quotes,
    Jobs,
}

/// Column affinity used when validating query filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Real,
}

impl SourceKind {
    /// Name of the collection backing this source.
    #[inline]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Books => "scraped_books",
            Self::Quotes => "scraped_quotes",
            Self::Jobs => "scraped_jobs",
        }
    }

    /// Whether this source walks numbered pages (and therefore takes a URL
    /// template with a `{}` placeholder).
    #[inline]
    pub fn paginated(self) -> bool {
        !matches!(self, Self::Jobs)
    }

    /// Collection schema in display order: column name plus affinity.
    #[inline]
    pub fn columns(self) -> &'static [(&'static str, ColumnType)] {
        match self {
            Self::Books => &[
                ("title", ColumnType::Text),
                ("price", ColumnType::Real),
                ("rating", ColumnType::Text),
                ("availability", ColumnType::Text),
                ("scraped_at", ColumnType::Text),
            ],
            Self::Quotes => &[
                ("text", ColumnType::Text),
                ("author", ColumnType::Text),
                ("tags", ColumnType::Text),
                ("scraped_at", ColumnType::Text),
            ],
            Self::Jobs => &[
                ("title", ColumnType::Text),
                ("company", ColumnType::Text),
                ("location", ColumnType::Text),
                ("date_posted", ColumnType::Text),
                ("scraped_at", ColumnType::Text),
            ],
        }
    }

    /// Columns forming the natural key records are addressed by.
    #[inline]
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            Self::Books => &["title"],
            Self::Quotes => &["text"],
            Self::Jobs => &["title", "company", "location"],
        }
    }

    #[inline]
    pub fn all() -> [Self; 3] {
        [Self::Books, Self::Quotes, Self::Jobs]
    }
}

impl fmt::Display for SourceKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Books => "books",
            Self::Quotes => "quotes",
            Self::Jobs => "jobs",
        };
        f.write_str(name)
    }
}

impl FromStr for SourceKind {
    type Err = HarvestError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "books" | "book" => Ok(Self::Books),
            "quotes" | "quote" => Ok(Self::Quotes),
            "jobs" | "job" => Ok(Self::Jobs),
            other => Err(HarvestError::UnknownSource(other.to_string())),
        }
    }
}

/// Closed star-rating vocabulary carried by the catalog markup.
///
/// The page marks ratings with a class named `One` through `Five`; anything
/// outside that set surfaces as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum Rating {
    #[serde(rename = "1")]
    #[sqlx(rename = "1")]
    One,
    #[serde(rename = "2")]
    #[sqlx(rename = "2")]
    Two,
    #[serde(rename = "3")]
    #[sqlx(rename = "3")]
    Three,
    #[serde(rename = "4")]
    #[sqlx(rename = "4")]
    Four,
    #[serde(rename = "5")]
    #[sqlx(rename = "5")]
    Five,
    Unknown,
}

impl Rating {
    /// Maps a catalog class marker (`"One"`..`"Five"`) onto its ordinal.
    #[inline]
    pub fn from_marker(marker: &str) -> Self {
        match marker {
            "One" => Self::One,
            "Two" => Self::Two,
            "Three" => Self::Three,
            "Four" => Self::Four,
            "Five" => Self::Five,
            _ => Self::Unknown,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Rating {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub title: String,
    pub price: f64,
    pub rating: Rating,
    pub availability: String,
    pub scraped_at: NaiveDateTime,
}

/// A catalog record ready to be written. `scraped_at` is stamped by the
/// storage layer when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub price: f64,
    pub rating: Rating,
    pub availability: String,
    pub scraped_at: Option<NaiveDateTime>,
}

/// A stored quote. `tags` is an ordered sequence in memory; at rest it is
/// a single `", "`-delimited text column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
    pub tags: Vec<String>,
    pub scraped_at: NaiveDateTime,
}

impl<'r> FromRow<'r, SqliteRow> for Quote {
    #[inline]
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            text: row.try_get("text")?,
            author: row.try_get("author")?,
            tags: split_tags(&row.try_get::<String, _>("tags")?),
            scraped_at: row.try_get("scraped_at")?,
        })
    }
}

/// A quote ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuote {
    pub text: String,
    pub author: String,
    pub tags: Vec<String>,
    pub scraped_at: Option<NaiveDateTime>,
}

/// A stored job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub title: String,
    pub company: String,
    pub location: String,
    pub date_posted: String,
    pub scraped_at: NaiveDateTime,
}

/// A job posting ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub date_posted: String,
    pub scraped_at: Option<NaiveDateTime>,
}

/// Joins a tag sequence into its stored form.
#[inline]
pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

/// Splits the stored form back into the in-memory sequence. Empty input
/// maps to an empty sequence, not one empty tag.
#[inline]
pub fn split_tags(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        Vec::new()
    } else {
        raw.split(", ").map(str::to_string).collect()
    }
}

/// A typed batch of write-ready records for one source kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NewRecords {
    Books(Vec<NewBook>),
    Quotes(Vec<NewQuote>),
    Jobs(Vec<NewJob>),
}

impl NewRecords {
    #[inline]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Books(_) => SourceKind::Books,
            Self::Quotes(_) => SourceKind::Quotes,
            Self::Jobs(_) => SourceKind::Jobs,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Books(records) => records.len(),
            Self::Quotes(records) => records.len(),
            Self::Jobs(records) => records.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A typed batch of stored records read back from one collection.
///
/// Serializes untagged, so `--json` output is the bare record array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Records {
    Books(Vec<Book>),
    Quotes(Vec<Quote>),
    Jobs(Vec<Job>),
}

impl Records {
    #[inline]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Books(_) => SourceKind::Books,
            Self::Quotes(_) => SourceKind::Quotes,
            Self::Jobs(_) => SourceKind::Jobs,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Books(records) => records.len(),
            Self::Quotes(records) => records.len(),
            Self::Jobs(records) => records.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the batch into the tabular shape consumed by display and
    /// export surfaces, optionally projecting a column subset.
    #[inline]
    pub fn table(&self, projection: Option<&[String]>) -> crate::Result<DataTable> {
        let kind = self.kind();
        let schema = kind.columns();

        let selected: Vec<usize> = match projection {
            Some(wanted) => wanted
                .iter()
                .map(|name| {
                    schema
                        .iter()
                        .position(|(column, _)| column == name)
                        .ok_or_else(|| {
                            HarvestError::InvalidFilter(format!(
                                "unknown column '{name}' for {kind}"
                            ))
                        })
                })
                .collect::<crate::Result<_>>()?,
            None => (0..schema.len()).collect(),
        };

        let columns = selected
            .iter()
            .map(|&i| schema[i].0.to_string())
            .collect();
        let rows = self
            .full_rows()
            .into_iter()
            .map(|row| selected.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(DataTable { columns, rows })
    }

    fn full_rows(&self) -> Vec<Vec<String>> {
        let timestamp = |at: &NaiveDateTime| at.format("%Y-%m-%d %H:%M:%S").to_string();
        match self {
            Self::Books(records) => records
                .iter()
                .map(|book| {
                    vec![
                        book.title.clone(),
                        format!("{:.2}", book.price),
                        book.rating.to_string(),
                        book.availability.clone(),
                        timestamp(&book.scraped_at),
                    ]
                })
                .collect(),
            Self::Quotes(records) => records
                .iter()
                .map(|quote| {
                    vec![
                        quote.text.clone(),
                        quote.author.clone(),
                        join_tags(&quote.tags),
                        timestamp(&quote.scraped_at),
                    ]
                })
                .collect(),
            Self::Jobs(records) => records
                .iter()
                .map(|job| {
                    vec![
                        job.title.clone(),
                        job.company.clone(),
                        job.location.clone(),
                        job.date_posted.clone(),
                        timestamp(&job.scraped_at),
                    ]
                })
                .collect(),
        }
    }
}

/// Tabular render of a record batch: column names plus display-ready rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One column predicate inside a [`QuerySpec`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    /// Exact match.
    Equals(String),
    /// Case-insensitive substring match.
    Contains(String),
    /// Inclusive numeric bounds; either side may be open.
    Range { min: Option<f64>, max: Option<f64> },
}

/// A filtered-read request: ordered column predicates plus a row cap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub filters: Vec<(String, FieldFilter)>,
    pub limit: Option<u32>,
}

impl QuerySpec {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn equals(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_string(), FieldFilter::Equals(value.to_string())));
        self
    }

    #[inline]
    pub fn contains(mut self, column: &str, needle: &str) -> Self {
        self.filters
            .push((column.to_string(), FieldFilter::Contains(needle.to_string())));
        self
    }

    #[inline]
    pub fn range(mut self, column: &str, min: Option<f64>, max: Option<f64>) -> Self {
        self.filters
            .push((column.to_string(), FieldFilter::Range { min, max }));
        self
    }

    #[inline]
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Outcome of one upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Records written under a key not previously present.
    pub inserted: usize,
    /// Records that replaced the fields of an existing key.
    pub updated: usize,
    /// Records dropped because a natural-key field was empty.
    pub skipped: usize,
}

/// Row counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCounts {
    pub books: i64,
    pub quotes: i64,
    pub jobs: i64,
}

impl CollectionCounts {
    #[inline]
    pub fn total(self) -> i64 {
        self.books + self.quotes + self.jobs
    }
}
