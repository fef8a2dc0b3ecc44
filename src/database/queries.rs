use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::debug;

use super::DbPool;
use super::models::{
    Book, CollectionCounts, ColumnType, FieldFilter, Job, NewBook, NewJob, NewQuote, NewRecords,
    Quote, QuerySpec, Rating, Records, SourceKind, UpsertOutcome, join_tags,
};
use crate::{HarvestError, Result};

/// Record-level reads and writes, addressed by natural key.
pub struct RecordQueries;

impl RecordQueries {
    /// Upserts a typed batch in one transaction. Records whose natural-key
    /// fields are empty are skipped; for the rest, an existing key has its
    /// non-key fields replaced (last write wins) while a new key is
    /// inserted with a `scraped_at` stamp when the record carries none.
    #[inline]
    pub async fn upsert(pool: &DbPool, records: &NewRecords) -> Result<UpsertOutcome> {
        match records {
            NewRecords::Books(batch) => Self::upsert_books(pool, batch).await,
            NewRecords::Quotes(batch) => Self::upsert_quotes(pool, batch).await,
            NewRecords::Jobs(batch) => Self::upsert_jobs(pool, batch).await,
        }
    }

    #[inline]
    pub async fn upsert_books(pool: &DbPool, records: &[NewBook]) -> Result<UpsertOutcome> {
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let mut outcome = UpsertOutcome::default();
        let mut tx = pool.begin().await?;

        for record in records {
            if record.title.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            let existing = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM scraped_books WHERE title = ?",
            )
            .bind(&record.title)
            .fetch_one(&mut *tx)
            .await?;

            // Only a caller-supplied timestamp may replace the stored one.
            let update_clause = if record.scraped_at.is_some() {
                "price = excluded.price, rating = excluded.rating, \
                 availability = excluded.availability, scraped_at = excluded.scraped_at"
            } else {
                "price = excluded.price, rating = excluded.rating, \
                 availability = excluded.availability"
            };
            let sql = format!(
                "INSERT INTO scraped_books (title, price, rating, availability, scraped_at) \
                 VALUES (?, ?, ?, ?, ?) \
                 ON CONFLICT (title) DO UPDATE SET {update_clause}"
            );

            sqlx::query(&sql)
                .bind(&record.title)
                .bind(record.price)
                .bind(record.rating)
                .bind(&record.availability)
                .bind(record.scraped_at.unwrap_or_else(|| Utc::now().naive_utc()))
                .execute(&mut *tx)
                .await?;

            if existing > 0 {
                outcome.updated += 1;
            } else {
                outcome.inserted += 1;
            }
        }

        tx.commit().await?;
        debug!(
            "upserted books: {} new, {} updated, {} skipped",
            outcome.inserted, outcome.updated, outcome.skipped
        );
        Ok(outcome)
    }

    #[inline]
    pub async fn upsert_quotes(pool: &DbPool, records: &[NewQuote]) -> Result<UpsertOutcome> {
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let mut outcome = UpsertOutcome::default();
        let mut tx = pool.begin().await?;

        for record in records {
            if record.text.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            let existing = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM scraped_quotes WHERE text = ?",
            )
            .bind(&record.text)
            .fetch_one(&mut *tx)
            .await?;

            let update_clause = if record.scraped_at.is_some() {
                "author = excluded.author, tags = excluded.tags, \
                 scraped_at = excluded.scraped_at"
            } else {
                "author = excluded.author, tags = excluded.tags"
            };
            let sql = format!(
                "INSERT INTO scraped_quotes (text, author, tags, scraped_at) \
                 VALUES (?, ?, ?, ?) \
                 ON CONFLICT (text) DO UPDATE SET {update_clause}"
            );

            sqlx::query(&sql)
                .bind(&record.text)
                .bind(&record.author)
                .bind(join_tags(&record.tags))
                .bind(record.scraped_at.unwrap_or_else(|| Utc::now().naive_utc()))
                .execute(&mut *tx)
                .await?;

            if existing > 0 {
                outcome.updated += 1;
            } else {
                outcome.inserted += 1;
            }
        }

        tx.commit().await?;
        debug!(
            "upserted quotes: {} new, {} updated, {} skipped",
            outcome.inserted, outcome.updated, outcome.skipped
        );
        Ok(outcome)
    }

    #[inline]
    pub async fn upsert_jobs(pool: &DbPool, records: &[NewJob]) -> Result<UpsertOutcome> {
        if records.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let mut outcome = UpsertOutcome::default();
        let mut tx = pool.begin().await?;

        for record in records {
            if record.title.is_empty() || record.company.is_empty() || record.location.is_empty()
            {
                outcome.skipped += 1;
                continue;
            }

            let existing = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM scraped_jobs \
                 WHERE title = ? AND company = ? AND location = ?",
            )
            .bind(&record.title)
            .bind(&record.company)
            .bind(&record.location)
            .fetch_one(&mut *tx)
            .await?;

            let update_clause = if record.scraped_at.is_some() {
                "date_posted = excluded.date_posted, scraped_at = excluded.scraped_at"
            } else {
                "date_posted = excluded.date_posted"
            };
            let sql = format!(
                "INSERT INTO scraped_jobs (title, company, location, date_posted, scraped_at) \
                 VALUES (?, ?, ?, ?, ?) \
                 ON CONFLICT (title, company, location) DO UPDATE SET {update_clause}"
            );

            sqlx::query(&sql)
                .bind(&record.title)
                .bind(&record.company)
                .bind(&record.location)
                .bind(&record.date_posted)
                .bind(record.scraped_at.unwrap_or_else(|| Utc::now().naive_utc()))
                .execute(&mut *tx)
                .await?;

            if existing > 0 {
                outcome.updated += 1;
            } else {
                outcome.inserted += 1;
            }
        }

        tx.commit().await?;
        debug!(
            "upserted jobs: {} new, {} updated, {} skipped",
            outcome.inserted, outcome.updated, outcome.skipped
        );
        Ok(outcome)
    }

    /// Loads a whole collection in insertion order.
    #[inline]
    pub async fn load(pool: &DbPool, kind: SourceKind) -> Result<Records> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            select_list(kind),
            kind.collection()
        );
        fetch_records(pool, kind, &sql).await
    }

    /// Filtered read. Filter columns are validated against the collection
    /// schema before any SQL is assembled; values are always bound, never
    /// interpolated.
    #[inline]
    pub async fn query(pool: &DbPool, kind: SourceKind, spec: &QuerySpec) -> Result<Records> {
        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            select_list(kind),
            kind.collection()
        ));

        let mut first = true;
        for (column, filter) in &spec.filters {
            let column_type = column_type(kind, column)?;
            builder.push(if first { " WHERE " } else { " AND " });
            first = false;

            match filter {
                FieldFilter::Equals(value) => {
                    builder.push(format!("{column} = "));
                    match column_type {
                        ColumnType::Real => {
                            let number: f64 = value.parse().map_err(|_| {
                                HarvestError::InvalidFilter(format!(
                                    "column '{column}' needs a numeric value, got '{value}'"
                                ))
                            })?;
                            builder.push_bind(number);
                        }
                        ColumnType::Text => {
                            builder.push_bind(value.clone());
                        }
                    }
                }
                FieldFilter::Contains(needle) => {
                    if column_type != ColumnType::Text {
                        return Err(HarvestError::InvalidFilter(format!(
                            "substring match is only valid on text columns, not '{column}'"
                        )));
                    }
                    builder.push(format!("{column} LIKE "));
                    builder.push_bind(format!("%{}%", escape_like(needle)));
                    builder.push(" ESCAPE '\\'");
                }
                FieldFilter::Range { min, max } => {
                    if column_type != ColumnType::Real {
                        return Err(HarvestError::InvalidFilter(format!(
                            "range match is only valid on numeric columns, not '{column}'"
                        )));
                    }
                    match (min, max) {
                        (Some(low), Some(high)) => {
                            builder.push(format!("{column} >= "));
                            builder.push_bind(*low);
                            builder.push(format!(" AND {column} <= "));
                            builder.push_bind(*high);
                        }
                        (Some(low), None) => {
                            builder.push(format!("{column} >= "));
                            builder.push_bind(*low);
                        }
                        (None, Some(high)) => {
                            builder.push(format!("{column} <= "));
                            builder.push_bind(*high);
                        }
                        (None, None) => {
                            return Err(HarvestError::InvalidFilter(format!(
                                "range on '{column}' needs at least one bound"
                            )));
                        }
                    }
                }
            }
        }

        builder.push(" ORDER BY rowid");
        if let Some(limit) = spec.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::from(limit));
        }

        match kind {
            SourceKind::Books => {
                let rows = builder.build_query_as::<Book>().fetch_all(pool).await?;
                Ok(Records::Books(rows))
            }
            SourceKind::Quotes => {
                let rows = builder.build_query_as::<Quote>().fetch_all(pool).await?;
                Ok(Records::Quotes(rows))
            }
            SourceKind::Jobs => {
                let rows = builder.build_query_as::<Job>().fetch_all(pool).await?;
                Ok(Records::Jobs(rows))
            }
        }
    }

    /// Deletes every row in the collection; tables and key indexes stay in
    /// place, so later upserts still deduplicate. Returns rows removed.
    #[inline]
    pub async fn clear(pool: &DbPool, kind: SourceKind) -> Result<u64> {
        let result = sqlx::query(&format!("DELETE FROM {}", kind.collection()))
            .execute(pool)
            .await?;
        debug!("cleared {}: {} rows", kind, result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Row counts across all collections.
    #[inline]
    pub async fn counts(pool: &DbPool) -> Result<CollectionCounts> {
        let books = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scraped_books")
            .fetch_one(pool)
            .await?;
        let quotes = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scraped_quotes")
            .fetch_one(pool)
            .await?;
        let jobs = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scraped_jobs")
            .fetch_one(pool)
            .await?;
        Ok(CollectionCounts {
            books,
            quotes,
            jobs,
        })
    }
}

async fn fetch_records(pool: &DbPool, kind: SourceKind, sql: &str) -> Result<Records> {
    match kind {
        SourceKind::Books => {
            let rows = sqlx::query_as::<_, Book>(sql).fetch_all(pool).await?;
            Ok(Records::Books(rows))
        }
        SourceKind::Quotes => {
            let rows = sqlx::query_as::<_, Quote>(sql).fetch_all(pool).await?;
            Ok(Records::Quotes(rows))
        }
        SourceKind::Jobs => {
            let rows = sqlx::query_as::<_, Job>(sql).fetch_all(pool).await?;
            Ok(Records::Jobs(rows))
        }
    }
}

fn select_list(kind: SourceKind) -> String {
    let names: Vec<&str> = kind.columns().iter().map(|(name, _)| *name).collect();
    names.join(", ")
}

fn column_type(kind: SourceKind, column: &str) -> Result<ColumnType> {
    kind.columns()
        .iter()
        .find(|(name, _)| *name == column)
        .map(|&(_, column_type)| column_type)
        .ok_or_else(|| {
            HarvestError::InvalidFilter(format!("unknown column '{column}' for {kind}"))
        })
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Aggregate read models for the stats surface.
pub struct InsightQueries;

/// Average catalog price within one rating bucket.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RatingPriceRow {
    pub rating: Rating,
    pub avg_price: f64,
    pub titles: i64,
}

/// One of the priciest catalog entries.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PricedBookRow {
    pub title: String,
    pub price: f64,
    pub rating: Rating,
}

/// Quote volume for one author.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AuthorCountRow {
    pub author: String,
    pub quotes: i64,
}

impl InsightQueries {
    /// Average price per rating bucket, priciest bucket first.
    #[inline]
    pub async fn avg_price_by_rating(pool: &DbPool) -> Result<Vec<RatingPriceRow>> {
        let rows = sqlx::query_as::<_, RatingPriceRow>(
            "SELECT rating, AVG(price) AS avg_price, COUNT(*) AS titles \
             FROM scraped_books GROUP BY rating ORDER BY avg_price DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// The `n` priciest catalog entries.
    #[inline]
    pub async fn top_priced_books(pool: &DbPool, n: u32) -> Result<Vec<PricedBookRow>> {
        let rows = sqlx::query_as::<_, PricedBookRow>(
            "SELECT title, price, rating FROM scraped_books \
             ORDER BY price DESC, title ASC LIMIT ?",
        )
        .bind(i64::from(n))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Quote counts per author, most quoted first.
    #[inline]
    pub async fn author_counts(pool: &DbPool, n: u32) -> Result<Vec<AuthorCountRow>> {
        let rows = sqlx::query_as::<_, AuthorCountRow>(
            "SELECT author, COUNT(*) AS quotes FROM scraped_quotes \
             GROUP BY author ORDER BY quotes DESC, author ASC LIMIT ?",
        )
        .bind(i64::from(n))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
