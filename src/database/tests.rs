use chrono::NaiveDate;
use tempfile::TempDir;

use super::models::{
    NewBook, NewJob, NewQuote, NewRecords, QuerySpec, Rating, Records, SourceKind,
};
use super::queries::{InsightQueries, RecordQueries};
use super::*;
use crate::HarvestError;

async fn create_test_db() -> (TempDir, Database) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("test.db");
    let database = Database::connect(path.to_str().expect("temp path is not utf-8"))
        .await
        .expect("Failed to open test database");
    (dir, database)
}

fn book(title: &str, price: f64, rating: Rating) -> NewBook {
    NewBook {
        title: title.to_string(),
        price,
        rating,
        availability: "In stock".to_string(),
        scraped_at: None,
    }
}

fn quote(text: &str, author: &str, tags: &[&str]) -> NewQuote {
    NewQuote {
        text: text.to_string(),
        author: author.to_string(),
        tags: tags.iter().map(|tag| (*tag).to_string()).collect(),
        scraped_at: None,
    }
}

fn job(title: &str, company: &str, location: &str) -> NewJob {
    NewJob {
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        date_posted: "2021-04-08".to_string(),
        scraped_at: None,
    }
}

#[tokio::test]
async fn init_is_idempotent() {
    let (_dir, database) = create_test_db().await;
    database.init().await.expect("second init failed");
    database.init().await.expect("third init failed");

    let outcome = RecordQueries::upsert_books(database.pool(), &[book("A", 1.0, Rating::One)])
        .await
        .expect("upsert failed");
    assert_eq!(outcome.inserted, 1);
}

#[tokio::test]
async fn upsert_inserts_then_updates_in_place() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let outcome = RecordQueries::upsert_books(pool, &[book("Sharp Objects", 51.77, Rating::Four)])
        .await
        .expect("first upsert failed");
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.updated, 0);

    let outcome = RecordQueries::upsert_books(pool, &[book("Sharp Objects", 12.0, Rating::Two)])
        .await
        .expect("second upsert failed");
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.updated, 1);

    let records = RecordQueries::load(pool, SourceKind::Books)
        .await
        .expect("load failed");
    let Records::Books(books) = records else {
        panic!("expected a books batch");
    };
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].price, 12.0);
    assert_eq!(books[0].rating, Rating::Two);
}

#[tokio::test]
async fn scraped_at_survives_updates_unless_supplied() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let first_stamp = NaiveDate::from_ymd_opt(2021, 4, 8)
        .expect("valid date")
        .and_hms_opt(9, 30, 0)
        .expect("valid time");
    let mut record = book("Soumission", 50.10, Rating::One);
    record.scraped_at = Some(first_stamp);
    RecordQueries::upsert_books(pool, &[record])
        .await
        .expect("first upsert failed");

    // An update without a timestamp keeps the stored one.
    RecordQueries::upsert_books(pool, &[book("Soumission", 45.17, Rating::One)])
        .await
        .expect("second upsert failed");
    let Records::Books(books) = RecordQueries::load(pool, SourceKind::Books)
        .await
        .expect("load failed")
    else {
        panic!("expected a books batch");
    };
    assert_eq!(books[0].price, 45.17);
    assert_eq!(books[0].scraped_at, first_stamp);

    // A caller-supplied timestamp replaces it.
    let second_stamp = NaiveDate::from_ymd_opt(2022, 1, 1)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time");
    let mut record = book("Soumission", 45.17, Rating::One);
    record.scraped_at = Some(second_stamp);
    RecordQueries::upsert_books(pool, &[record])
        .await
        .expect("third upsert failed");
    let Records::Books(books) = RecordQueries::load(pool, SourceKind::Books)
        .await
        .expect("load failed")
    else {
        panic!("expected a books batch");
    };
    assert_eq!(books[0].scraped_at, second_stamp);
}

#[tokio::test]
async fn empty_batch_is_a_noop() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let outcome = RecordQueries::upsert(pool, &NewRecords::Books(Vec::new()))
        .await
        .expect("empty upsert failed");
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.skipped, 0);

    let counts = RecordQueries::counts(pool).await.expect("counts failed");
    assert_eq!(counts.total(), 0);
}

#[tokio::test]
async fn records_with_empty_key_fields_are_skipped() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let outcome = RecordQueries::upsert_books(
        pool,
        &[book("", 9.99, Rating::Three), book("Kept", 5.0, Rating::One)],
    )
    .await
    .expect("books upsert failed");
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.skipped, 1);

    let outcome = RecordQueries::upsert_jobs(pool, &[job("Engineer", "", "Remote")])
        .await
        .expect("jobs upsert failed");
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.skipped, 1);

    let counts = RecordQueries::counts(pool).await.expect("counts failed");
    assert_eq!(counts.books, 1);
    assert_eq!(counts.jobs, 0);
}

#[tokio::test]
async fn tags_round_trip_as_an_ordered_sequence() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let batch = vec![
        quote("Q1", "Ada", &["zeta", "alpha", "mid"]),
        quote("Q2", "Grace", &[]),
    ];
    RecordQueries::upsert_quotes(pool, &batch)
        .await
        .expect("upsert failed");

    let Records::Quotes(quotes) = RecordQueries::load(pool, SourceKind::Quotes)
        .await
        .expect("load failed")
    else {
        panic!("expected a quotes batch");
    };
    assert_eq!(quotes[0].tags, vec!["zeta", "alpha", "mid"]);
    assert!(quotes[1].tags.is_empty());
}

#[tokio::test]
async fn jobs_deduplicate_on_the_compound_key() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let batch = vec![
        job("Engineer", "Google Inc", "NYC"),
        job("Engineer", "Meta", "NYC"),
        job("Engineer", "Google Inc", "NYC"),
    ];
    let outcome = RecordQueries::upsert_jobs(pool, &batch)
        .await
        .expect("upsert failed");
    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.updated, 1);

    let counts = RecordQueries::counts(pool).await.expect("counts failed");
    assert_eq!(counts.jobs, 2);
}

#[tokio::test]
async fn contains_filter_is_case_insensitive_substring() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let batch = vec![
        job("Engineer", "Google Inc", "NYC"),
        job("Engineer", "Meta", "SF"),
    ];
    RecordQueries::upsert_jobs(pool, &batch)
        .await
        .expect("upsert failed");

    let spec = QuerySpec::new().contains("company", "google");
    let Records::Jobs(jobs) = RecordQueries::query(pool, SourceKind::Jobs, &spec)
        .await
        .expect("query failed")
    else {
        panic!("expected a jobs batch");
    };
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].company, "Google Inc");
}

#[tokio::test]
async fn contains_filter_escapes_like_wildcards() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let batch = vec![
        job("Engineer", "100% Remote Co", "Anywhere"),
        job("Engineer", "100 Remote Co", "Anywhere"),
    ];
    RecordQueries::upsert_jobs(pool, &batch)
        .await
        .expect("upsert failed");

    let spec = QuerySpec::new().contains("company", "0%");
    let Records::Jobs(jobs) = RecordQueries::query(pool, SourceKind::Jobs, &spec)
        .await
        .expect("query failed")
    else {
        panic!("expected a jobs batch");
    };
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].company, "100% Remote Co");
}

#[tokio::test]
async fn range_equals_and_limit_filters() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let batch = vec![
        book("Cheap", 10.0, Rating::One),
        book("Middle", 20.0, Rating::Three),
        book("Dear", 30.0, Rating::Three),
    ];
    RecordQueries::upsert_books(pool, &batch)
        .await
        .expect("upsert failed");

    let spec = QuerySpec::new().range("price", Some(15.0), Some(35.0));
    let records = RecordQueries::query(pool, SourceKind::Books, &spec)
        .await
        .expect("range query failed");
    assert_eq!(records.len(), 2);

    let spec = QuerySpec::new().range("price", None, Some(15.0));
    let records = RecordQueries::query(pool, SourceKind::Books, &spec)
        .await
        .expect("open range query failed");
    assert_eq!(records.len(), 1);

    let spec = QuerySpec::new().equals("rating", "3");
    let records = RecordQueries::query(pool, SourceKind::Books, &spec)
        .await
        .expect("equals query failed");
    assert_eq!(records.len(), 2);

    let spec = QuerySpec::new().equals("rating", "3").limit(1);
    let Records::Books(books) = RecordQueries::query(pool, SourceKind::Books, &spec)
        .await
        .expect("limited query failed")
    else {
        panic!("expected a books batch");
    };
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Middle");
}

#[tokio::test]
async fn invalid_filters_are_typed_errors() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let spec = QuerySpec::new().equals("nope", "x");
    let result = RecordQueries::query(pool, SourceKind::Books, &spec).await;
    assert!(matches!(result, Err(HarvestError::InvalidFilter(_))));

    let spec = QuerySpec::new().range("title", Some(1.0), None);
    let result = RecordQueries::query(pool, SourceKind::Books, &spec).await;
    assert!(matches!(result, Err(HarvestError::InvalidFilter(_))));

    let spec = QuerySpec::new().contains("price", "9");
    let result = RecordQueries::query(pool, SourceKind::Books, &spec).await;
    assert!(matches!(result, Err(HarvestError::InvalidFilter(_))));

    let spec = QuerySpec::new().range("price", None, None);
    let result = RecordQueries::query(pool, SourceKind::Books, &spec).await;
    assert!(matches!(result, Err(HarvestError::InvalidFilter(_))));
}

#[tokio::test]
async fn empty_match_is_ok_and_empty() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let records = RecordQueries::load(pool, SourceKind::Quotes)
        .await
        .expect("load failed");
    assert!(records.is_empty());

    let spec = QuerySpec::new().contains("author", "nobody");
    let records = RecordQueries::query(pool, SourceKind::Quotes, &spec)
        .await
        .expect("query failed");
    assert!(records.is_empty());
}

#[tokio::test]
async fn load_preserves_insertion_order() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let batch = vec![
        book("Zebra", 1.0, Rating::One),
        book("Apple", 2.0, Rating::One),
        book("Mango", 3.0, Rating::One),
    ];
    RecordQueries::upsert_books(pool, &batch)
        .await
        .expect("upsert failed");

    let Records::Books(books) = RecordQueries::load(pool, SourceKind::Books)
        .await
        .expect("load failed")
    else {
        panic!("expected a books batch");
    };
    let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Zebra", "Apple", "Mango"]);
}

#[tokio::test]
async fn clear_empties_but_keeps_deduplication() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    RecordQueries::upsert_books(
        pool,
        &[book("A", 1.0, Rating::One), book("B", 2.0, Rating::Two)],
    )
    .await
    .expect("upsert failed");

    let removed = RecordQueries::clear(pool, SourceKind::Books)
        .await
        .expect("clear failed");
    assert_eq!(removed, 2);
    let counts = RecordQueries::counts(pool).await.expect("counts failed");
    assert_eq!(counts.books, 0);

    // The unique index survives, so duplicate keys still collapse.
    let outcome = RecordQueries::upsert_books(
        pool,
        &[book("A", 1.0, Rating::One), book("A", 9.0, Rating::Five)],
    )
    .await
    .expect("post-clear upsert failed");
    assert_eq!(outcome.inserted, 1);
    assert_eq!(outcome.updated, 1);
    let counts = RecordQueries::counts(pool).await.expect("counts failed");
    assert_eq!(counts.books, 1);
}

#[tokio::test]
async fn table_projection_selects_columns() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    RecordQueries::upsert_books(pool, &[book("Sharp Objects", 47.82, Rating::Four)])
        .await
        .expect("upsert failed");
    let records = RecordQueries::load(pool, SourceKind::Books)
        .await
        .expect("load failed");

    let projection = vec!["title".to_string(), "price".to_string()];
    let table = records
        .table(Some(projection.as_slice()))
        .expect("projection failed");
    assert_eq!(table.columns, vec!["title", "price"]);
    assert_eq!(table.rows, vec![vec!["Sharp Objects", "47.82"]]);

    let bad = vec!["publisher".to_string()];
    assert!(matches!(
        records.table(Some(bad.as_slice())),
        Err(HarvestError::InvalidFilter(_))
    ));
}

#[tokio::test]
async fn insight_queries_aggregate() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    let batch = vec![
        book("One Star A", 10.0, Rating::One),
        book("One Star B", 20.0, Rating::One),
        book("Five Star", 60.0, Rating::Five),
    ];
    RecordQueries::upsert_books(pool, &batch)
        .await
        .expect("books upsert failed");

    let rows = InsightQueries::avg_price_by_rating(pool)
        .await
        .expect("avg query failed");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].rating, Rating::Five);
    assert_eq!(rows[0].avg_price, 60.0);
    assert_eq!(rows[1].rating, Rating::One);
    assert_eq!(rows[1].avg_price, 15.0);
    assert_eq!(rows[1].titles, 2);

    let top = InsightQueries::top_priced_books(pool, 2)
        .await
        .expect("top query failed");
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].title, "Five Star");
    assert_eq!(top[1].title, "One Star B");

    let quotes_batch = vec![
        quote("Q1", "Ada", &["science"]),
        quote("Q2", "Ada", &[]),
        quote("Q3", "Grace", &["navy"]),
    ];
    RecordQueries::upsert_quotes(pool, &quotes_batch)
        .await
        .expect("quotes upsert failed");
    let authors = InsightQueries::author_counts(pool, 5)
        .await
        .expect("author query failed");
    assert_eq!(authors[0].author, "Ada");
    assert_eq!(authors[0].quotes, 2);
    assert_eq!(authors[1].author, "Grace");
}

#[tokio::test]
async fn insights_on_empty_tables_are_empty() {
    let (_dir, database) = create_test_db().await;
    let pool = database.pool();

    assert!(
        InsightQueries::avg_price_by_rating(pool)
            .await
            .expect("avg query failed")
            .is_empty()
    );
    assert!(
        InsightQueries::top_priced_books(pool, 5)
            .await
            .expect("top query failed")
            .is_empty()
    );
    assert!(
        InsightQueries::author_counts(pool, 5)
            .await
            .expect("author query failed")
            .is_empty()
    );
}
