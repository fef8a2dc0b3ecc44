use super::*;
use crate::database::models::Rating;

#[test]
fn currency_with_pound_symbol() {
    assert_eq!(clean_currency("£51.77"), 51.77);
}

#[test]
fn currency_with_mojibake_prefix() {
    assert_eq!(clean_currency("Â£51.77"), 51.77);
}

#[test]
fn currency_plain_number() {
    assert_eq!(clean_currency("19.99"), 19.99);
}

#[test]
fn currency_empty_string() {
    assert_eq!(clean_currency(""), 0.0);
}

#[test]
fn currency_without_digits() {
    assert_eq!(clean_currency("free shipping"), 0.0);
}

#[test]
fn currency_with_multiple_decimal_points() {
    assert_eq!(clean_currency("1.2.3"), 0.0);
}

#[test]
fn currency_with_thousands_noise() {
    assert_eq!(clean_currency("$1,299.50"), 1299.50);
}

#[test]
fn text_trims_surrounding_whitespace() {
    assert_eq!(normalize_text("  A Light in the Attic  "), "A Light in the Attic");
    assert_eq!(normalize_text("\n\tIn stock\n"), "In stock");
}

#[test]
fn text_preserves_interior_whitespace() {
    assert_eq!(normalize_text(" two  spaces "), "two  spaces");
}

#[test]
fn books_batch_cleans_price_and_title() {
    let raw = vec![RawBook {
        title: "  Sharp Objects ".to_string(),
        price: "£47.82".to_string(),
        rating: Rating::Four,
        availability: "In stock".to_string(),
    }];

    let cleaned = normalize_books(raw);
    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned[0].title, "Sharp Objects");
    assert_eq!(cleaned[0].price, 47.82);
    assert_eq!(cleaned[0].rating, Rating::Four);
    assert_eq!(cleaned[0].availability, "In stock");
    assert!(cleaned[0].scraped_at.is_none());
}

#[test]
fn books_batch_tolerates_empty_input() {
    assert!(normalize_books(Vec::new()).is_empty());
    assert!(normalize_quotes(Vec::new()).is_empty());
    assert!(normalize_jobs(Vec::new()).is_empty());
}

#[test]
fn quotes_batch_keeps_tag_order() {
    let raw = vec![RawQuote {
        text: " “Simplicity is the ultimate sophistication.” ".to_string(),
        author: " Leonardo da Vinci ".to_string(),
        tags: vec!["design".to_string(), "simplicity".to_string()],
    }];

    let cleaned = normalize_quotes(raw);
    assert_eq!(cleaned[0].text, "“Simplicity is the ultimate sophistication.”");
    assert_eq!(cleaned[0].author, "Leonardo da Vinci");
    assert_eq!(cleaned[0].tags, vec!["design", "simplicity"]);
}

#[test]
fn jobs_batch_trims_key_fields() {
    let raw = vec![RawJob {
        title: " Senior Python Developer ".to_string(),
        company: " Payne, Roberts and Davis ".to_string(),
        location: " Stewartbury, AA ".to_string(),
        date_posted: "2021-04-08".to_string(),
    }];

    let cleaned = normalize_jobs(raw);
    assert_eq!(cleaned[0].title, "Senior Python Developer");
    assert_eq!(cleaned[0].company, "Payne, Roberts and Davis");
    assert_eq!(cleaned[0].location, "Stewartbury, AA");
    assert_eq!(cleaned[0].date_posted, "2021-04-08");
}
