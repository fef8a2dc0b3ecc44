#[cfg(test)]
mod tests;

use crate::database::models::{NewBook, NewJob, NewQuote};
use crate::scrape::{RawBook, RawJob, RawQuote};

/// Converts a currency string like `"£51.77"` into a float.
///
/// Strips everything except ASCII digits and the decimal point before
/// parsing, which also copes with mojibake prefixes such as `"Â£"`. Any
/// input that leaves no parseable number behind (empty strings, text
/// without digits, multiple decimal points) comes back as `0.0`.
#[inline]
pub fn clean_currency(raw: &str) -> f64 {
    let numeric: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse().unwrap_or(0.0)
}

/// Trims leading and trailing whitespace.
#[inline]
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_string()
}

/// Cleans a batch of raw catalog records into storable ones.
///
/// Price goes through [`clean_currency`], the title is trimmed; rating and
/// availability pass through untouched.
#[inline]
pub fn normalize_books(raw: Vec<RawBook>) -> Vec<NewBook> {
    raw.into_iter()
        .map(|book| NewBook {
            title: normalize_text(&book.title),
            price: clean_currency(&book.price),
            rating: book.rating,
            availability: book.availability,
            scraped_at: None,
        })
        .collect()
}

/// Cleans a batch of raw quotes; text and author are trimmed, the tag
/// sequence passes through in order.
#[inline]
pub fn normalize_quotes(raw: Vec<RawQuote>) -> Vec<NewQuote> {
    raw.into_iter()
        .map(|quote| NewQuote {
            text: normalize_text(&quote.text),
            author: normalize_text(&quote.author),
            tags: quote.tags,
            scraped_at: None,
        })
        .collect()
}

/// Cleans a batch of raw job postings; title, company, and location are
/// trimmed, the posting date passes through.
#[inline]
pub fn normalize_jobs(raw: Vec<RawJob>) -> Vec<NewJob> {
    raw.into_iter()
        .map(|job| NewJob {
            title: normalize_text(&job.title),
            company: normalize_text(&job.company),
            location: normalize_text(&job.location),
            date_posted: job.date_posted,
            scraped_at: None,
        })
        .collect()
}
