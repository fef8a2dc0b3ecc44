use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{Extracted, FetchClient, PageCatch, page_url, progress_spinner, selector};
use crate::Result;

/// One quote as scraped, before cleaning. Tags keep their document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuote {
    pub text: String,
    pub author: String,
    pub tags: Vec<String>,
}

struct QuoteSelectors {
    quote: Selector,
    text: Selector,
    author: Selector,
    tag: Selector,
}

impl QuoteSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            quote: selector("div.quote")?,
            text: selector("span.text")?,
            author: selector("small.author")?,
            tag: selector("div.tags a.tag")?,
        })
    }
}

/// Walks numbered quote pages, starting at 1, until a fetch fails, a page
/// has no quotes, or `limit` records are collected.
#[inline]
pub async fn scrape_quotes(
    client: &mut FetchClient,
    template: &str,
    limit: usize,
) -> Result<Extracted<RawQuote>> {
    let selectors = QuoteSelectors::new()?;
    let mut extracted = Extracted::empty();
    if limit == 0 {
        return Ok(extracted);
    }

    let bar = progress_spinner("Scraping quotes".to_string());
    let mut page = 1;

    loop {
        let url = page_url(template, page);
        let Some(body) = client.fetch(&url).await else {
            debug!("stopping at page {page}: fetch failed");
            break;
        };
        extracted.stats.pages_fetched += 1;

        let catch = extract_listing_page(&body, &selectors, limit - extracted.records.len());
        extracted.stats.items_skipped += catch.skipped;
        if catch.containers == 0 {
            debug!("stopping at page {page}: no quotes");
            break;
        }

        extracted.records.extend(catch.records);
        if extracted.records.len() >= limit {
            debug!("stopping at page {page}: reached limit of {limit}");
            break;
        }

        bar.set_message(format!(
            "Scraping quotes: page {page}, {} records",
            extracted.records.len()
        ));
        bar.tick();
        page += 1;
    }

    bar.finish_and_clear();
    extracted.stats.items_extracted = extracted.records.len();
    Ok(extracted)
}

/// Parses one listing page in isolation. The pipeline goes through
/// [`scrape_quotes`]; this exists for the bench harness.
#[cfg(feature = "bench")]
#[inline]
pub fn extract_listing(body: &str) -> Result<Vec<RawQuote>> {
    let selectors = QuoteSelectors::new()?;
    Ok(extract_listing_page(body, &selectors, usize::MAX).records)
}

fn extract_listing_page(
    body: &str,
    selectors: &QuoteSelectors,
    budget: usize,
) -> PageCatch<RawQuote> {
    let document = Html::parse_document(body);
    let mut catch = PageCatch::new();

    for element in document.select(&selectors.quote) {
        catch.containers += 1;
        match parse_quote(element, selectors) {
            Some(quote) => {
                catch.records.push(quote);
                if catch.records.len() >= budget {
                    break;
                }
            }
            None => catch.skipped += 1,
        }
    }

    catch
}

fn parse_quote(element: ElementRef<'_>, selectors: &QuoteSelectors) -> Option<RawQuote> {
    let text = element
        .select(&selectors.text)
        .next()?
        .text()
        .collect::<String>();
    let author = element
        .select(&selectors.author)
        .next()?
        .text()
        .collect::<String>();
    // An untagged quote is still a quote.
    let tags = element
        .select(&selectors.tag)
        .map(|tag| tag.text().collect::<String>())
        .collect();

    Some(RawQuote { text, author, tags })
}
