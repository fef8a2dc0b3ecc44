use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{Extracted, FetchClient, PageCatch, page_url, progress_spinner, selector};
use crate::Result;
use crate::database::models::Rating;

/// One catalog entry as scraped, before cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBook {
    pub title: String,
    pub price: String,
    pub rating: Rating,
    pub availability: String,
}

struct BookSelectors {
    pod: Selector,
    title_link: Selector,
    price: Selector,
    star: Selector,
    availability: Selector,
}

impl BookSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            pod: selector("article.product_pod")?,
            title_link: selector("h3 a")?,
            price: selector("p.price_color")?,
            star: selector("p.star-rating")?,
            availability: selector("p.instock.availability")?,
        })
    }
}

/// Walks numbered catalog pages, starting at 1, until a fetch fails, a page
/// has no catalog entries, or `limit` records are collected.
#[inline]
pub async fn scrape_books(
    client: &mut FetchClient,
    template: &str,
    limit: usize,
) -> Result<Extracted<RawBook>> {
    let selectors = BookSelectors::new()?;
    let mut extracted = Extracted::empty();
    if limit == 0 {
        return Ok(extracted);
    }

    let bar = progress_spinner("Scraping books".to_string());
    let mut page = 1;

    loop {
        let url = page_url(template, page);
        let Some(body) = client.fetch(&url).await else {
            debug!("stopping at page {page}: fetch failed");
            break;
        };
        extracted.stats.pages_fetched += 1;

        let catch = extract_pods(&body, &selectors, limit - extracted.records.len());
        extracted.stats.items_skipped += catch.skipped;
        if catch.containers == 0 {
            debug!("stopping at page {page}: no catalog entries");
            break;
        }

        extracted.records.extend(catch.records);
        if extracted.records.len() >= limit {
            debug!("stopping at page {page}: reached limit of {limit}");
            break;
        }

        bar.set_message(format!(
            "Scraping books: page {page}, {} records",
            extracted.records.len()
        ));
        bar.tick();
        page += 1;
    }

    bar.finish_and_clear();
    extracted.stats.items_extracted = extracted.records.len();
    Ok(extracted)
}

/// Parses one catalog page in isolation. The pipeline goes through
/// [`scrape_books`]; this exists for the bench harness.
#[cfg(feature = "bench")]
#[inline]
pub fn extract_catalog(body: &str) -> Result<Vec<RawBook>> {
    let selectors = BookSelectors::new()?;
    Ok(extract_pods(body, &selectors, usize::MAX).records)
}

fn extract_pods(body: &str, selectors: &BookSelectors, budget: usize) -> PageCatch<RawBook> {
    let document = Html::parse_document(body);
    let mut catch = PageCatch::new();

    for element in document.select(&selectors.pod) {
        catch.containers += 1;
        match parse_pod(element, selectors) {
            Some(book) => {
                catch.records.push(book);
                if catch.records.len() >= budget {
                    break;
                }
            }
            None => catch.skipped += 1,
        }
    }

    catch
}

fn parse_pod(element: ElementRef<'_>, selectors: &BookSelectors) -> Option<RawBook> {
    let title = element
        .select(&selectors.title_link)
        .next()?
        .value()
        .attr("title")?
        .to_string();
    let price = element
        .select(&selectors.price)
        .next()?
        .text()
        .collect::<String>();
    let rating = rating_marker(element.select(&selectors.star).next()?);
    let availability = element
        .select(&selectors.availability)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();

    Some(RawBook {
        title,
        price,
        rating,
        availability,
    })
}

/// The star element carries its rating as a sibling class of
/// `star-rating`; anything outside the known vocabulary is `Unknown`.
fn rating_marker(element: ElementRef<'_>) -> Rating {
    element
        .value()
        .classes()
        .find(|class| *class != "star-rating")
        .map_or(Rating::Unknown, Rating::from_marker)
}
