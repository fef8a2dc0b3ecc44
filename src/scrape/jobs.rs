use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{Extracted, FetchClient, PageCatch, progress_spinner, selector};
use crate::Result;

/// One job card as scraped, before cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub date_posted: String,
}

struct JobSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    location: Selector,
    time: Selector,
}

impl JobSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            card: selector("div.card")?,
            title: selector("h2.title")?,
            company: selector("h3.company")?,
            location: selector("p.location")?,
            time: selector("time")?,
        })
    }
}

/// Scrapes the single-page job board: one fetch, up to `limit` cards. A
/// failed fetch yields an empty batch.
#[inline]
pub async fn scrape_jobs(
    client: &mut FetchClient,
    url: &str,
    limit: usize,
) -> Result<Extracted<RawJob>> {
    let selectors = JobSelectors::new()?;
    let mut extracted = Extracted::empty();
    if limit == 0 {
        return Ok(extracted);
    }

    let bar = progress_spinner("Scraping jobs".to_string());
    let Some(body) = client.fetch(url).await else {
        debug!("job board fetch failed");
        bar.finish_and_clear();
        return Ok(extracted);
    };
    extracted.stats.pages_fetched = 1;

    let catch = extract_cards(&body, &selectors, limit);
    extracted.records = catch.records;
    extracted.stats.items_skipped = catch.skipped;

    bar.finish_and_clear();
    extracted.stats.items_extracted = extracted.records.len();
    Ok(extracted)
}

fn extract_cards(body: &str, selectors: &JobSelectors, budget: usize) -> PageCatch<RawJob> {
    let document = Html::parse_document(body);
    let mut catch = PageCatch::new();

    for element in document.select(&selectors.card) {
        catch.containers += 1;
        match parse_card(element, selectors) {
            Some(job) => {
                catch.records.push(job);
                if catch.records.len() >= budget {
                    debug!("reached limit of {budget}");
                    break;
                }
            }
            None => catch.skipped += 1,
        }
    }

    catch
}

fn parse_card(element: ElementRef<'_>, selectors: &JobSelectors) -> Option<RawJob> {
    let title = element
        .select(&selectors.title)
        .next()?
        .text()
        .collect::<String>();
    let company = element
        .select(&selectors.company)
        .next()?
        .text()
        .collect::<String>();
    let location = element
        .select(&selectors.location)
        .next()?
        .text()
        .collect::<String>();
    let date_posted = element
        .select(&selectors.time)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();

    Some(RawJob {
        title,
        company,
        location,
        date_posted,
    })
}
