use std::collections::HashSet;
use std::sync::{LazyLock, Mutex};

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::{element_text, resolve_url, selector};
use crate::dates;
use crate::error::{Result, ScrapeError, Warning, Warnings};
use crate::fetch::DocumentFetcher;
use crate::progress::Progress;
use crate::records::{Event, ScrapeResult};
use crate::window::DateWindow;

static RESULTS_SEL: LazyLock<Selector> = LazyLock::new(|| selector("#event_results"));
static HEADER_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h2"));
static GROUP_SEL: LazyLock<Selector> = LazyLock::new(|| selector("div.em-card-group"));
static CARD_SEL: LazyLock<Selector> = LazyLock::new(|| selector(".em-card"));
static TITLE_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h3 a"));
static TEXT_SEL: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static NEXT_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"a[rel~="next"], .em-pagination a.next"#));
static DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector(".em-about_description"));

#[derive(Debug, Clone)]
pub struct EventOptions {
    /// Listing pages to follow before giving up.
    pub max_pages: usize,
    pub parallel_details: bool,
}

impl Default for EventOptions {
    fn default() -> Self {
        EventOptions {
            max_pages: 25,
            parallel_details: false,
        }
    }
}

/// One card from the listing, before its detail page is read.
#[derive(Debug, Clone, PartialEq)]
struct Listing {
    title: String,
    detail_url: String,
    date: NaiveDate,
    time: String,
    location: Option<String>,
}

/// What the walker does after a listing page.
#[derive(Debug, PartialEq)]
enum Continuation {
    /// A group past the window was seen; nothing later can qualify.
    Stop,
    Next(String),
    NoLink,
}

/// Walk the paged calendar from `start_url` and return every event whose
/// group date falls inside `window`, with descriptions from detail pages.
pub fn extract<F: DocumentFetcher + ?Sized>(
    fetcher: &F,
    start_url: &str,
    window: &DateWindow,
    options: &EventOptions,
    progress: &mut Progress,
) -> Result<ScrapeResult<Event>> {
    let mut warnings = Warnings::new();

    let listings = collect_listings(fetcher, start_url, window, options, &mut warnings)?;
    info!(
        "{} events between {} and {}",
        listings.len(),
        window.start(),
        window.cutoff()
    );

    let descriptions = if options.parallel_details {
        fetch_descriptions_parallel(fetcher, &listings, progress)
    } else {
        fetch_descriptions(fetcher, &listings, progress)
    };

    let records = listings
        .into_iter()
        .zip(descriptions)
        .map(|(listing, outcome)| into_event(listing, outcome, &mut warnings))
        .collect();

    Ok(ScrapeResult {
        records,
        date_range: None,
        warnings: warnings.into_vec(),
    })
}

fn collect_listings<F: DocumentFetcher + ?Sized>(
    fetcher: &F,
    start_url: &str,
    window: &DateWindow,
    options: &EventOptions,
    warnings: &mut Warnings,
) -> Result<Vec<Listing>> {
    let mut listings = Vec::new();
    let mut visited = HashSet::new();
    let mut url = start_url.to_string();

    loop {
        visited.insert(url.clone());
        let doc = fetcher.fetch_page(&url)?;
        let before = listings.len();
        let continuation = scan_page(&doc, &url, window, &mut listings, warnings)?;
        debug!(
            "page {} ({}): {} cards kept",
            visited.len(),
            url,
            listings.len() - before
        );

        match continuation {
            Continuation::Stop => break,
            Continuation::NoLink => {
                warnings.push(Warning::PaginationLinkMissing { page: url });
                break;
            }
            Continuation::Next(next) => {
                if visited.contains(&next) {
                    warnings.push(Warning::PageRevisited { url: next });
                    break;
                }
                if visited.len() >= options.max_pages {
                    warnings.push(Warning::PageLimitReached {
                        limit: options.max_pages,
                    });
                    break;
                }
                url = next;
            }
        }
    }

    Ok(listings)
}

/// Read one listing page into `listings` and decide whether to keep paging.
fn scan_page(
    doc: &Html,
    url: &str,
    window: &DateWindow,
    listings: &mut Vec<Listing>,
    warnings: &mut Warnings,
) -> Result<Continuation> {
    let results = doc
        .select(&RESULTS_SEL)
        .next()
        .ok_or_else(|| ScrapeError::Structure {
            url: url.to_string(),
            what: "#event_results",
        })?;

    let headers = results.select(&HEADER_SEL);
    let groups = results.select(&GROUP_SEL);

    for (header, group) in headers.zip(groups) {
        let header_text = element_text(header);
        let Some(group_date) = header_date(&header_text, window) else {
            warnings.push(Warning::UnparsedHeader {
                page: url.to_string(),
                text: header_text,
            });
            continue;
        };

        if window.past_window(&group_date) {
            return Ok(Continuation::Stop);
        }
        if !window.in_window(&group_date) {
            continue;
        }

        for card in group.select(&CARD_SEL) {
            match read_card(card, url, group_date, warnings) {
                Ok(listing) => listings.push(listing),
                Err(reason) => warnings.push(Warning::CardSkipped {
                    page: url.to_string(),
                    reason,
                }),
            }
        }
    }

    // Any lookup failure counts as "no next page".
    let next = doc
        .select(&NEXT_SEL)
        .find_map(|a| a.value().attr("href"))
        .and_then(|href| resolve_url(url, href));
    Ok(match next {
        Some(next) => Continuation::Next(next),
        None => Continuation::NoLink,
    })
}

/// Headers without a year belong to the window's year, or the next one when
/// the window straddles New Year.
fn header_date(text: &str, window: &DateWindow) -> Option<NaiveDate> {
    if let Some(d) = dates::parse_date(text, None) {
        return Some(d);
    }
    let year = window.start().year();
    let d = dates::parse_date(text, Some(year))?;
    if window.before_window(&d) && window.cutoff().year() > year {
        dates::parse_date(text, Some(year + 1))
    } else {
        Some(d)
    }
}

fn read_card(
    card: ElementRef,
    page: &str,
    group_date: NaiveDate,
    warnings: &mut Warnings,
) -> std::result::Result<Listing, String> {
    let link = card
        .select(&TITLE_LINK_SEL)
        .next()
        .ok_or("card has no title link")?;
    let title = element_text(link);
    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| format!("'{}' has no link target", title))?;
    let detail_url = resolve_url(page, href)
        .ok_or_else(|| format!("'{}' has an unusable link {:?}", title, href))?;

    let mut texts = card.select(&TEXT_SEL).map(element_text);
    let blob = texts.next().unwrap_or_default();
    let location = texts.next().filter(|l| !l.is_empty());

    let (date, time) = match dates::split_at_year(&blob) {
        Some((date_part, time_part)) => (
            dates::parse_date(date_part, Some(group_date.year())),
            time_part.to_string(),
        ),
        None => (None, blob.clone()),
    };
    let date = date.unwrap_or_else(|| {
        warnings.push(Warning::UndatedCard {
            title: title.clone(),
        });
        group_date
    });

    Ok(Listing {
        title,
        detail_url,
        date,
        time,
        location,
    })
}

/// `Ok(None)` when the page loaded but has no description block.
fn fetch_description<F: DocumentFetcher + ?Sized>(fetcher: &F, url: &str) -> Result<Option<String>> {
    let doc = fetcher.fetch_page(url)?;
    Ok(doc
        .select(&DESCRIPTION_SEL)
        .next()
        .map(|d| d.text().collect::<String>().trim().to_string()))
}

fn fetch_descriptions<F: DocumentFetcher + ?Sized>(
    fetcher: &F,
    listings: &[Listing],
    progress: &mut Progress,
) -> Vec<Result<Option<String>>> {
    let total = listings.len();
    listings
        .iter()
        .enumerate()
        .map(|(i, listing)| {
            let outcome = fetch_description(fetcher, &listing.detail_url);
            progress.fraction(i + 1, total);
            outcome
        })
        .collect()
}

/// Same as [`fetch_descriptions`] with pages fetched on the rayon pool.
/// Results keep card order; the counter and the callback share one lock.
fn fetch_descriptions_parallel<F: DocumentFetcher + ?Sized>(
    fetcher: &F,
    listings: &[Listing],
    progress: &mut Progress,
) -> Vec<Result<Option<String>>> {
    let total = listings.len();
    let tracker = Mutex::new((0usize, progress));
    listings
        .par_iter()
        .map(|listing| {
            let outcome = fetch_description(fetcher, &listing.detail_url);
            let mut guard = tracker.lock().unwrap_or_else(|e| e.into_inner());
            let (done, progress) = &mut *guard;
            *done += 1;
            progress.fraction(*done, total);
            outcome
        })
        .collect()
}

fn into_event(listing: Listing, outcome: Result<Option<String>>, warnings: &mut Warnings) -> Event {
    let description = match outcome {
        Ok(Some(text)) => text,
        Ok(None) => {
            warnings.push(Warning::MissingDescription {
                title: listing.title.clone(),
                url: listing.detail_url.clone(),
            });
            String::new()
        }
        Err(e) => {
            let reason = match e {
                ScrapeError::Fetch { reason, .. } => reason,
                other => other.to_string(),
            };
            warnings.push(Warning::DetailFetchFailed {
                title: listing.title.clone(),
                url: listing.detail_url.clone(),
                reason,
            });
            String::new()
        }
    };

    Event {
        date: dates::combine(listing.date, dates::parse_time(&listing.time)),
        title: listing.title,
        time: listing.time,
        location: listing.location,
        description,
    }
}
