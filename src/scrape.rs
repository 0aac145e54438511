use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::error::{Result, ScrapeError, Warning};
use crate::extract::{blotter, events};
use crate::fetch::DocumentFetcher;
use crate::progress::Progress;
use crate::report;
use crate::settings::Settings;
use crate::window::DateWindow;

/// Where and how a run writes its files.
pub struct RunOptions<'a> {
    pub output_dir: &'a Path,
    /// Local date used as the file name prefix.
    pub run_date: NaiveDate,
    pub max_words: usize,
}

pub struct EventQuery {
    pub start: NaiveDate,
    pub days: u32,
    pub parallel_details: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub json_path: PathBuf,
    pub readable_path: PathBuf,
    pub records: usize,
    pub date_range: Option<String>,
    pub warnings: Vec<Warning>,
}

pub fn scrape_events<F: DocumentFetcher + ?Sized>(
    fetcher: &F,
    settings: &Settings,
    run: &RunOptions,
    query: &EventQuery,
    on_progress: &(dyn Fn(u8) + Sync),
) -> Result<RunSummary> {
    let mut progress = Progress::new(on_progress);
    progress.report(0);

    let window = DateWindow::new(query.start, query.days);
    let options = events::EventOptions {
        max_pages: settings.max_pages,
        parallel_details: query.parallel_details,
    };
    info!(
        "Scraping events from {} for {} days starting {}",
        settings.events_url,
        window.span_days(),
        window.start()
    );
    let result = events::extract(fetcher, &settings.events_url, &window, &options, &mut progress)?;

    let json_path = output_path(run, "event-scrape.json");
    let readable_path = output_path(run, "events-readable.md");
    report::write_json(&result.records, &json_path)?;
    report::write_events_readable(&result.records, &readable_path, run.max_words)?;
    progress.report(100);

    Ok(RunSummary {
        json_path,
        readable_path,
        records: result.records.len(),
        date_range: result.date_range,
        warnings: result.warnings,
    })
}

pub fn scrape_blotter<F: DocumentFetcher + ?Sized>(
    fetcher: &F,
    settings: &Settings,
    run: &RunOptions,
    on_progress: &(dyn Fn(u8) + Sync),
) -> Result<RunSummary> {
    let mut progress = Progress::new(on_progress);
    progress.report(0);

    info!("Scraping blotter from {}", settings.blotter_url);
    let doc = fetcher.fetch_page(&settings.blotter_url)?;
    let result = blotter::extract(&doc, &settings.blotter_url, &mut progress)?;

    let json_path = output_path(run, "blotter-scrape.json");
    let readable_path = output_path(run, "blotter-readable.md");
    report::write_json(&result.records, &json_path)?;
    report::write_blotter_readable(
        &result.records,
        result.date_range.as_deref(),
        &readable_path,
        run.max_words,
    )?;
    progress.report(100);

    Ok(RunSummary {
        json_path,
        readable_path,
        records: result.records.len(),
        date_range: result.date_range,
        warnings: result.warnings,
    })
}

/// Create the output directory if needed.
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| ScrapeError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

fn output_path(run: &RunOptions, suffix: &str) -> PathBuf {
    run.output_dir
        .join(format!("{}-{}", run.run_date.format("%Y-%m-%d"), suffix))
}
