mod dates;
mod error;
mod extract;
mod fetch;
mod progress;
mod records;
mod report;
mod scrape;
mod settings;
mod window;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use fetch::HttpFetcher;
use scrape::{EventQuery, RunOptions, RunSummary};
use settings::Settings;

#[derive(Parser)]
#[command(name = "quest_scraper", about = "Scrape the campus events calendar or the blotter")]
struct Cli {
    /// Directory the JSON and Markdown reports are written to
    output_dir: PathBuf,

    #[arg(value_enum)]
    site: Site,

    /// First day of the event window (default: today)
    #[arg(short, long)]
    start_date: Option<NaiveDate>,

    /// Days in the event window
    #[arg(short, long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=14))]
    days: u32,

    /// Word cap for descriptions and notes in the readable report
    #[arg(short = 'w', long, default_value_t = 200, value_parser = clap::value_parser!(u32).range(1..=10000))]
    max_words: u32,

    /// Fetch event detail pages concurrently
    #[arg(long)]
    parallel_details: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Site {
    Events,
    Blotter,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let settings = Settings::load().context("loading settings")?;
    let fetcher = HttpFetcher::new(&settings)?;
    scrape::prepare_output_dir(&cli.output_dir)?;

    let today = Local::now().date_naive();
    let run = RunOptions {
        output_dir: &cli.output_dir,
        run_date: today,
        max_words: cli.max_words as usize,
    };

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
            .unwrap()
            .progress_chars("#>-"),
    );
    let on_progress = |percent: u8| pb.set_position(percent as u64);

    let result = match cli.site {
        Site::Events => {
            let query = EventQuery {
                start: cli.start_date.unwrap_or(today),
                days: cli.days,
                parallel_details: cli.parallel_details,
            };
            scrape::scrape_events(&fetcher, &settings, &run, &query, &on_progress)
                .context("events scrape failed")
        }
        Site::Blotter => scrape::scrape_blotter(&fetcher, &settings, &run, &on_progress)
            .context("blotter scrape failed"),
    };
    pb.finish_and_clear();

    print_summary(&result?);

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if let Some(range) = &summary.date_range {
        println!("{}", range);
    }
    println!("Scraped {} records.", summary.records);
    println!("Wrote {}", summary.json_path.display());
    println!("Wrote {}", summary.readable_path.display());
    if !summary.warnings.is_empty() {
        println!("\n--- {} warnings ---", summary.warnings.len());
        for w in &summary.warnings {
            println!("  {}", w);
        }
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
