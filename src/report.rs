use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::info;

use crate::dates::display_date;
use crate::error::{Result, ScrapeError};
use crate::records::{Case, Dated, Event};

/// Serialize records as a 4-space indented JSON array.
pub fn to_json<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut ser)?;
    Ok(buf)
}

pub fn write_json<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    write_file(path, &to_json(records)?)
}

pub fn write_events_readable(events: &[Event], path: &Path, max_words: usize) -> Result<()> {
    write_file(path, render_events(events, max_words).as_bytes())
}

pub fn write_blotter_readable(
    cases: &[Case],
    date_range: Option<&str>,
    path: &Path,
    max_words: usize,
) -> Result<()> {
    write_file(path, render_blotter(cases, date_range, max_words).as_bytes())
}

/// Shorten text with more than `max_words` space-separated words.
///
/// Whole sentences are appended until the running count of sentence
/// characters has passed `max_words`. The trigger counts words but the
/// budget counts characters; output sizes depend on that pairing.
pub fn cap_words(text: &str, max_words: usize) -> Cow<'_, str> {
    if text.split(' ').count() <= max_words {
        return Cow::Borrowed(text);
    }

    let mut out = String::new();
    let mut running = 0;
    for sentence in text.split_inclusive('.') {
        if running > max_words {
            break;
        }
        out.push_str(sentence);
        running += sentence.trim_end_matches('.').chars().count();
    }
    Cow::Owned(out)
}

pub fn render_events(events: &[Event], max_words: usize) -> String {
    let mut out = String::new();
    let mut headings = Headings::default();
    let mut written: HashSet<&str> = HashSet::new();

    for event in events {
        headings.write(&mut out, "#", event.day());

        let _ = writeln!(out, "**{}{}**\n", event.title, when_where(event));
        let description = event.description.as_str();
        if !description.is_empty() && written.insert(description) {
            let _ = writeln!(out, "{}\n", cap_words(description, max_words));
        }
        out.push_str("---\n\n");
    }
    out
}

pub fn render_blotter(cases: &[Case], date_range: Option<&str>, max_words: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## {}\n", date_range.unwrap_or("Date range unavailable"));

    let mut headings = Headings::default();
    for case in cases {
        headings.write(&mut out, "##", case.day());

        let _ = writeln!(
            out,
            "**{}; {}; {}**\n",
            or_unknown(&case.case_number),
            or_unknown(&case.description),
            or_unknown(&case.location)
        );
        match case.notes.as_deref() {
            Some(notes) => {
                let _ = writeln!(out, "\"Notes: {}\"\n", cap_words(notes, max_words));
            }
            None => out.push_str("_No notes recorded._\n\n"),
        }
    }
    out
}

/// Emits a heading whenever the date differs from the previous record's.
#[derive(Default)]
struct Headings {
    previous: Option<Option<NaiveDate>>,
}

impl Headings {
    fn write(&mut self, out: &mut String, marker: &str, day: Option<NaiveDate>) {
        if self.previous == Some(day) {
            return;
        }
        self.previous = Some(day);
        let label = day.map(display_date).unwrap_or_else(|| "Date unknown".to_string());
        let _ = writeln!(out, "{} {}\n", marker, label);
    }
}

fn when_where(event: &Event) -> String {
    match (event.time.is_empty(), event.location.as_deref()) {
        (false, Some(loc)) => format!(" ({} @ {})", event.time, loc),
        (false, None) => format!(" ({})", event.time),
        (true, Some(loc)) => format!(" (@ {})", loc),
        (true, None) => String::new(),
    }
}

fn or_unknown(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("unknown")
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|source| ScrapeError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
