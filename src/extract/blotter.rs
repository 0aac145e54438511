use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::{element_text, selector};
use crate::dates;
use crate::error::{Result, ScrapeError, Warning, Warnings};
use crate::progress::Progress;
use crate::records::{Case, ScrapeResult};

static MAIN_SEL: LazyLock<Selector> = LazyLock::new(|| selector("#mainContent"));
static LEAD_SEL: LazyLock<Selector> = LazyLock::new(|| selector("p.lead"));
static PARAGRAPH_SEL: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static SPAN_SEL: LazyLock<Selector> = LazyLock::new(|| selector("span"));

/// Paragraphs of page boilerplate ahead of the first case.
const PREAMBLE_PARAGRAPHS: usize = 8;
const VOID_MARKER: &str = "VOID REPORT";
/// Paragraphs with fewer spans than a label and a value are not part of a case.
const MIN_SPANS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CaseField {
    CaseNumber,
    Date,
    Time,
    Description,
    Location,
    Notes,
}

impl CaseField {
    pub fn name(self) -> &'static str {
        match self {
            CaseField::CaseNumber => "case number",
            CaseField::Date => "date",
            CaseField::Time => "time",
            CaseField::Description => "description",
            CaseField::Location => "location",
            CaseField::Notes => "notes",
        }
    }
}

impl fmt::Display for CaseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where each field sits among a paragraph's `<span>`s. The blotter has no
/// semantic markup, so labels and values simply alternate.
pub struct LabeledSpanRecord {
    fields: &'static [(CaseField, usize)],
}

pub const FACTS_LAYOUT: LabeledSpanRecord = LabeledSpanRecord {
    fields: &[
        (CaseField::CaseNumber, 1),
        (CaseField::Date, 3),
        (CaseField::Time, 5),
        (CaseField::Description, 7),
        (CaseField::Location, 9),
    ],
};

pub const NOTES_LAYOUT: LabeledSpanRecord = LabeledSpanRecord {
    fields: &[(CaseField::Notes, 1)],
};

/// Values read through a [`LabeledSpanRecord`], plus the fields that had no
/// (or an empty) span.
#[derive(Debug, Default)]
pub struct SpanValues {
    values: BTreeMap<CaseField, String>,
    missing: BTreeSet<CaseField>,
}

impl LabeledSpanRecord {
    pub fn read(&self, spans: &[String]) -> SpanValues {
        let mut out = SpanValues::default();
        for &(field, index) in self.fields {
            match spans.get(index).map(|s| s.trim()).filter(|s| !s.is_empty()) {
                Some(text) => {
                    out.values.insert(field, text.to_string());
                }
                None => {
                    out.missing.insert(field);
                }
            }
        }
        out
    }

    /// True when a case number or a date can be read.
    pub fn identifies_case(&self, spans: &[String]) -> bool {
        let values = self.read(spans);
        values.values.contains_key(&CaseField::CaseNumber)
            || values.values.contains_key(&CaseField::Date)
    }

    /// Every field this layout declares, reported missing.
    pub fn absent(&self) -> SpanValues {
        SpanValues {
            values: BTreeMap::new(),
            missing: self.fields.iter().map(|&(f, _)| f).collect(),
        }
    }
}

impl SpanValues {
    fn take(&mut self, field: CaseField) -> Option<String> {
        self.values.remove(&field)
    }

    fn merge(&mut self, other: SpanValues) {
        self.values.extend(other.values);
        self.missing.extend(other.missing);
    }
}

#[derive(Debug, PartialEq)]
pub enum CaseOutcome {
    Complete(Case),
    Partial {
        case: Case,
        missing: BTreeSet<CaseField>,
    },
}

/// Parse the blotter page into cases. Only a missing `#mainContent` is fatal.
pub fn extract(doc: &Html, url: &str, progress: &mut Progress) -> Result<ScrapeResult<Case>> {
    let main = doc
        .select(&MAIN_SEL)
        .next()
        .ok_or_else(|| ScrapeError::Structure {
            url: url.to_string(),
            what: "#mainContent",
        })?;

    let mut warnings = Warnings::new();

    let date_range = main
        .select(&LEAD_SEL)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());
    if date_range.is_none() {
        warnings.push(Warning::MissingDateRange);
    }

    let paragraphs: Vec<(usize, Vec<String>)> = main
        .select(&PARAGRAPH_SEL)
        .enumerate()
        .skip(PREAMBLE_PARAGRAPHS)
        .filter(|(_, p)| !p.text().collect::<String>().contains(VOID_MARKER))
        .map(|(i, p)| (i, span_texts(p)))
        .filter(|(_, spans)| spans.len() >= MIN_SPANS)
        .collect();
    debug!("{} case paragraphs after filtering", paragraphs.len());

    let pairs: Vec<_> = paragraphs.chunks(2).collect();
    let total = pairs.len();
    let mut records = Vec::with_capacity(total);

    for (n, pair) in pairs.into_iter().enumerate() {
        let (index, facts) = &pair[0];
        if !FACTS_LAYOUT.identifies_case(facts) {
            warnings.push(Warning::CaseSkipped {
                paragraph: *index,
                reason: "no case number or date in the case paragraph".to_string(),
            });
            progress.fraction(n + 1, total);
            continue;
        }

        let notes = pair.get(1).map(|(_, spans)| spans.as_slice());
        match build_case(facts, notes) {
            CaseOutcome::Complete(case) => records.push(case),
            CaseOutcome::Partial { case, missing } => {
                warnings.push(Warning::PartialCase {
                    partial: describe_partial(&case, *index),
                    missing: missing.iter().map(|f| f.name()).collect(),
                });
                records.push(case);
            }
        }
        progress.fraction(n + 1, total);
    }

    info!("{} cases read from blotter", records.len());
    Ok(ScrapeResult {
        records,
        date_range,
        warnings: warnings.into_vec(),
    })
}

/// Build one case from its facts spans and (if present) its notes spans.
pub fn build_case(facts: &[String], notes: Option<&[String]>) -> CaseOutcome {
    let mut values = FACTS_LAYOUT.read(facts);
    values.merge(match notes {
        Some(spans) => NOTES_LAYOUT.read(spans),
        None => NOTES_LAYOUT.absent(),
    });

    let date = values
        .take(CaseField::Date)
        .and_then(|text| dates::parse_date(&text, None));
    if date.is_none() {
        values.missing.insert(CaseField::Date);
    }
    let time = values.take(CaseField::Time).and_then(|text| dates::parse_time(&text));
    // Without a date the time has nothing to attach to.
    if date.is_none() || time.is_none() {
        values.missing.insert(CaseField::Time);
    }

    let case = Case {
        case_number: values.take(CaseField::CaseNumber),
        date: date.map(|d| dates::combine(d, time)),
        description: values.take(CaseField::Description),
        location: values.take(CaseField::Location),
        notes: values.take(CaseField::Notes),
    };

    if values.missing.is_empty() {
        CaseOutcome::Complete(case)
    } else {
        CaseOutcome::Partial {
            case,
            missing: values.missing,
        }
    }
}

fn span_texts(paragraph: ElementRef) -> Vec<String> {
    paragraph.select(&SPAN_SEL).map(element_text).collect()
}

fn describe_partial(case: &Case, paragraph: usize) -> String {
    match (&case.case_number, &case.description) {
        (Some(num), Some(desc)) => format!("{} ({})", num, desc),
        (Some(num), None) => num.clone(),
        (None, Some(desc)) => format!("at paragraph {} ({})", paragraph, desc),
        (None, None) => format!("at paragraph {}", paragraph),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::fetch::testing::fixture;

    const URL: &str = "https://www.example.edu/blotter.html";

    fn spans(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn facts_p(num: &str, date: &str, time: &str, desc: &str, loc: &str) -> String {
        format!(
            "<p><span>Case #:</span> <span>{num}</span> <span>Date:</span> <span>{date}</span> \
             <span>Time:</span> <span>{time}</span> <span>Incident:</span> <span>{desc}</span> \
             <span>Location:</span> <span>{loc}</span></p>"
        )
    }

    fn notes_p(notes: &str) -> String {
        format!("<p><span>Notes:</span> <span>{notes}</span></p>")
    }

    fn page(lead: Option<&str>, body: &[String]) -> Html {
        let lead = lead
            .map(|l| format!(r#"<p class="lead">{l}</p>"#))
            .unwrap_or_else(|| "<p>Community Safety</p>".to_string());
        let preamble: String = (0..7).map(|i| format!("<p>Boilerplate {i}</p>")).collect();
        Html::parse_document(&format!(
            r#"<html><body><div id="mainContent">{lead}{preamble}{}</div></body></html>"#,
            body.concat()
        ))
    }

    fn run(doc: &Html) -> ScrapeResult<Case> {
        let sink = |_: u8| {};
        let mut progress = Progress::new(&sink);
        extract(doc, URL, &mut progress).unwrap()
    }

    #[test]
    fn complete_case() {
        let outcome = build_case(
            &spans(&["Case #:", "24-0001", "Date:", "January 2, 2024", "Time:", "14:30", "Incident:", "Theft", "Location:", "Library"]),
            Some(spans(&["Notes:", "Bike taken from rack."]).as_slice()),
        );
        let CaseOutcome::Complete(case) = outcome else {
            panic!("expected complete case");
        };
        assert_eq!(case.case_number.as_deref(), Some("24-0001"));
        assert_eq!(
            case.date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(14, 30, 0)
        );
        assert_eq!(case.description.as_deref(), Some("Theft"));
        assert_eq!(case.location.as_deref(), Some("Library"));
        assert_eq!(case.notes.as_deref(), Some("Bike taken from rack."));
    }

    #[test]
    fn short_facts_keep_what_was_read() {
        let outcome = build_case(
            &spans(&["Case #:", "24-0002", "Date:", "1/3/2024", "Time:", "0915"]),
            None,
        );
        let CaseOutcome::Partial { case, missing } = outcome else {
            panic!("expected partial case");
        };
        assert_eq!(case.case_number.as_deref(), Some("24-0002"));
        assert_eq!(
            case.date,
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(9, 15, 0)
        );
        assert_eq!(
            missing.into_iter().collect::<Vec<_>>(),
            vec![CaseField::Description, CaseField::Location, CaseField::Notes]
        );
    }

    #[test]
    fn unreadable_time_keeps_date() {
        let outcome = build_case(
            &spans(&["Case #:", "24-0003", "Date:", "January 4, 2024", "Time:", "unknown", "Incident:", "Noise", "Location:", "Dorm"]),
            Some(spans(&["Notes:", "Quiet now."]).as_slice()),
        );
        let CaseOutcome::Partial { case, missing } = outcome else {
            panic!("expected partial case");
        };
        assert_eq!(case.date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap().and_hms_opt(0, 0, 0));
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec![CaseField::Time]);
    }

    #[test]
    fn unreadable_date_reports_lost_time() {
        let outcome = build_case(
            &spans(&["Case #:", "24-0005", "Date:", "sometime", "Time:", "14:00", "Incident:", "Noise", "Location:", "Dorm"]),
            Some(spans(&["Notes:", "Resolved."]).as_slice()),
        );
        let CaseOutcome::Partial { case, missing } = outcome else {
            panic!("expected partial case");
        };
        assert_eq!(case.date, None);
        assert_eq!(
            missing.into_iter().collect::<Vec<_>>(),
            vec![CaseField::Date, CaseField::Time]
        );
    }

    #[test]
    fn layout_reports_missing_positions() {
        let values = FACTS_LAYOUT.read(&spans(&["Case #:", "24-0004", "Date:", ""]));
        assert_eq!(values.values.get(&CaseField::CaseNumber).map(String::as_str), Some("24-0004"));
        assert!(values.missing.contains(&CaseField::Date));
        assert_eq!(values.missing.len(), 4);
    }

    #[test]
    fn stray_short_paragraph_does_not_shift_pairs() {
        let doc = page(
            Some("January 1 - January 7, 2024"),
            &[
                facts_p("24-0010", "January 2, 2024", "10:00", "Alarm", "Gym"),
                notes_p("False alarm."),
                "<p><span>Tuesday</span></p>".to_string(),
                facts_p("24-0011", "January 2, 2024", "12:00", "Theft", "Library"),
                notes_p("Laptop taken."),
                facts_p("24-0012", "January 3, 2024", "11:00", "Lockout", "Dorm"),
                notes_p("Let in."),
            ],
        );

        let result = run(&doc);

        let numbers: Vec<_> = result.records.iter().map(|c| c.case_number.as_deref()).collect();
        assert_eq!(numbers, vec![Some("24-0010"), Some("24-0011"), Some("24-0012")]);
        assert_eq!(result.records[1].notes.as_deref(), Some("Laptop taken."));
        assert_eq!(result.records[2].notes.as_deref(), Some("Let in."));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn unidentifiable_case_is_skipped_without_shifting() {
        let doc = page(
            Some("January 1 - January 7, 2024"),
            &[
                facts_p("24-0040", "January 2, 2024", "10:00", "Alarm", "Gym"),
                notes_p("False alarm."),
                "<p><span>Case #:</span> <span></span> <span>Date:</span> <span></span></p>".to_string(),
                notes_p("Orphaned notes."),
                facts_p("24-0042", "January 3, 2024", "11:00", "Lockout", "Dorm"),
                notes_p("Let in."),
            ],
        );

        let result = run(&doc);

        let numbers: Vec<_> = result.records.iter().map(|c| c.case_number.as_deref()).collect();
        assert_eq!(numbers, vec![Some("24-0040"), Some("24-0042")]);
        assert_eq!(result.records[1].notes.as_deref(), Some("Let in."));
        assert_eq!(result.warnings.len(), 1);
        assert!(matches!(result.warnings[0], Warning::CaseSkipped { paragraph: 10, .. }));
    }

    #[test]
    fn void_reports_and_spacers_are_dropped() {
        let doc = page(
            Some("This week"),
            &[
                "<p><span>VOID REPORT</span> <span>24-0020</span></p>".to_string(),
                "<p>&nbsp;</p>".to_string(),
                facts_p("24-0021", "January 5, 2024", "23:10", "Welfare check", "Quad"),
                notes_p("Student fine."),
            ],
        );

        let result = run(&doc);

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].case_number.as_deref(), Some("24-0021"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn trailing_facts_without_notes_is_partial() {
        let doc = page(
            None,
            &[facts_p("24-0030", "January 6, 2024", "08:00", "Found property", "Commons")],
        );

        let result = run(&doc);

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].notes, None);
        assert_eq!(result.date_range, None);
        assert_eq!(
            result.warnings,
            vec![
                Warning::MissingDateRange,
                Warning::PartialCase {
                    partial: "24-0030 (Found property)".to_string(),
                    missing: vec!["notes"],
                },
            ]
        );
    }

    #[test]
    fn missing_main_content_is_fatal() {
        let doc = Html::parse_document("<html><body><p>Moved</p></body></html>");
        let sink = |_: u8| {};
        let mut progress = Progress::new(&sink);
        let err = extract(&doc, URL, &mut progress).unwrap_err();
        assert!(matches!(err, ScrapeError::Structure { what: "#mainContent", .. }));
    }

    #[test]
    fn blotter_fixture() {
        let doc = Html::parse_document(&fixture("blotter.html"));

        let result = run(&doc);

        assert_eq!(result.date_range.as_deref(), Some("Blotter for January 1 through January 7, 2024"));
        let numbers: Vec<_> = result
            .records
            .iter()
            .map(|c| c.case_number.clone().unwrap_or_default())
            .collect();
        assert_eq!(numbers, vec!["24-0101", "24-0102", "24-0104"]);
        assert_eq!(result.records[1].location.as_deref(), Some("Eliot Hall"));
        assert_eq!(
            result.records[1].date,
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(2, 15, 0)
        );
        assert!(result.records[2].notes.as_deref().unwrap().starts_with("Officers responded"));
    }
}
