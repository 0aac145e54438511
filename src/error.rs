use std::fmt;
use std::path::PathBuf;

use tracing::warn;

/// Failures that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("unexpected page layout at {url}: {what} not found")]
    Structure { url: String, what: &'static str },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Non-fatal conditions collected during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    PaginationLinkMissing { page: String },
    PageLimitReached { limit: usize },
    PageRevisited { url: String },
    UnparsedHeader { page: String, text: String },
    CardSkipped { page: String, reason: String },
    UndatedCard { title: String },
    MissingDescription { title: String, url: String },
    DetailFetchFailed { title: String, url: String, reason: String },
    MissingDateRange,
    CaseSkipped { paragraph: usize, reason: String },
    PartialCase { partial: String, missing: Vec<&'static str> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::PaginationLinkMissing { page } => write!(
                f,
                "pagination link missing on {}, results may be incomplete",
                page
            ),
            Warning::PageLimitReached { limit } => write!(
                f,
                "stopped after {} listing pages, results may be incomplete",
                limit
            ),
            Warning::PageRevisited { url } => write!(
                f,
                "next page {} was already visited, results may be incomplete",
                url
            ),
            Warning::UnparsedHeader { page, text } => {
                write!(f, "skipped group with unreadable date {:?} on {}", text, page)
            }
            Warning::CardSkipped { page, reason } => {
                write!(f, "skipped card on {}: {}", page, reason)
            }
            Warning::UndatedCard { title } => write!(
                f,
                "event '{}' has no readable date, using its group date",
                title
            ),
            Warning::MissingDescription { title, url } => {
                write!(f, "event '{}' page {} has no description", title, url)
            }
            Warning::DetailFetchFailed { title, url, reason } => write!(
                f,
                "could not fetch details for '{}' ({}): {}",
                title, url, reason
            ),
            Warning::MissingDateRange => write!(f, "blotter has no date range label"),
            Warning::CaseSkipped { paragraph, reason } => {
                write!(f, "skipped case at paragraph {}: {}", paragraph, reason)
            }
            Warning::PartialCase { partial, missing } => write!(
                f,
                "case {} is missing {}",
                partial,
                missing.join(", ")
            ),
        }
    }
}

/// Ordered warning sink; every entry is also logged.
#[derive(Debug, Default)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.items.push(warning);
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}
