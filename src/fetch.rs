use std::time::Duration;

use scraper::Html;
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::settings::Settings;

/// Retrieves a URL and hands back the parsed document.
///
/// `Sync` so detail pages can be fetched from worker threads.
pub trait DocumentFetcher: Sync {
    fn fetch_page(&self, url: &str) -> Result<Html>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(settings.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(HttpFetcher { client, timeout })
    }
}

impl DocumentFetcher for HttpFetcher {
    fn fetch_page(&self, url: &str) -> Result<Html> {
        debug!("GET {}", url);
        let fail = |reason: String| ScrapeError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                fail(format!("timed out after {}s", self.timeout.as_secs()))
            } else {
                fail(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status)));
        }

        let body = response.text().map_err(|e| fail(e.to_string()))?;
        debug!("{} returned {} bytes", url, body.len());
        Ok(Html::parse_document(&body))
    }
}
