use config::Config;
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_EVENTS_URL: &str = "https://events.reed.edu/calendar";
const DEFAULT_BLOTTER_URL: &str =
    "https://www.reed.edu/community_safety/blotters/the-blotter.html";
const DEFAULT_USER_AGENT: &str = concat!("quest_scraper/", env!("CARGO_PKG_VERSION"));

/// Endpoint and transport settings.
///
/// Layered as defaults, then `quest_scraper.toml` in the working directory
/// (optional), then `QUEST_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub events_url: String,
    pub blotter_url: String,
    pub timeout_secs: u64,
    pub max_pages: usize,
    pub user_agent: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_sources(
            config::File::with_name("quest_scraper").required(false),
            config::Environment::with_prefix("QUEST").try_parsing(true),
        )
    }

    fn from_sources<S>(file: S, env: config::Environment) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .set_default("events_url", DEFAULT_EVENTS_URL)?
            .set_default("blotter_url", DEFAULT_BLOTTER_URL)?
            .set_default("timeout_secs", 15_i64)?
            .set_default("max_pages", 25_i64)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .add_source(file)
            .add_source(env)
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            events_url: DEFAULT_EVENTS_URL.to_string(),
            blotter_url: DEFAULT_BLOTTER_URL.to_string(),
            timeout_secs: 15,
            max_pages: 25,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
