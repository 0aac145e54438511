use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::Warning;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    #[serde(with = "timestamp")]
    pub date: NaiveDateTime,
    pub time: String,
    pub location: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_number: Option<String>,
    #[serde(with = "timestamp::option")]
    pub date: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Records that the readable report can group under a date heading.
pub trait Dated {
    fn day(&self) -> Option<NaiveDate>;
}

impl Dated for Event {
    fn day(&self) -> Option<NaiveDate> {
        Some(self.date.date())
    }
}

impl Dated for Case {
    fn day(&self) -> Option<NaiveDate> {
        self.date.map(|d| d.date())
    }
}

#[derive(Debug)]
pub struct ScrapeResult<R> {
    pub records: Vec<R>,
    /// Only the blotter carries one.
    pub date_range: Option<String>,
    pub warnings: Vec<Warning>,
}

/// Timestamps are written as "YYYY-MM-DD HH:MM".
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        use super::FORMAT;

        pub fn serialize<S: Serializer>(
            ts: &Option<NaiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_str(&ts.format(FORMAT).to_string()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| NaiveDateTime::parse_from_str(&raw, FORMAT))
                .transpose()
                .map_err(serde::de::Error::custom)
        }
    }
}
