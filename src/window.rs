use chrono::{Days, NaiveDate, NaiveDateTime};

/// Anything that can be compared against a window at day granularity.
pub trait DayLike {
    fn day(&self) -> NaiveDate;
}

impl DayLike for NaiveDate {
    fn day(&self) -> NaiveDate {
        *self
    }
}

impl DayLike for NaiveDateTime {
    fn day(&self) -> NaiveDate {
        self.date()
    }
}

/// Inclusive date range `[start, start + span_days]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    span_days: u32,
    cutoff: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, span_days: u32) -> Self {
        // Saturates at NaiveDate::MAX.
        let cutoff = start
            .checked_add_days(Days::new(span_days as u64))
            .unwrap_or(NaiveDate::MAX);
        DateWindow {
            start,
            span_days,
            cutoff,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn span_days(&self) -> u32 {
        self.span_days
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    pub fn in_window<D: DayLike>(&self, d: &D) -> bool {
        let day = d.day();
        self.start <= day && day <= self.cutoff
    }

    pub fn before_window<D: DayLike>(&self, d: &D) -> bool {
        d.day() < self.start
    }

    pub fn past_window<D: DayLike>(&self, d: &D) -> bool {
        d.day() > self.cutoff
    }
}
