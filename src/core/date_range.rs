use std::fmt::{Debug, Formatter};

use chrono::NaiveDate;
use serde::Serialize;

use crate::prelude::*;

/// ISO date format, used everywhere outside the portal.
pub const ISO_FORMAT: &str = "%Y-%m-%d";

/// Portal-native date format.
pub const PORTAL_FORMAT: &str = "%d.%m.%Y";

/// Parse either an ISO or a portal-native date.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, ISO_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(text, PORTAL_FORMAT))
        .with_context(|| format!("`{text}` is neither `YYYY-MM-DD` nor `DD.MM.YYYY`"))
}

#[must_use]
pub fn to_portal(date: NaiveDate) -> String {
    date.format(PORTAL_FORMAT).to_string()
}

#[must_use]
pub fn to_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Inclusive calendar date range.
#[must_use]
#[derive(Copy, Clone, Eq, PartialEq, Serialize)]
pub struct DateRange {
    #[serde(rename = "from")]
    start: NaiveDate,

    #[serde(rename = "to")]
    end: NaiveDate,
}

impl Debug for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

impl DateRange {
    pub fn try_new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        ensure!(start <= end, "`{start}` is after `{end}`");
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> NaiveDate {
        self.end
    }

    /// Every calendar day in the range, both ends included.
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take_while(move |day| *day <= self.end)
    }

    #[must_use]
    pub fn n_days(self) -> u64 {
        (self.end - self.start).num_days().unsigned_abs() + 1
    }

    /// Single-day range.
    pub const fn day(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }
}
