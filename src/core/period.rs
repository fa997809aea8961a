use chrono::{Datelike, Months, NaiveDate, Utc};
use chrono_tz::Europe::Warsaw;
use serde::Serialize;

use crate::{
    core::date_range::{DateRange, parse_date},
    prelude::*,
};

/// Logical period descriptor.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Range,
    Monthly,
    Yearly,

    #[serde(rename = "last_12_months")]
    Last12Months,
}

/// Period-specific refinements as supplied by the caller.
#[derive(Copy, Clone, Debug, Default)]
pub struct PeriodHints<'a> {
    /// `YYYY-MM`, only used for [`Period::Monthly`].
    pub month: Option<&'a str>,

    /// `YYYY`, only used for [`Period::Yearly`].
    pub year: Option<&'a str>,

    /// Only used for [`Period::Range`].
    pub from: Option<&'a str>,

    /// Only used for [`Period::Range`].
    pub to: Option<&'a str>,
}

impl Period {
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim() {
            "range" => Ok(Self::Range),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "last_12_months" => Ok(Self::Last12Months),
            other => bail!("unknown period `{other}`"),
        }
    }

    pub fn resolve(self, hints: PeriodHints<'_>, today: NaiveDate) -> Result<DateRange> {
        match self {
            Self::Range => {
                let from = hints.from.filter(|from| !from.trim().is_empty());
                let to = hints.to.filter(|to| !to.trim().is_empty());
                let from = from.context("`from` is required for the range period")?;
                let to = to.context("`to` is required for the range period")?;
                DateRange::try_new(parse_date(from)?, parse_date(to)?)
            }
            Self::Monthly => {
                let first_day =
                    hints.month.and_then(parse_month).unwrap_or_else(|| first_day_of_month(today));
                DateRange::try_new(first_day, last_day_of_month(first_day)?)
            }
            Self::Yearly => {
                let year = hints.year.and_then(parse_year).unwrap_or_else(|| today.year());
                DateRange::try_new(
                    NaiveDate::from_ymd_opt(year, 1, 1).context("invalid year")?,
                    NaiveDate::from_ymd_opt(year, 12, 31).context("invalid year")?,
                )
            }
            Self::Last12Months => {
                let this_month = first_day_of_month(today);
                let start = this_month
                    .checked_sub_months(Months::new(11))
                    .context("the window starts before the calendar does")?;
                DateRange::try_new(start, last_day_of_month(this_month)?)
            }
        }
    }
}

/// Today's date in the portal's home timezone.
#[must_use]
pub fn portal_today() -> NaiveDate {
    Utc::now().with_timezone(&Warsaw).date_naive()
}

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_day_of_month(first_day: NaiveDate) -> Result<NaiveDate> {
    first_day
        .checked_add_months(Months::new(1))
        .and_then(|next_month| next_month.pred_opt())
        .with_context(|| format!("no month end for `{first_day}`"))
}

/// Parse a well-formed `YYYY-MM` into the first day of that month.
fn parse_month(text: &str) -> Option<NaiveDate> {
    let (year, month) = text.trim().split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(parse_year(year)?, month.parse().ok()?, 1)
}

/// Parse a well-formed `YYYY`.
fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    if text.len() == 4 && text.bytes().all(|byte| byte.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}
