use std::fmt::{Debug, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, de};

use crate::{
    core::{
        date_range::DateRange,
        direction::Direction,
        failure::Failure,
        period::{Period, PeriodHints},
    },
    prelude::*,
};

/// Request parameters as received from the caller, nothing validated yet.
#[derive(Clone, Default, Deserialize, clap::Args)]
pub struct RawRequest {
    /// Portal login.
    #[clap(long, env = "ELICZNIK_LOGIN")]
    pub login: Option<String>,

    /// Portal password.
    #[clap(long, env = "ELICZNIK_PASSWORD", hide_env_values = true)]
    #[serde(alias = "pass")]
    pub password: Option<String>,

    /// Metering point identifier.
    #[clap(long, env = "ELICZNIK_METER")]
    pub meter: Option<String>,

    /// `consumption` (default) or `generation`.
    #[clap(long)]
    pub direction: Option<String>,

    /// Net the series against the opposite direction.
    #[clap(long)]
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub balanced: bool,

    /// `range` (default), `monthly`, `yearly`, or `last_12_months`.
    #[clap(long)]
    pub period: Option<String>,

    /// `YYYY-MM` for the monthly period.
    #[clap(long)]
    pub month: Option<String>,

    /// `YYYY` for the yearly period.
    #[clap(long)]
    pub year: Option<String>,

    /// Range start, `YYYY-MM-DD` or `DD.MM.YYYY`.
    #[clap(long)]
    pub from: Option<String>,

    /// Range end (inclusive), `YYYY-MM-DD` or `DD.MM.YYYY`.
    #[clap(long)]
    pub to: Option<String>,

    /// Only return the total.
    #[clap(long)]
    #[serde(default, alias = "total", deserialize_with = "deserialize_flag")]
    pub total_only: bool,

    /// Persist the result to the output directory.
    #[clap(long)]
    #[serde(default, alias = "persist", deserialize_with = "deserialize_flag")]
    pub save: bool,
}

/// Accepts `1`, `true`, `yes`, `on`, and a bare key as `true`.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let flag = String::deserialize(deserializer)?;
    match flag.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(de::Error::invalid_value(de::Unexpected::Str(&flag), &"a boolean flag")),
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Validated request.
#[derive(Clone, Debug)]
pub struct Request {
    pub credentials: Credentials,
    pub meter: String,
    pub direction: Direction,
    pub balanced: bool,
    pub period: Period,
    pub range: DateRange,
    pub total_only: bool,
    pub save: bool,
}

impl Request {
    /// Validate the raw parameters and resolve the period against `today`.
    pub fn validate(raw: &RawRequest, today: NaiveDate) -> Result<Self, Failure> {
        Self::try_validate(raw, today).map_err(Failure::InvalidInput)
    }

    fn try_validate(raw: &RawRequest, today: NaiveDate) -> Result<Self> {
        let login = required(raw.login.as_deref(), "login")?;
        let password = required(raw.password.as_deref(), "password")?;
        let meter = required(raw.meter.as_deref(), "meter")?;
        let direction = match non_empty(raw.direction.as_deref()) {
            Some(direction) => Direction::parse(direction)?,
            None => Direction::default(),
        };
        let period = match non_empty(raw.period.as_deref()) {
            Some(period) => Period::parse(period)?,
            None => Period::default(),
        };
        let hints = PeriodHints {
            month: raw.month.as_deref(),
            year: raw.year.as_deref(),
            from: raw.from.as_deref(),
            to: raw.to.as_deref(),
        };
        let range = period.resolve(hints, today)?;
        Ok(Self {
            credentials: Credentials {
                login: login.trim().to_string(),
                password: password.to_string(),
            },
            meter: meter.trim().to_string(),
            direction,
            balanced: raw.balanced,
            period,
            range,
            total_only: raw.total_only,
            save: raw.save,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    non_empty(value).with_context(|| format!("`{name}` is required"))
}
