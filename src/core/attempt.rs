use std::fmt::{Display, Formatter};

use bon::Builder;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::core::direction::Direction;

/// How a portal call was meant to resolve the series.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Single request over the whole range.
    Bulk,

    /// One request per calendar day.
    PerDay,

    /// Cumulative register readings.
    Readings,

    /// Session handshake, not a data call.
    None,
}

/// Diagnostic record of one HTTP exchange with the portal.
#[must_use]
#[derive(Clone, Debug, Builder, Serialize)]
pub struct FetchAttempt {
    #[builder(into)]
    pub endpoint: String,

    /// Absent when the request did not produce any response.
    pub status: Option<u16>,

    pub strategy: Strategy,

    #[builder(default)]
    pub bytes: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<NaiveDate>,
}

impl FetchAttempt {
    /// Whether the portal accepted the call: any non-error status for the handshake,
    /// only `200` for data calls.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_some_and(|status| match self.strategy {
            Strategy::None => (200..400).contains(&status),
            Strategy::Bulk | Strategy::PerDay | Strategy::Readings => status == 200,
        })
    }
}

/// Every exchange made while serving one request, in order.
#[must_use]
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Attempts(Vec<FetchAttempt>);

impl Attempts {
    pub fn push(&mut self, attempt: FetchAttempt) {
        self.0.push(attempt);
    }

    pub fn iter(&self) -> impl Iterator<Item = &FetchAttempt> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How the returned data was eventually obtained.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// Bulk request over the whole range.
    Range,

    /// Merged per-day requests.
    PerDay,

    /// Register readings fallback.
    Readings,

    /// Series netted against the opposite direction.
    Balanced(Direction),
}

impl Display for Resolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Range => f.write_str("range"),
            Self::PerDay => f.write_str("per-day"),
            Self::Readings => f.write_str("readings"),
            Self::Balanced(direction) => write!(f, "{direction}_balanced"),
        }
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
