use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use serde::Serialize;
use serde_with::serde_as;

use crate::{prelude::*, quantity::energy::KilowattHours};

/// Hour of day, `0..=23`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Hour(u8);

impl TryFrom<u8> for Hour {
    type Error = Error;

    fn try_from(hour: u8) -> Result<Self> {
        ensure!(hour < 24, "hour `{hour}` is out of range");
        Ok(Self(hour))
    }
}

impl Display for Hour {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Unique key of a point within one series.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SeriesKey {
    pub date: NaiveDate,
    pub hour: Hour,
}

impl Display for SeriesKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.date, self.hour)
    }
}

#[must_use]
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,

    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub hour: Hour,

    pub value: KilowattHours,
    pub zone: String,
    pub zone_name: String,
    pub tariff: String,
}

impl SeriesPoint {
    pub const DEFAULT_ZONE: &'static str = "1";
    pub const DEFAULT_ZONE_NAME: &'static str = "Cała doba";
    pub const DEFAULT_TARIFF: &'static str = "G11";

    pub const fn key(&self) -> SeriesKey {
        SeriesKey { date: self.date, hour: self.hour }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_bounds() {
        assert!(Hour::try_from(0).is_ok());
        assert!(Hour::try_from(23).is_ok());
        assert!(Hour::try_from(24).is_err());
    }

    #[test]
    fn hour_is_zero_padded() -> Result {
        assert_eq!(Hour::try_from(7)?.to_string(), "07");
        assert_eq!(Hour::try_from(19)?.to_string(), "19");
        Ok(())
    }
}
