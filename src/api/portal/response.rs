//! Typed view of the portal's JSON responses.
//!
//! The portal is inconsistent about value types: energy comes as numbers or numeric strings,
//! zones as strings or integers, and empty maps come as empty arrays. Everything is normalised
//! here, before it reaches the series model.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use serde_with::{DefaultOnError, DisplayFromStr, PickFirst, serde_as};

use crate::{
    core::{
        readings::{Reading, Readings},
        series::{Hour, Series, SeriesPoint},
    },
    prelude::*,
    quantity::energy::KilowattHours,
};

/// String or number, as the portal sees fit.
#[derive(Deserialize)]
#[serde(untagged)]
enum Label {
    Text(String),
    Number(serde_json::Number),
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => Display::fmt(number, f),
        }
    }
}

#[serde_as]
#[derive(Deserialize)]
pub struct EnergyResponse {
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    success: bool,

    data: Option<EnergyData>,
}

#[serde_as]
#[derive(Deserialize)]
struct EnergyData {
    #[serde(rename = "allData", default)]
    #[serde_as(as = "DefaultOnError")]
    rows: Vec<Value>,

    #[serde(rename = "zonesName", default)]
    #[serde_as(as = "DefaultOnError")]
    zone_names: BTreeMap<String, String>,

    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    tariff: Option<String>,
}

#[serde_as]
#[derive(Deserialize)]
struct EnergyRow {
    #[serde(rename = "EC")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    value: f64,

    #[serde(rename = "Date")]
    date: NaiveDate,

    /// One-based hour label, `1` is the hour starting at midnight.
    #[serde(rename = "Hour")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    hour: u8,

    #[serde(rename = "Zone")]
    zone: Option<Label>,

    #[serde(rename = "ZoneName")]
    zone_name: Option<String>,

    #[serde(rename = "Tariff")]
    tariff: Option<String>,
}

impl EnergyRow {
    fn parse(row: &Value) -> Result<SeriesPoint> {
        Self::deserialize(row)?.into_point()
    }

    fn into_point(self) -> Result<SeriesPoint> {
        ensure!(self.value.is_finite(), "non-finite value");
        let hour = self.hour.checked_sub(1).context("hour label `0` is out of range")?;
        Ok(SeriesPoint {
            date: self.date,
            hour: Hour::try_from(hour)?,
            value: KilowattHours(self.value),
            zone: self
                .zone
                .map_or_else(|| SeriesPoint::DEFAULT_ZONE.to_string(), |zone| zone.to_string()),
            zone_name: self
                .zone_name
                .unwrap_or_else(|| SeriesPoint::DEFAULT_ZONE_NAME.to_string()),
            tariff: self.tariff.unwrap_or_else(|| SeriesPoint::DEFAULT_TARIFF.to_string()),
        })
    }
}

impl EnergyResponse {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).context("failed to deserialize the energy response")
    }

    /// Convert into a series, or `None` when the portal did not report success.
    pub fn into_series(self) -> Option<Series> {
        let data = self.data.filter(|_| self.success)?;
        let series = data
            .rows
            .into_iter()
            .filter_map(|row| match EnergyRow::parse(&row) {
                Ok(point) => Some(point),
                Err(error) => {
                    warn!(%row, "dropping the row: {error:#}");
                    None
                }
            })
            .collect::<Series>()
            .with_metadata(data.tariff, data.zone_names);
        Some(series)
    }
}

#[serde_as]
#[derive(Deserialize)]
pub struct ReadingsResponse {
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    success: bool,

    data: Option<Vec<Value>>,
}

#[serde_as]
#[derive(Deserialize)]
struct ReadingRow {
    #[serde(rename = "Date")]
    date: NaiveDate,

    #[serde(rename = "C", alias = "EC", alias = "Value")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    value: f64,

    #[serde(rename = "Zone")]
    zone: Option<Label>,
}

impl ReadingsResponse {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).context("failed to deserialize the readings response")
    }

    /// Convert into readings, or `None` when the portal did not report success.
    pub fn into_readings(self) -> Option<Readings> {
        let rows = self.data.filter(|_| self.success)?;
        let readings = rows
            .into_iter()
            .filter_map(|row| match ReadingRow::deserialize(&row) {
                Ok(reading) if reading.value.is_finite() => Some(Reading {
                    date: reading.date,
                    value: KilowattHours(reading.value),
                    zone: reading.zone.map(|zone| zone.to_string()),
                }),
                Ok(_) => {
                    warn!(%row, "dropping the non-finite reading");
                    None
                }
                Err(error) => {
                    warn!(%row, "dropping the reading: {error:#}");
                    None
                }
            })
            .collect();
        Some(Readings(readings))
    }
}
