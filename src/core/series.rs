mod balance;
mod point;

use std::collections::BTreeMap;

use serde::{Serialize, Serializer, ser::SerializeStruct};

pub use self::{
    balance::balance,
    point::{Hour, SeriesKey, SeriesPoint},
};
use crate::quantity::energy::KilowattHours;

/// Hourly series of one direction, ordered by `(date, hour)`.
///
/// The total and per-zone sums are always derived from the points, so they stay consistent
/// after duplicate hours overwrite each other.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    points: BTreeMap<SeriesKey, SeriesPoint>,
    tariff: Option<String>,
    zone_names: BTreeMap<String, String>,
}

impl Series {
    pub fn with_metadata(
        mut self,
        tariff: Option<String>,
        zone_names: BTreeMap<String, String>,
    ) -> Self {
        self.tariff = tariff;
        self.zone_names = zone_names;
        self
    }

    /// Insert the point, replacing and returning the one with the same key.
    pub fn insert(&mut self, point: SeriesPoint) -> Option<SeriesPoint> {
        self.points.insert(point.key(), point)
    }

    #[must_use]
    pub fn get(&self, key: &SeriesKey) -> Option<&SeriesPoint> {
        self.points.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.points.keys()
    }

    pub fn points(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn sum(&self) -> KilowattHours {
        self.points().map(|point| point.value).sum()
    }

    #[must_use]
    pub fn zones(&self) -> BTreeMap<&str, KilowattHours> {
        let mut zones = BTreeMap::new();
        for point in self.points() {
            *zones.entry(point.zone.as_str()).or_insert(KilowattHours::ZERO) += point.value;
        }
        zones
    }

    #[must_use]
    pub fn tariff(&self) -> Option<&str> {
        self.tariff.as_deref()
    }

    #[must_use]
    pub const fn zone_names(&self) -> &BTreeMap<String, String> {
        &self.zone_names
    }

    /// Fill in the metadata that is still missing from `other`.
    pub fn adopt_metadata(&mut self, other: &Self) {
        if self.tariff.is_none() {
            self.tariff.clone_from(&other.tariff);
        }
        if self.zone_names.is_empty() {
            self.zone_names.clone_from(&other.zone_names);
        }
    }

    /// Fold `other` into the accumulator: points are unioned with later keys winning,
    /// metadata is kept from whichever series provided it first.
    pub fn merge(mut self, other: Self) -> Self {
        self.adopt_metadata(&other);
        self.points.extend(other.points);
        self
    }
}

impl FromIterator<SeriesPoint> for Series {
    fn from_iter<T: IntoIterator<Item = SeriesPoint>>(iter: T) -> Self {
        let mut series = Self::default();
        for point in iter {
            series.insert(point);
        }
        series
    }
}

impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Series", 5)?;
        state.serialize_field("sum", &self.sum())?;
        state.serialize_field("zones", &self.zones())?;
        state.serialize_field("zone_names", &self.zone_names)?;
        state.serialize_field("tariff", &self.tariff)?;
        state.serialize_field("points", &self.points.values().collect::<Vec<_>>())?;
        state.end()
    }
}
