use std::collections::BTreeSet;

use crate::{
    core::series::{Series, SeriesPoint},
    quantity::energy::KilowattHours,
};

/// Net `primary` against `other` hour by hour: `max(primary − other, 0)`.
///
/// Keys are the union of both series; a side missing a key counts as zero. Balancing
/// consumption against generation gives the grid import left after self-consumption,
/// and the other way round gives the export.
pub fn balance(primary: &Series, other: &Series) -> Series {
    let keys: BTreeSet<_> = primary.keys().chain(other.keys()).copied().collect();

    let mut balanced = Series::default();
    balanced.adopt_metadata(primary);
    balanced.adopt_metadata(other);

    for key in keys {
        let primary_point = primary.get(&key);
        let other_point = other.get(&key);
        let Some(template) = primary_point.or(other_point) else {
            continue;
        };
        let primary_value = primary_point.map_or(KilowattHours::ZERO, |point| point.value);
        let other_value = other_point.map_or(KilowattHours::ZERO, |point| point.value);
        balanced.insert(SeriesPoint {
            value: primary_value.saturating_sub(other_value),
            ..template.clone()
        });
    }

    balanced
}
