use chrono::NaiveDate;
use serde::Serialize;

use crate::quantity::energy::KilowattHours;

/// Cumulative meter-register reading.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reading {
    pub date: NaiveDate,
    pub value: KilowattHours,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// Register readings in the order the portal returned them.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Readings(pub Vec<Reading>);

impl Readings {
    /// Energy passed through the register between the first and the last reading.
    #[must_use]
    pub fn total(&self) -> KilowattHours {
        match (self.0.first(), self.0.last()) {
            (Some(first), Some(last)) => last.value - first.value,
            _ => KilowattHours::ZERO,
        }
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

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn reading(day: u32, value: f64) -> Reading {
        Reading {
            date: NaiveDate::from_ymd_opt(2025, 8, day).unwrap(),
            value: KilowattHours(value),
            zone: None,
        }
    }

    #[test]
    fn total_is_last_minus_first() {
        let readings =
            Readings(vec![reading(10, 1200.5), reading(11, 1210.0), reading(12, 1225.25)]);
        assert_abs_diff_eq!(readings.total().0, 24.75, epsilon = 1e-9);
    }

    #[test]
    fn total_of_short_series_is_zero() {
        assert_eq!(Readings::default().total(), KilowattHours::ZERO);
        assert_eq!(Readings(vec![reading(10, 1200.5)]).total(), KilowattHours::ZERO);
    }
}
