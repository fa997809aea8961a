use crate::{
    core::{readings::Readings, series::Series},
    quantity::energy::KilowattHours,
};

/// Data eventually obtained for a request.
#[derive(Clone, Debug)]
pub enum Payload {
    Series(Series),
    Readings(Readings),
}

impl Payload {
    #[must_use]
    pub fn total(&self) -> KilowattHours {
        match self {
            Self::Series(series) => series.sum(),
            Self::Readings(readings) => readings.total(),
        }
    }
}
