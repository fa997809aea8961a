use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::prelude::*;

/// Energy flow direction as seen from the meter.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Drawn from the grid.
    #[default]
    Consumption,

    /// Sent to the grid from on-site production.
    Generation,
}

impl Direction {
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim() {
            "consumption" => Ok(Self::Consumption),
            "generation" => Ok(Self::Generation),
            other => bail!("unknown direction `{other}`, expected `consumption` or `generation`"),
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Consumption => Self::Generation,
            Self::Generation => Self::Consumption,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consumption => "consumption",
            Self::Generation => "generation",
        }
    }

    /// Numeric chart type on the portal's secondary data endpoint.
    #[must_use]
    pub const fn portal_code(self) -> u8 {
        match self {
            Self::Consumption => 1,
            Self::Generation => 2,
        }
    }

    /// Energy type tag on the portal's primary data endpoint.
    #[must_use]
    pub const fn portal_tag(self) -> &'static str {
        match self {
            Self::Consumption => "consum",
            Self::Generation => "oze",
        }
    }

    /// Register type tag on the portal's readings endpoint.
    #[must_use]
    pub const fn readings_tag(self) -> &'static str {
        match self {
            Self::Consumption => "energia-pobrana",
            Self::Generation => "energia-oddana",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
