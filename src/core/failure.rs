use http::StatusCode;
use serde::Serialize;

use crate::prelude::*;

/// Pipeline stage a failure is attributed to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Inputs,
    Login,
    SelectMeter,
    Fetch,
    Encode,
}

/// Terminal failure of a request.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    /// Caller-fixable, never retried.
    #[error("invalid input: {0:#}")]
    InvalidInput(Error),

    #[error("authentication failed: {0:#}")]
    Authentication(Error),

    #[error("meter selection failed: {0:#}")]
    MeterSelection(Error),

    #[error("no data: {0:#}")]
    UpstreamFetch(Error),

    #[error("failed to encode the result: {0:#}")]
    Encoding(Error),
}

impl Failure {
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::InvalidInput(_) => Stage::Inputs,
            Self::Authentication(_) => Stage::Login,
            Self::MeterSelection(_) => Stage::SelectMeter,
            Self::UpstreamFetch(_) => Stage::Fetch,
            Self::Encoding(_) => Stage::Encode,
        }
    }

    /// Status class to report to the caller.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) | Self::MeterSelection(_) | Self::UpstreamFetch(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
