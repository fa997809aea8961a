use std::time::Duration;

use reqwest::RequestBuilder;
use serde::Serialize;
use tokio::time::sleep;

use crate::{
    api::portal::{
        Call,
        Portal,
        response::{EnergyResponse, ReadingsResponse},
    },
    core::{
        attempt::{Attempts, Resolution, Strategy},
        date_range::{DateRange, to_portal},
        direction::Direction,
        payload::Payload,
        readings::Readings,
        series::Series,
    },
    prelude::*,
};

/// Portal endpoint serving hourly energy.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Source {
    /// `/energia/api`
    Energy,

    /// `/energia/do/dane`, the chart backend.
    ChartData,
}

impl Source {
    const ALL: [Self; 2] = [Self::Energy, Self::ChartData];
}

#[must_use]
#[derive(Debug)]
pub struct Fetched {
    pub resolution: Resolution,
    pub payload: Payload,
}

/// Retrieves series through a logged-in portal with the meter already selected.
pub struct Fetcher<'a> {
    portal: &'a Portal,
    meter: &'a str,

    /// Pause between consecutive per-day requests.
    throttle: Duration,
}

impl<'a> Fetcher<'a> {
    pub const fn new(portal: &'a Portal, meter: &'a str, throttle: Duration) -> Self {
        Self { portal, meter, throttle }
    }

    /// Fetch the series, falling back to the register readings when `allow_readings`.
    pub async fn fetch(
        &self,
        range: DateRange,
        direction: Direction,
        allow_readings: bool,
        attempts: &mut Attempts,
    ) -> Result<Fetched> {
        let error = match self.fetch_series(range, direction, attempts).await {
            Ok((series, resolution)) => {
                return Ok(Fetched { resolution, payload: Payload::Series(series) });
            }
            Err(error) => error,
        };
        if !allow_readings {
            return Err(error);
        }
        match self.fetch_readings(range, direction, attempts).await {
            Ok(readings) => Ok(Fetched {
                resolution: Resolution::Readings,
                payload: Payload::Readings(readings),
            }),
            Err(readings_error) => Err(error.context(format!("{readings_error:#}"))),
        }
    }

    /// Bulk request on every source, then per-day requests on every source.
    #[instrument(skip_all, fields(direction = %direction, range = ?range))]
    pub async fn fetch_series(
        &self,
        range: DateRange,
        direction: Direction,
        attempts: &mut Attempts,
    ) -> Result<(Series, Resolution)> {
        for source in Source::ALL {
            let call = Call::data(Strategy::Bulk, direction);
            match self.fetch_energy(source, range, direction, call, attempts).await {
                Ok(series) => {
                    if series.is_empty() {
                        warn!(?source, "the portal returned no points");
                    }
                    info!(?source, n_points = series.len(), "fetched the whole range");
                    return Ok((series, Resolution::Range));
                }
                Err(error) => warn!(?source, "bulk request failed: {error:#}"),
            }
        }
        for source in Source::ALL {
            if let Some(series) = self.fetch_per_day(source, range, direction, attempts).await {
                return Ok((series, Resolution::PerDay));
            }
        }
        bail!("no {direction} data from {} to {}", range.start(), range.end())
    }

    /// Fold the successful days into one series, `None` when no day succeeded.
    async fn fetch_per_day(
        &self,
        source: Source,
        range: DateRange,
        direction: Direction,
        attempts: &mut Attempts,
    ) -> Option<Series> {
        info!(?source, n_days = range.n_days(), "fetching day by day…");
        let mut accumulator = Series::default();
        let mut n_succeeded = 0_u64;
        for (index, day) in range.days().enumerate() {
            if index != 0 {
                sleep(self.throttle).await;
            }
            let call = Call::data(Strategy::PerDay, direction).on(day);
            match self.fetch_energy(source, DateRange::day(day), direction, call, attempts).await {
                Ok(series) => {
                    accumulator = accumulator.merge(series);
                    n_succeeded += 1;
                }
                Err(error) => debug!(%day, "day failed: {error:#}"),
            }
        }
        info!(?source, n_succeeded, n_points = accumulator.len(), "done");
        (n_succeeded != 0).then_some(accumulator)
    }

    async fn fetch_energy(
        &self,
        source: Source,
        range: DateRange,
        direction: Direction,
        call: Call,
        attempts: &mut Attempts,
    ) -> Result<Series> {
        let request = self.energy_request(source, range, direction)?;
        let exchange = self.portal.call(request, call, attempts).await?.ensure_ok()?;
        EnergyResponse::parse(&exchange.body)?
            .into_series()
            .context("the portal did not report success")
    }

    fn energy_request(
        &self,
        source: Source,
        range: DateRange,
        direction: Direction,
    ) -> Result<RequestBuilder> {
        #[derive(Serialize)]
        struct EnergyForm {
            from: String,
            to: String,
            profile: &'static str,

            #[serde(rename = "type")]
            tag: &'static str,
        }

        #[derive(Serialize)]
        struct ChartDataForm<'a> {
            #[serde(rename = "dane[chartFromDate]")]
            from: String,

            #[serde(rename = "dane[chartToDate]")]
            to: String,

            #[serde(rename = "dane[paramType]")]
            param_type: &'static str,

            #[serde(rename = "dane[smartNr]")]
            meter: &'a str,

            #[serde(rename = "dane[chartType]")]
            chart_type: u8,

            #[serde(rename = "dane[checkOZE]")]
            check_oze: &'static str,
        }

        let from = to_portal(range.start());
        let to = to_portal(range.end());
        let endpoints = &self.portal.endpoints;
        let request = match source {
            Source::Energy => {
                let form =
                    EnergyForm { from, to, profile: "full time", tag: direction.portal_tag() };
                self.portal.client.post(endpoints.energy()?).form(&form)
            }
            Source::ChartData => {
                let form = ChartDataForm {
                    from,
                    to,
                    param_type: "day",
                    meter: self.meter,
                    chart_type: direction.portal_code(),
                    check_oze: "on",
                };
                self.portal.client.post(endpoints.chart_data()?).form(&form)
            }
        };
        Ok(request)
    }

    #[instrument(skip_all, fields(direction = %direction, range = ?range))]
    async fn fetch_readings(
        &self,
        range: DateRange,
        direction: Direction,
        attempts: &mut Attempts,
    ) -> Result<Readings> {
        #[derive(Serialize)]
        struct ReadingsForm {
            from: String,
            to: String,

            #[serde(rename = "type")]
            tag: &'static str,
        }

        info!("falling back to the readings…");
        let form = ReadingsForm {
            from: to_portal(range.start()),
            to: to_portal(range.end()),
            tag: direction.readings_tag(),
        };
        let request = self.portal.client.post(self.portal.endpoints.readings()?).form(&form);
        let call = Call::data(Strategy::Readings, direction);
        let exchange = self.portal.call(request, call, attempts).await?.ensure_ok()?;
        let readings = ReadingsResponse::parse(&exchange.body)?
            .into_readings()
            .context("the portal did not report success")?;
        ensure!(!readings.is_empty(), "the portal returned no readings");
        info!(n_readings = readings.len(), total = ?readings.total(), "fetched the readings");
        Ok(readings)
    }
}
