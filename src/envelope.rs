//! JSON envelope returned to the caller, for both the CLI and the HTTP surface.

use std::{
    fs,
    path::{Path, PathBuf},
};

use http::StatusCode;
use serde::Serialize;

use crate::{
    core::{
        attempt::{Attempts, Resolution},
        date_range::{DateRange, to_iso},
        direction::Direction,
        failure::{Failure, Stage},
        payload::Payload,
        period::Period,
        readings::Readings,
        series::Series,
    },
    pipeline::{Outcome, Success},
    prelude::*,
    quantity::energy::KilowattHours,
};

#[must_use]
#[derive(Serialize)]
pub struct Envelope {
    pub ok: bool,

    /// Identity hash prefix, the login itself never leaves the process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    #[serde(flatten)]
    pub body: Body,

    pub attempts: Attempts,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum Body {
    Success(Box<Data>),
    Failure(Problem),
}

#[derive(Serialize)]
pub struct Data {
    pub resolution: Resolution,
    pub meter: String,
    pub direction: Direction,
    pub balanced: bool,
    pub period: Period,
    pub range: DateRange,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Series>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub readings: Option<Readings>,

    /// Always present for readings, otherwise only when the total is all that was asked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<KilowattHours>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,

    #[serde(skip)]
    save: bool,
}

#[derive(Serialize)]
pub struct Problem {
    #[serde(rename = "where")]
    pub stage: Stage,

    pub error: String,

    /// HTTP status class of the failure.
    pub status: u16,
}

impl From<&Failure> for Problem {
    fn from(failure: &Failure) -> Self {
        Self {
            stage: failure.stage(),
            error: failure.to_string(),
            status: failure.status().as_u16(),
        }
    }
}

impl From<Success> for Data {
    fn from(success: Success) -> Self {
        let Success { request, resolution, payload } = success;
        let total = (request.total_only || matches!(payload, Payload::Readings(_)))
            .then(|| payload.total());
        let (series, readings) = match payload {
            _ if request.total_only => (None, None),
            Payload::Series(series) => (Some(series), None),
            Payload::Readings(readings) => (None, Some(readings)),
        };
        Self {
            resolution,
            meter: request.meter,
            direction: request.direction,
            balanced: request.balanced,
            period: request.period,
            range: request.range,
            series,
            readings,
            total,
            saved_to: None,
            save: request.save,
        }
    }
}

impl Data {
    /// `<meter>_<direction>[_balanced]_<from>_<to>.json`
    #[must_use]
    pub fn file_name(&self) -> String {
        let meter: String = self
            .meter
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        let balanced = if self.balanced { "_balanced" } else { "" };
        format!(
            "{meter}_{}{balanced}_{}_{}.json",
            self.direction,
            to_iso(self.range.start()),
            to_iso(self.range.end()),
        )
    }
}

impl Envelope {
    /// Assemble the envelope and persist it into `output_dir` when the request asked to.
    ///
    /// A failure to persist turns the whole envelope into an encoding failure.
    pub fn assemble(outcome: Outcome, output_dir: &Path) -> Self {
        let Outcome { identity, attempts, result } = outcome;
        let account = identity.map(|identity| identity.account().to_string());
        let body = match result {
            Ok(success) => Body::Success(Box::new(Data::from(success))),
            Err(failure) => Body::Failure(Problem::from(&failure)),
        };
        let mut envelope = Self { ok: matches!(body, Body::Success(_)), account, body, attempts };
        if let Err(failure) = envelope.save(output_dir) {
            warn!("{failure}");
            envelope.ok = false;
            envelope.body = Body::Failure(Problem::from(&failure));
        }
        envelope
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.body {
            Body::Success(_) => StatusCode::OK,
            Body::Failure(problem) => StatusCode::from_u16(problem.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize the envelope")
    }

    fn save(&mut self, output_dir: &Path) -> Result<(), Failure> {
        let Body::Success(data) = &mut self.body else {
            return Ok(());
        };
        if !data.save {
            return Ok(());
        }
        let path = output_dir.join(data.file_name());
        data.saved_to = Some(path.clone());
        self.write(&path).map_err(Failure::Encoding)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn write(&self, path: &Path) -> Result {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("failed to write `{}`", path.display()))?;
        info!("saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::Value;

    use super::*;
    use crate::{
        api::session::Identity,
        core::{
            attempt::{FetchAttempt, Strategy},
            readings::Reading,
            request::{RawRequest, Request, tests::raw_request},
            series::tests::point,
        },
    };

    fn success(raw: &RawRequest, payload: Payload) -> Result<Outcome> {
        let request = Request::validate(raw, NaiveDate::from_ymd_opt(2025, 10, 19).unwrap())?;
        let mut attempts = Attempts::default();
        attempts.push(
            FetchAttempt::builder()
                .endpoint("/energia/api")
                .status(200)
                .strategy(Strategy::Bulk)
                .bytes(512)
                .direction(Direction::Consumption)
                .build(),
        );
        Ok(Outcome {
            identity: Some(Identity::of("jan.kowalski@example.com")),
            attempts,
            result: Ok(Success { request, resolution: Resolution::Range, payload }),
        })
    }

    fn series() -> Payload {
        Payload::Series(
            [point("2025-08-10", 0, 0.5, "1"), point("2025-08-10", 1, 0.25, "2")]
                .into_iter()
                .collect(),
        )
    }

    fn to_value(envelope: &Envelope) -> Result<Value> {
        Ok(serde_json::from_str(&envelope.to_json()?)?)
    }

    #[test]
    fn success_ok() -> Result {
        let output_dir = tempfile::tempdir()?;
        let envelope = Envelope::assemble(success(&raw_request(), series())?, output_dir.path());
        assert_eq!(envelope.status(), StatusCode::OK);

        let value = to_value(&envelope)?;
        assert_eq!(value["ok"], true);
        assert_eq!(value["account"], Identity::of("jan.kowalski@example.com").account());
        assert_eq!(value["resolution"], "range");
        assert_eq!(value["range"]["from"], "2025-08-10");
        assert_eq!(value["range"]["to"], "2025-08-15");
        assert_eq!(value["series"]["sum"], 0.75);
        assert_eq!(value["attempts"][0]["strategy"], "bulk");
        assert!(value.get("total").is_none());
        assert!(value.get("saved_to").is_none());
        assert!(!envelope.to_json()?.contains("jan.kowalski"));
        Ok(())
    }

    #[test]
    fn total_only_ok() -> Result {
        let raw = RawRequest { total_only: true, ..raw_request() };
        let envelope = Envelope::assemble(success(&raw, series())?, Path::new("unused"));
        let value = to_value(&envelope)?;
        assert_eq!(value["total"], 0.75);
        assert!(value.get("series").is_none());
        Ok(())
    }

    #[test]
    fn readings_total_ok() -> Result {
        let readings = Readings(vec![
            Reading {
                date: NaiveDate::from_ymd_opt(2025, 8, 10).unwrap(),
                value: KilowattHours(100.0),
                zone: None,
            },
            Reading {
                date: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
                value: KilowattHours(112.5),
                zone: None,
            },
        ]);
        let outcome = success(&raw_request(), Payload::Readings(readings))?;
        let envelope = Envelope::assemble(outcome, Path::new("unused"));
        let value = to_value(&envelope)?;
        assert_eq!(value["total"], 12.5);
        assert_eq!(value["readings"][1]["value"], 112.5);
        Ok(())
    }

    #[test]
    fn failure_ok() -> Result {
        let outcome = Outcome {
            identity: None,
            attempts: Attempts::default(),
            result: Err(Failure::InvalidInput(anyhow!("`meter` is required"))),
        };
        let envelope = Envelope::assemble(outcome, Path::new("unused"));
        assert_eq!(envelope.status(), StatusCode::BAD_REQUEST);
        let value = to_value(&envelope)?;
        assert_eq!(value["ok"], false);
        assert_eq!(value["where"], "inputs");
        assert_eq!(value["status"], 400);
        assert!(value["error"].as_str().is_some_and(|error| error.contains("meter")));
        assert!(value.get("account").is_none());
        Ok(())
    }

    #[test]
    fn save_ok() -> Result {
        let output_dir = tempfile::tempdir()?;
        let raw = RawRequest {
            save: true,
            balanced: true,
            meter: Some("59/02 43".to_string()),
            ..raw_request()
        };
        let envelope = Envelope::assemble(success(&raw, series())?, output_dir.path());
        assert!(envelope.ok);

        let path =
            output_dir.path().join("59_02_43_consumption_balanced_2025-08-10_2025-08-15.json");
        let saved: Value = serde_json::from_slice(&fs::read(&path)?)?;
        assert_eq!(saved["series"]["sum"], 0.75);
        assert_eq!(to_value(&envelope)?["saved_to"], path.display().to_string());
        Ok(())
    }

    #[test]
    fn save_failure_is_encoding_failure() -> Result {
        let output_dir = tempfile::tempdir()?;
        let blocker = output_dir.path().join("blocker");
        fs::write(&blocker, "not a directory")?;
        let raw = RawRequest { save: true, ..raw_request() };

        let envelope = Envelope::assemble(success(&raw, series())?, &blocker);
        assert!(!envelope.ok);
        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(to_value(&envelope)?["where"], "encode");
        Ok(())
    }
}
