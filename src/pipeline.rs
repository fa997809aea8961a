use std::{sync::Arc, time::Duration};

use bon::Builder;
use chrono::NaiveDate;

use crate::{
    api::{
        portal::{Endpoints, Fetched, Fetcher, Portal},
        session::{CookieJar, Identity, SessionStore},
    },
    core::{
        attempt::{Attempts, Resolution},
        failure::Failure,
        payload::Payload,
        request::{RawRequest, Request},
        series::balance,
    },
    prelude::*,
};

#[derive(Clone, Builder)]
pub struct Settings {
    pub endpoints: Endpoints,

    /// Pause between per-day requests.
    pub throttle: Duration,

    /// Timeout of each HTTP request.
    pub timeout: Duration,
}

/// Drives one request from the raw parameters to the data.
pub struct Pipeline {
    settings: Settings,
    store: Arc<dyn SessionStore>,
}

/// Result of one request together with everything that was tried on the way.
#[must_use]
pub struct Outcome {
    /// Absent only when no login was supplied.
    pub identity: Option<Identity>,

    pub attempts: Attempts,
    pub result: Result<Success, Failure>,
}

#[must_use]
#[derive(Debug)]
pub struct Success {
    pub request: Request,
    pub resolution: Resolution,
    pub payload: Payload,
}

impl Pipeline {
    pub fn new(settings: Settings, store: Arc<dyn SessionStore>) -> Self {
        Self { settings, store }
    }

    pub async fn run(&self, raw: &RawRequest, today: NaiveDate) -> Outcome {
        let identity = raw
            .login
            .as_deref()
            .map(str::trim)
            .filter(|login| !login.is_empty())
            .map(Identity::of);
        let mut attempts = Attempts::default();
        let result = self.try_run(raw, today, &mut attempts).await;
        let n_attempts = attempts.len();
        match &result {
            Ok(success) => info!(resolution = %success.resolution, n_attempts, "succeeded"),
            Err(failure) => warn!(stage = ?failure.stage(), n_attempts, "{failure}"),
        }
        Outcome { identity, attempts, result }
    }

    async fn try_run(
        &self,
        raw: &RawRequest,
        today: NaiveDate,
        attempts: &mut Attempts,
    ) -> Result<Success, Failure> {
        let request = Request::validate(raw, today)?;
        let identity = Identity::of(&request.credentials.login);

        let portal = CookieJar::load(identity, Arc::clone(&self.store))
            .and_then(|jar| {
                Portal::new(self.settings.endpoints.clone(), Arc::new(jar), self.settings.timeout)
            })
            .map_err(Failure::Authentication)?;
        portal.warm_up(attempts).await;
        portal.log_in(&request.credentials, attempts).await.map_err(Failure::Authentication)?;
        portal.select_meter(&request.meter, attempts).await.map_err(Failure::MeterSelection)?;

        let fetcher = Fetcher::new(&portal, &request.meter, self.settings.throttle);
        let Fetched { resolution, payload } = if request.balanced {
            let (primary, _) = fetcher
                .fetch_series(request.range, request.direction, attempts)
                .await
                .map_err(Failure::UpstreamFetch)?;
            let (other, _) = fetcher
                .fetch_series(request.range, request.direction.opposite(), attempts)
                .await
                .map_err(Failure::UpstreamFetch)?;
            Fetched {
                resolution: Resolution::Balanced(request.direction),
                payload: Payload::Series(balance(&primary, &other)),
            }
        } else {
            fetcher
                .fetch(request.range, request.direction, true, attempts)
                .await
                .map_err(Failure::UpstreamFetch)?
        };
        Ok(Success { request, resolution, payload })
    }
}
