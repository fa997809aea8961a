mod endpoints;
mod fetcher;
mod response;

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Serialize;

pub use self::{
    endpoints::Endpoints,
    fetcher::{Fetched, Fetcher},
};
use crate::{
    api::session::CookieJar,
    core::{
        attempt::{Attempts, FetchAttempt, Strategy},
        direction::Direction,
        request::Credentials,
    },
    prelude::*,
};

/// Cookie-bearing connection to the portal, owned by one identity.
pub struct Portal {
    client: reqwest::Client,
    jar: Arc<CookieJar>,
    endpoints: Endpoints,
}

impl Portal {
    #[instrument(skip_all, fields(account = %jar.identity()))]
    pub fn new(endpoints: Endpoints, jar: Arc<CookieJar>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .cookie_provider(Arc::clone(&jar))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, jar, endpoints })
    }

    /// Visit the service root to collect the initial cookies.
    ///
    /// The outcome is only recorded, the portal works without it most of the time.
    #[instrument(skip_all, fields(account = %self.jar.identity()))]
    pub async fn warm_up(&self, attempts: &mut Attempts) {
        info!("warming up…");
        let request = self.client.get(self.endpoints.service.clone());
        if let Err(error) = self.call(request, Call::HANDSHAKE, attempts).await {
            warn!("warm-up failed: {error:#}");
        }
    }

    /// Log in, retrying once when the portal does not respond with a success.
    #[instrument(skip_all, fields(account = %self.jar.identity()))]
    pub async fn log_in(&self, credentials: &Credentials, attempts: &mut Attempts) -> Result {
        info!("logging in…");
        let mut result = self.submit_login(credentials, attempts).await;
        if !result.as_ref().is_ok_and(|exchange| exchange.status.as_u16() < 300) {
            warn!("login did not succeed, retrying once…");
            result = self.submit_login(credentials, attempts).await;
        }
        let exchange = result?;
        self.verify_login(&exchange.url)?;
        info!("logged in");
        Ok(())
    }

    async fn submit_login(
        &self,
        credentials: &Credentials,
        attempts: &mut Attempts,
    ) -> Result<Exchange> {
        #[derive(Serialize)]
        struct LoginForm<'a> {
            username: &'a str,
            password: &'a str,
            service: &'a str,
        }

        let form = LoginForm {
            username: &credentials.login,
            password: &credentials.password,
            service: self.endpoints.service.as_str(),
        };
        let request = self.client.post(self.endpoints.login.clone()).form(&form);
        self.call(request, Call::HANDSHAKE, attempts).await
    }

    /// The login only counts when it landed on the service host with a session cookie for it.
    fn verify_login(&self, landing: &Url) -> Result {
        let service_host = self.endpoints.service_host()?;
        ensure!(
            self.endpoints.is_service(landing),
            "landed on `{}` instead of `{}`",
            landing.origin().ascii_serialization(),
            self.endpoints.service.origin().ascii_serialization(),
        );
        let has_cookie = self.jar.has_cookie_for(service_host)
            || self.jar.has_stored_cookie_for(service_host)?;
        ensure!(has_cookie, "no session cookie for `{service_host}`");
        Ok(())
    }

    #[instrument(skip_all, fields(account = %self.jar.identity(), meter = meter))]
    pub async fn select_meter(&self, meter: &str, attempts: &mut Attempts) -> Result {
        #[derive(Serialize)]
        struct SelectMeterForm<'a> {
            #[serde(rename = "site[client]")]
            meter: &'a str,
        }

        info!("selecting the meter…");
        let request =
            self.client.post(self.endpoints.select_meter()?).form(&SelectMeterForm { meter });
        let exchange = self.call(request, Call::HANDSHAKE, attempts).await?;
        ensure!(
            (200..400).contains(&exchange.status.as_u16()),
            "meter selection responded with {}",
            exchange.status,
        );
        Ok(())
    }

    /// Send the request and record the exchange, whatever its outcome.
    #[instrument(skip_all, level = "debug", fields(strategy = ?call.strategy))]
    async fn call(
        &self,
        request: RequestBuilder,
        call: Call,
        attempts: &mut Attempts,
    ) -> Result<Exchange> {
        let request = request.build()?;
        let endpoint = request.url().path().to_string();
        let result = self.execute(request).await;
        debug!(%endpoint, status = ?result.as_ref().map(|exchange| exchange.status).ok());
        attempts.push(
            FetchAttempt::builder()
                .endpoint(endpoint.as_str())
                .maybe_status(result.as_ref().ok().map(|exchange| exchange.status.as_u16()))
                .strategy(call.strategy)
                .bytes(result.as_ref().map_or(0, |exchange| exchange.body.len()))
                .maybe_direction(call.direction)
                .maybe_day(call.day)
                .build(),
        );
        result.with_context(|| format!("failed to call `{endpoint}`"))
    }

    async fn execute(&self, request: reqwest::Request) -> Result<Exchange> {
        let response = self.client.execute(request).await?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.bytes().await?.to_vec();
        Ok(Exchange { status, url, body })
    }
}

/// What the recorded attempt should say about a call.
#[derive(Copy, Clone)]
struct Call {
    strategy: Strategy,
    direction: Option<Direction>,
    day: Option<NaiveDate>,
}

impl Call {
    const HANDSHAKE: Self = Self { strategy: Strategy::None, direction: None, day: None };

    const fn data(strategy: Strategy, direction: Direction) -> Self {
        Self { strategy, direction: Some(direction), day: None }
    }

    const fn on(self, day: NaiveDate) -> Self {
        Self { day: Some(day), ..self }
    }
}

/// Final response after redirects.
struct Exchange {
    status: StatusCode,
    url: Url,
    body: Vec<u8>,
}

impl Exchange {
    fn ensure_ok(self) -> Result<Self> {
        ensure!(
            self.status == StatusCode::OK,
            "`{}` responded with {}",
            self.url.path(),
            self.status,
        );
        Ok(self)
    }
}
