use reqwest::Url;

use crate::prelude::*;

/// Portal locations, overridable for a test server.
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub service: Url,
    pub login: Url,
}

impl Endpoints {
    pub const DEFAULT_SERVICE_URL: &str = "https://elicznik.tauron-dystrybucja.pl";
    pub const DEFAULT_LOGIN_URL: &str = "https://logowanie.tauron-dystrybucja.pl/login";

    pub fn service_host(&self) -> Result<&str> {
        self.service.host_str().with_context(|| format!("`{}` has no host", self.service))
    }

    /// Whether the URL points to the service host.
    #[must_use]
    pub fn is_service(&self, url: &Url) -> bool {
        url.host_str() == self.service.host_str()
            && url.port_or_known_default() == self.service.port_or_known_default()
    }

    pub fn select_meter(&self) -> Result<Url> {
        self.join("/ustaw_punkt")
    }

    pub fn energy(&self) -> Result<Url> {
        self.join("/energia/api")
    }

    pub fn chart_data(&self) -> Result<Url> {
        self.join("/energia/do/dane")
    }

    pub fn readings(&self) -> Result<Url> {
        self.join("/odczyty/api")
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.service.join(path).with_context(|| format!("failed to join `{path}`"))
    }
}
