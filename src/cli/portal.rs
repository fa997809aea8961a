use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use reqwest::Url;

use crate::{
    api::{portal::Endpoints, session::FileSessionStore},
    pipeline::{Pipeline, Settings},
};

#[derive(Parser)]
pub struct PortalArgs {
    /// eLicznik service base URL.
    #[clap(
        long = "service-url",
        default_value = Endpoints::DEFAULT_SERVICE_URL,
        env = "ELICZNIK_SERVICE_URL"
    )]
    pub service_url: Url,

    /// Login form URL.
    #[clap(
        long = "login-url",
        default_value = Endpoints::DEFAULT_LOGIN_URL,
        env = "ELICZNIK_LOGIN_URL"
    )]
    pub login_url: Url,

    /// Pause between per-day requests.
    #[clap(long = "throttle-millis", default_value = "120", env = "ELICZNIK_THROTTLE_MILLIS")]
    pub throttle_millis: u64,

    /// Timeout of each portal request.
    #[clap(long = "timeout-secs", default_value = "30", env = "ELICZNIK_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Directory with the persisted portal sessions, one file per login.
    #[clap(long = "session-dir", default_value = ".sessions", env = "ELICZNIK_SESSION_DIR")]
    pub session_dir: PathBuf,

    /// Directory for the saved results.
    #[clap(long = "output-dir", default_value = "output", env = "ELICZNIK_OUTPUT_DIR")]
    pub output_dir: PathBuf,
}

impl PortalArgs {
    pub fn pipeline(&self) -> Pipeline {
        let settings = Settings::builder()
            .endpoints(Endpoints {
                service: self.service_url.clone(),
                login: self.login_url.clone(),
            })
            .throttle(Duration::from_millis(self.throttle_millis))
            .timeout(Duration::from_secs(self.timeout_secs))
            .build();
        Pipeline::new(settings, Arc::new(FileSessionStore::new(&self.session_dir)))
    }
}
