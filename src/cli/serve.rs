use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Json,
    Router,
    extract::{RawQuery, State},
    http::StatusCode,
    routing::get,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    cli::portal::PortalArgs,
    core::{attempt::Attempts, failure::Failure, period::portal_today, request::RawRequest},
    envelope::Envelope,
    pipeline::{Outcome, Pipeline},
    prelude::*,
};

#[derive(Parser)]
pub struct ServeArgs {
    #[clap(long, default_value = "0.0.0.0:8080", env = "BIND_ADDRESS")]
    pub bind_address: String,

    /// Upper bound for a whole request, including the per-day fallback.
    #[clap(long = "request-timeout-secs", default_value = "600", env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    #[clap(flatten)]
    pub portal: PortalArgs,
}

struct AppState {
    pipeline: Pipeline,
    output_dir: PathBuf,
}

#[instrument(skip_all, fields(bind_address = %args.bind_address))]
pub async fn serve(args: ServeArgs) -> Result {
    let listener =
        TcpListener::bind(&args.bind_address).await.context("failed to bind to the address")?;
    let state = AppState { pipeline: args.portal.pipeline(), output_dir: args.portal.output_dir };
    let app = Router::new()
        .route("/", get(get_data))
        .with_state(Arc::new(state))
        .layer((
            TraceLayer::new_for_http(),
            TimeoutLayer::new(Duration::from_secs(args.request_timeout_secs)),
        ));

    info!("serving…");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("stopped");
    Ok(())
}

/// Per <https://github.com/tokio-rs/axum/blob/main/examples/graceful-shutdown/src/main.rs>.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {error:#}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!("failed to install the signal handler: {error:#}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[instrument(skip_all)]
async fn get_data(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Json<Envelope>) {
    let outcome = match parse_query(query.as_deref()) {
        Ok(raw) => state.pipeline.run(&raw, portal_today()).await,
        Err(error) => Outcome {
            identity: None,
            attempts: Attempts::default(),
            result: Err(Failure::InvalidInput(error)),
        },
    };
    let envelope = Envelope::assemble(outcome, &state.output_dir);
    (envelope.status(), Json(envelope))
}

fn parse_query(query: Option<&str>) -> Result<RawRequest> {
    serde_qs::from_str(query.unwrap_or_default()).context("malformed query string")
}
