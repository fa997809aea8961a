use clap::Parser;

use crate::{
    cli::portal::PortalArgs,
    core::{period::portal_today, request::RawRequest},
    envelope::{Body, Envelope},
    prelude::*,
    tables::{build_attempts_table, build_readings_table, build_series_table},
};

#[derive(Parser)]
pub struct FetchArgs {
    #[clap(flatten)]
    pub portal: PortalArgs,

    #[clap(flatten)]
    pub request: RawRequest,

    /// Render tables instead of the JSON envelope.
    #[clap(long)]
    pub table: bool,
}

#[instrument(skip_all)]
pub async fn fetch(args: &FetchArgs) -> Result {
    let outcome = args.portal.pipeline().run(&args.request, portal_today()).await;
    let envelope = Envelope::assemble(outcome, &args.portal.output_dir);

    if args.table {
        if !envelope.attempts.is_empty() {
            println!("{}", build_attempts_table(&envelope.attempts));
        }
        match &envelope.body {
            Body::Success(data) => {
                if let Some(series) = &data.series {
                    println!("{}", build_series_table(series));
                }
                if let Some(readings) = &data.readings {
                    println!("{}", build_readings_table(readings));
                }
                if let Some(total) = data.total {
                    info!(%total, resolution = %data.resolution, "fetched");
                }
            }
            Body::Failure(problem) => {
                error!(stage = ?problem.stage, problem.status, "{}", problem.error);
            }
        }
    } else {
        println!("{}", envelope.to_json()?);
    }

    ensure!(envelope.ok, "the request failed");
    Ok(())
}
