mod fetch;
mod portal;
mod serve;

use clap::{Parser, Subcommand};

pub use self::{fetch::fetch, serve::serve};
use crate::cli::{fetch::FetchArgs, serve::ServeArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch the data once and print the envelope.
    #[clap(name = "fetch")]
    Fetch(Box<FetchArgs>),

    /// Serve the data over HTTP.
    #[clap(name = "serve")]
    Serve(Box<ServeArgs>),
}
