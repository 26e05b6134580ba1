//! `odlm` — command-line host for the oscillatory dynamic link matching
//! spiking segmentation simulator.
//!
//! Wires together image loading, configuration, and the `odlm-core`
//! simulator; none of the algorithms live here.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod error;
mod image_io;
mod report;

use commands::OdlmCli;
use error::CliResult;

fn main() -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Diagnostics go to stderr so stdout stays clean for `--json`/report
    // output that a host might pipe into another tool.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // odlm-core logs through `log`; bridge it into the same tracing stream
    // so one binary emits one coherent diagnostic feed.
    tracing_log::LogTracer::init().ok();

    let cli = OdlmCli::parse();
    if let Err(err) = cli.execute() {
        error!("{err}");
        std::process::exit(1);
    }
    Ok(())
}
