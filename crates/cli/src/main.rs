//! affipress CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse arguments**: global flags select the site root, the system
//!    configuration, ledger overrides, `--mock` and the log format.
//! 2. **Wire observability**: `tracing-subscriber` with a text or JSON layer
//!    and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OpenTelemetry OTLP
//!    exporter. Every span and event emitted by the workspace crates flows
//!    through it.
//! 3. **Construct infrastructure**: CSV ledgers, the Markdown article sink,
//!    the site workspace, the text model and the reachability probe are built
//!    here and injected into the orchestrator runs.
//! 4. **Run one command** and print its JSON summary on stdout.

mod args;
mod commands;
mod observability;

use clap::Parser;
use std::process::ExitCode;

use crate::args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let telemetry = observability::init(cli.log_format)?;

    let result = commands::run(&cli).await;

    telemetry.shutdown();
    result
}
