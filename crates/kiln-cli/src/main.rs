//! Kiln CLI
//!
//! Renders Integrations into the Kubernetes resources the operator would apply.

use clap::Parser;
use kiln_common::telemetry::{init_telemetry, TelemetryConfig};

use kiln_cli::{Cli, LogFormat, Result};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        json: cli.log_format == LogFormat::Json,
        ..Default::default()
    })?;

    cli.run()
}
