// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::debug;

use openspend::config::{Cli, LogFormat};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);
    let _ = rustls::crypto::ring::default_provider().install_default();

    let outcome = tokio::select! {
        result = openspend::command::run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            debug!("interrupted");
            Err(anyhow::anyhow!("interrupted"))
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match cli.log_format {
        LogFormat::Json => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        LogFormat::Text => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}
