// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfwerk — text-preserving PDF compression service.
//
// Entry point. Initialises logging, loads the configuration and runs the HTTP
// server until Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;

use pdfwerk_core::config::CONFIG_ENV;
use pdfwerk_core::error::Result;
use pdfwerk_core::AppConfig;
use pdfwerk_server::CompressServer;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("pdfwerk starting");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "pdfwerk exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = load_config()?;
    let mut server = CompressServer::new(config);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    server.stop().await
}

/// Config path from the first argument, else `PDFWERK_CONFIG`. Without either
/// the defaults are used.
fn load_config() -> Result<AppConfig> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    match path {
        Some(path) => {
            let config = AppConfig::load(&path)?;
            tracing::info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => {
            tracing::info!("no configuration file given, using defaults");
            Ok(AppConfig::default())
        }
    }
}
