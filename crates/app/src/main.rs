//! VitalSync - fitness tracker metrics collector
//!
//! Loads configuration, makes sure a credential exists, then polls until
//! Ctrl+C.

use std::io::{BufRead, Write};

use anyhow::Context;
use vitalsync_app::utils::{cancel_on_signal, init_logging};
use vitalsync_app::AppContext;
use vitalsync_infra::config;

/// Ask the operator for a refresh token on the terminal.
fn prompt_refresh_token() -> std::io::Result<String> {
    let mut stderr = std::io::stderr();
    write!(stderr, "No stored credential found. Enter a refresh token: ")?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let config = config::load().context("loading configuration")?;
    let _logging = init_logging(&config.storage).context("initialising logging")?;

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(err) => tracing::debug!(error = %err, "no .env file loaded"),
    }

    let ctx = AppContext::new(config).context("wiring application")?;
    ctx.ensure_credential(prompt_refresh_token).await.context("obtaining a credential")?;

    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), ctx.cancel.clone()));

    ctx.run().await;
    Ok(())
}
