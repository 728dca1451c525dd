//! Fourplay server binary.
//!
//! Listens on `0.0.0.0:$PORT` (default 8001). Log verbosity follows
//! `RUST_LOG`, defaulting to `info`.

use fourplay::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 8001;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = match std::env::var("PORT") {
        Ok(value) => value.parse::<u16>()?,
        Err(_) => DEFAULT_PORT,
    };

    let server = FourplayServerBuilder::new()
        .bind(&format!("0.0.0.0:{port}"))
        .build()
        .await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run_until(shutdown_signal()).await?;
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
