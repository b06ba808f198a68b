//! HTTP server entrypoint.

use std::process::ExitCode;

use tracing::{error, info, warn};

use log_analyzer::{reasoning, routes, telemetry, Analyzer, AnalyzerError, AppState, Config};

#[tokio::main]
async fn main() -> ExitCode {
  let config = match Config::from_env() {
    Ok(c) => c,
    Err(e) => {
      eprintln!("log-analyzer: {}", e);
      return ExitCode::FAILURE;
    }
  };
  telemetry::init(&config.logging);

  match serve(config).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!(error = %e, "server failed");
      ExitCode::FAILURE
    }
  }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
  let client = reasoning::from_config(&config.reasoning)?;
  let analyzer = Analyzer::from_config(&config, client)?;
  let state = AppState::new(analyzer, config.server.request_timeout);
  let app = routes::router(state, config.server.max_body_bytes);

  let addr = config.server.socket_addr()?;
  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .map_err(|e| AnalyzerError::invalid_config(format!("bind {}: {}", addr, e)))?;
  info!(%addr, "log-analyzer listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("server shut down gracefully");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      warn!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        warn!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => warn!("received Ctrl+C, shutting down"),
    _ = terminate => warn!("received SIGTERM, shutting down"),
  }
}
