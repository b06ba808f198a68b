//! One-shot entrypoint: raw log on stdin, one response envelope line on stdout.
//!
//! Exit status is 0 when the envelope reports success, 1 otherwise.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use tokio_util::sync::CancellationToken;

use log_analyzer::{reasoning, telemetry, AnalysisRequest, AnalysisResponse, Analyzer, Config};

#[tokio::main]
async fn main() -> ExitCode {
  let config = match Config::from_env() {
    Ok(c) => c,
    Err(e) => return emit(&AnalysisResponse::failed(e.to_string())),
  };
  telemetry::init_stderr(&config.logging);

  let mut raw = String::new();
  if let Err(e) = io::stdin().read_to_string(&mut raw) {
    return emit(&AnalysisResponse::failed(format!("read stdin: {}", e)));
  }

  let analyzer = match reasoning::from_config(&config.reasoning)
    .and_then(|client| Analyzer::from_config(&config, client))
  {
    Ok(a) => a,
    Err(e) => return emit(&AnalysisResponse::failed(e.to_string())),
  };

  let cancel = CancellationToken::new();
  let timer = {
    let cancel = cancel.clone();
    let timeout = config.server.request_timeout;
    tokio::spawn(async move {
      tokio::time::sleep(timeout).await;
      cancel.cancel();
    })
  };
  let response = analyzer.analyze(&cancel, &AnalysisRequest::new(raw)).await;
  timer.abort();

  emit(&response)
}

fn emit(response: &AnalysisResponse) -> ExitCode {
  let stdout = io::stdout();
  let mut out = stdout.lock();
  if serde_json::to_writer(&mut out, response).is_err() || writeln!(out).is_err() {
    return ExitCode::FAILURE;
  }
  let _ = out.flush();
  if response.success {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  }
}
