use gateway_usage_adapter::http_server;
use gateway_usage_adapter::sink::{HttpSink, SinkOptions, UsageSink};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_RULES: &str = "include debug";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = SinkOptions {
        url: std::env::var("USAGE_LOGGERS_URL").unwrap_or_default(),
        rules: std::env::var("USAGE_LOGGERS_RULES").unwrap_or_else(|_| DEFAULT_RULES.to_string()),
    };
    // A missing or bad destination is fatal at startup, never per-request.
    let sink: Arc<dyn UsageSink> = match HttpSink::new(options) {
        Ok(sink) => Arc::new(sink),
        Err(err) => {
            tracing::error!(error = %err, "cannot initialize usage logger; set USAGE_LOGGERS_URL");
            return ExitCode::FAILURE;
        }
    };

    let port = std::env::var("LISTEN_PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(port, error = %err, "failed to bind webhook listener");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(port, "listening for gateway transaction events");
    if let Err(err) = http_server::serve(listener, sink).await {
        tracing::error!(error = %err, "webhook server exited");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
