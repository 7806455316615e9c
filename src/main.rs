//! Command-line front end for the resilient API client.
//!
//! Issues one request through the full pipeline (permission gate, auth,
//! retries, logging) and prints the response or the user-facing notice.
//!
//! ```text
//! api-client --config client.toml GET /canvas/42
//! api-client --token $TOKEN --idempotency-key pay-7 --body '{"amount":5}' POST /payments
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use reqwest::Method;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resilient_api_client::config::{load_config, ClientConfig};
use resilient_api_client::errors::{present, NoticeLevel};
use resilient_api_client::observability::sanitize::sanitize_text;
use resilient_api_client::{ApiClient, ApiRequest, ReqwestTransport};

#[derive(Parser)]
#[command(name = "api-client")]
#[command(about = "Send one request through the resilient API client", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL for relative paths (overrides transport.base_url)
    #[arg(short, long)]
    base_url: Option<String>,

    /// Static bearer token
    #[arg(short, long, env = "API_CLIENT_TOKEN")]
    token: Option<String>,

    /// JSON request body
    #[arg(long)]
    body: Option<String>,

    /// Mark the request safe to retry and send an Idempotency-Key header
    #[arg(long)]
    idempotency_key: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Disable automatic retries for this request
    #[arg(long)]
    no_retry: bool,

    /// HTTP method
    method: String,

    /// Absolute URL or path relative to the base URL
    url: String,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilient_api_client=info,api_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = cli.base_url {
        config.transport.base_url = Some(base_url);
    }

    tracing::debug!(
        max_attempts = config.retry.max_attempts,
        base_url = ?config.transport.base_url,
        "Configuration loaded"
    );

    let transport = ReqwestTransport::new(&config.transport)?;
    let mut builder = ApiClient::builder(Arc::new(transport)).config(config);
    if let Some(token) = cli.token {
        builder = builder.token_getter(Arc::new(move || Some(token.clone())));
    }
    let client = builder.build()?;

    let method = Method::from_bytes(cli.method.to_uppercase().as_bytes())?;
    let mut request = ApiRequest::new(method, cli.url);
    for (key, value) in cli.params {
        request = request.param(key, value);
    }
    if let Some(body) = cli.body {
        request = request.json(serde_json::from_str(&body)?);
    }
    if let Some(key) = cli.idempotency_key {
        request = request.idempotency_key(key);
    }
    if cli.no_retry {
        request = request.retry_override(false);
    }

    match client.execute(request).await {
        Ok(response) => {
            eprintln!(
                "{} ({} attempt{}, correlation id {})",
                response.status,
                response.attempts,
                if response.attempts == 1 { "" } else { "s" },
                response.correlation_id
            );
            match response.json::<Value>() {
                Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                Err(_) => println!("{}", response.text()),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            let notice = present(&error);
            let label = match notice.level {
                NoticeLevel::Warning => "warning",
                NoticeLevel::Error => "error",
            };
            eprintln!("{}: {}: {}", label, notice.title, notice.message);
            for (field, message) in &notice.field_messages {
                eprintln!("  {}: {}", field, message);
            }
            if notice.requires_reauth {
                eprintln!("  (sign in again and retry)");
            }
            eprintln!("  [{}] {}", error.code(), sanitize_text(error.original_error()));
            Ok(ExitCode::FAILURE)
        }
    }
}
