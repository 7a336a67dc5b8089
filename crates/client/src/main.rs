use anyhow::Context;
use clap::Parser;
use guestcall_host::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEMO_PAYLOADS: [&str; 3] = [
    "{}",
    r#"{"hostname": "localhost", "ipv4": "192.168.13.37"}"#,
    r#"{"hostname": "foobar", "ipv4": "192.168.13.37"}"#,
];

#[derive(Parser)]
struct Cli {
    /// path to the guest wasm
    #[clap(long)]
    wasm: PathBuf,
    /// exported function to call with each payload
    #[clap(long, default_value = "validate_create_host_params")]
    function: String,
    /// give up on a single call after this many milliseconds
    #[clap(long)]
    timeout_ms: Option<u64>,
    /// POST the last payload here as json once it has been validated, e.g.
    /// http://127.0.0.1:3000/hosts
    #[clap(long)]
    backend: Option<String>,
    /// payloads to validate, a few built in ones are used if none are given
    payloads: Vec<String>,
}

impl Cli {
    fn config(&self) -> InvokeConfig {
        match self.timeout_ms {
            Some(ms) => InvokeConfig::default().with_timeout(Duration::from_millis(ms)),
            None => InvokeConfig::default(),
        }
    }

    fn payloads(&self) -> Vec<String> {
        if self.payloads.is_empty() {
            DEMO_PAYLOADS.iter().map(|p| p.to_string()).collect()
        } else {
            self.payloads.clone()
        }
    }
}

/// run every payload through the guest, a host side failure stops everything
fn validate_all(
    wasm: &[u8],
    function: &str,
    payloads: &[String],
    config: &InvokeConfig,
) -> anyhow::Result<Vec<String>> {
    payloads
        .iter()
        .map(|payload| {
            let output = invoke_with_config(wasm, function, payload.as_bytes(), config)
                .with_context(|| format!("validating {payload}"))?;
            let output = String::from_utf8(output).context("guest returned invalid utf8")?;
            tracing::info!(%payload, result = %output, "validated");
            Ok(output)
        })
        .collect()
}

fn post(backend: &str, payload: &str) -> anyhow::Result<()> {
    let response = reqwest::blocking::Client::new()
        .post(backend)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(payload.to_string())
        .send()
        .with_context(|| format!("posting to {backend}"))?;
    let status = response.status();
    let body = response.text().context("reading response body")?;
    tracing::info!(%status, %body, "backend responded");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let wasm = std::fs::read(&cli.wasm)
        .with_context(|| format!("reading guest wasm {}", cli.wasm.display()))?;
    let payloads = cli.payloads();
    validate_all(&wasm, &cli.function, &payloads, &cli.config())?;

    if let (Some(backend), Some(payload)) = (&cli.backend, payloads.last()) {
        post(backend, payload)?;
    }
    Ok(())
}
