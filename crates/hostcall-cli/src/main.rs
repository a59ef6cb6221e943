//! # hostcall CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Invoke a callable (outputs the response envelope as JSON)
//! hostcall call -t Demo.Math -m Add -p '[{"type":"int","value":2},{"type":"int","value":3}]'
//!
//! # Invoke from a request file and wait for a deferred result
//! hostcall call --request calculate.json --pretty
//!
//! # List what the demo host exposes
//! hostcall types
//! ```
//!
//! Logs go to stderr so stdout stays a single JSON document.

use anyhow::{Context, Result};
use hostcall_cli::cli::{CallArgs, Cli, Commands};
use hostcall_cli::{build_request, demo, describe_registry, read_request};
use hostcall_engine::EngineConfig;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Set default log level to INFO, but allow RUST_LOG env var to override
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Call(args) => call(args).await,
        Commands::Types(_) => {
            for line in describe_registry(&demo::registry(demo::scene())) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

async fn call(args: CallArgs) -> Result<()> {
    let request = match (&args.request, &args.type_name, &args.method) {
        (Some(path), None, None) => read_request(path)?,
        (None, Some(type_name), Some(method)) => {
            build_request(type_name, method, args.params.as_deref())?
        }
        (Some(_), _, _) => anyhow::bail!("--request cannot be combined with --type or --method"),
        _ => anyhow::bail!("either --request or both --type and --method are required"),
    };

    let mut config = EngineConfig::new().with_bare_name_lookup(!args.no_bare_names);
    if let Some(ms) = args.poll_interval_ms {
        config = config.with_poll_interval(Duration::from_millis(ms));
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid engine configuration: {e}"))?;

    tracing::debug!("Dispatching request: {}", request);
    let engine = demo::engine(config);
    let response = engine.handle(&request).await;

    let output = if args.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .context("failed to serialize response envelope")?;
    println!("{output}");
    Ok(())
}
