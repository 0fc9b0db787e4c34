//! Replay a recorded network message log through the inspector.
//!
//! Each input line is one JSON message `{"method": ..., "params": ...}`.
//!
//! Usage:
//! ```
//! cargo run --bin network_replay -- --input traffic.jsonl --curl --snapshot session.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use network_inspector_core::api::{MessageEnvelope, NetworkConfig, NetworkPlugin, NoopClient};
use network_inspector_core::export::{
    convert_request_to_curl_command, format_bytes, format_duration,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::FmtSubscriber;

struct Args {
    input: PathBuf,
    config: NetworkConfig,
    curl: bool,
    snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = parse_args()?;

    let contents = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("reading {:?}", args.input))?;

    let mut plugin = NetworkPlugin::new(args.config, Arc::new(NoopClient))?;
    plugin.on_connect().await;

    let mut count = 0usize;
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<MessageEnvelope>(line) {
            Ok(envelope) => {
                plugin.handle_message(envelope);
                count += 1;
            }
            Err(err) => tracing::warn!("Skipping line {}: {}", line_no + 1, err),
        }
    }
    tracing::info!(
        "Replayed {} messages into {} requests ({} responses pending)",
        count,
        plugin.requests().len(),
        plugin.state().partial_responses.len()
    );

    for request in plugin.requests().iter() {
        if args.curl {
            println!("{}", convert_request_to_curl_command(request));
            continue;
        }
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            request.id,
            request.method,
            request.status.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
            request.domain,
            request.response_length.map(format_bytes).unwrap_or_default(),
            request.duration.map(format_duration).unwrap_or_default(),
        );
    }

    if let Some(path) = args.snapshot {
        plugin.save_state_to_path(&path).await?;
        tracing::info!("Saved session to {:?}", path);
    }
    Ok(())
}

fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(LevelFilter::INFO)
        .with_writer(std::io::stderr) // stdout carries the report
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut input = None;
    let mut config = NetworkConfig::default();
    let mut curl = false;
    let mut snapshot = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--input" => input = args.next().map(PathBuf::from),
            "--app-id" => {
                if let Some(app_id) = args.next() {
                    config.app_id = app_id;
                }
            }
            "--storage-path" => {
                if let Some(path) = args.next() {
                    config.storage_path = PathBuf::from(path);
                }
            }
            "--curl" => curl = true,
            "--snapshot" => snapshot = args.next().map(PathBuf::from),
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(2);
            }
        }
    }

    let input = input.context("--input <log.jsonl> is required")?;
    Ok(Args {
        input,
        config,
        curl,
        snapshot,
    })
}

fn print_usage() {
    eprintln!(
        "Usage: network_replay --input <log.jsonl> [--app-id <id>] [--storage-path <dir>] [--curl] [--snapshot <out.json>]"
    );
}
