use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;

use urban_orchestrator::cli::Args;
use urban_orchestrator::generator::events::{ChannelEventSink, Event};
use urban_orchestrator::{OrchestrationResult, launch, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.into_config()?;
    logging::init(config.verbose);

    let request = args.load_request()?;
    info!(
        zones = request.zones.len(),
        language = config.target_language.display_name(),
        "planning request loaded"
    );

    let output_path = config.output_path.clone();
    let (sink, mut rx) = ChannelEventSink::channel();

    // 事件流：每行一个 JSON
    let printer = tokio::spawn(async move {
        print_line(&json!({"event": "start", "data": {}}));
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let result = launch(config, request, Arc::new(sink)).await;
    printer.await.context("Event printer task failed")?;
    let result = result?;

    print_line(&json!({
        "event": "done",
        "data": {
            "run_id": result.run_id,
            "errors": result.errors.len(),
            "features": result.map_json.len(),
        }
    }));

    write_result(&result, output_path.as_deref())
}

fn print_event(event: &Event) {
    print_line(&json!({"event": event.channel, "data": event.payload}));
}

fn print_line(value: &serde_json::Value) {
    println!("{}", value);
}

fn write_result(result: &OrchestrationResult, path: Option<&std::path::Path>) -> Result<()> {
    let content = serde_json::to_string_pretty(result)?;
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .context(format!("Failed to create output directory: {:?}", parent))?;
            }
            std::fs::write(path, content)
                .context(format!("Failed to write result: {:?}", path))?;
            info!(path = ?path, "result written");
        }
        None => println!("{}", content),
    }
    Ok(())
}
