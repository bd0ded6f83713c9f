//! unimem CLI: command-line access to the unified memory client.
//!
//! Every command builds a router from `~/.unimem/config.toml` (or `--config`),
//! runs one operation and prints the result.

mod cli;
mod ui;

use crate::cli::*;
use clap::Parser;
use serde::Serialize;
use tracing::debug;
use unimem_client::{load_config, UnifiedMemoryClient};
use unimem_types::options::{RequestOptions, SearchOptions};
use unimem_types::{MemoryError, MemoryResult, SourcedResult};

fn init_tracing_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing_stderr();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            ui::error(&format!("Failed to start async runtime: {e}"));
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(cli)) {
        ui::error(&e.to_string());
        if let MemoryError::UnavailableSource { .. } = e {
            ui::hint("check [flags] and the platform API key in your config");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> MemoryResult<()> {
    let config = load_config(cli.config.as_deref());
    let client = UnifiedMemoryClient::from_config(&config)?;

    debug!(
        available = ?client.available_sources(),
        requested = ?cli.source,
        "Client ready"
    );

    let mut opts = RequestOptions::new();
    opts.source = cli.source;
    opts.user_id = cli.user.clone();
    if let Some(agent) = cli.agent.clone() {
        opts = opts.with_agent(agent);
    }
    let json = cli.json;

    match cli.command {
        Commands::List {
            page,
            size,
            category,
        } => {
            let mut opts = opts.with_page(page, size);
            if !category.is_empty() {
                opts = opts.with_categories(category);
            }
            let result = client.get_memories(&opts).await?;
            output(json, &result, |r| {
                ui::page(&r.data);
                ui::served_by(r.source, r.fell_back);
            })
        }
        Commands::Get { id } => {
            let result = client.get_memory_by_id(&id, &opts).await?;
            output(json, &result, |r| {
                ui::memory_detail(&r.data);
                ui::served_by(r.source, r.fell_back);
            })
        }
        Commands::Add { text, no_infer } => {
            opts.infer = Some(!no_infer);
            let result = client.create_memory(&text, &opts).await?;
            output(json, &result, |r| {
                if r.data.is_empty() {
                    ui::check_warn("nothing new was extracted");
                }
                for memory in &r.data {
                    ui::check_ok(&format!("stored {}", memory.id));
                    ui::memory_line(memory);
                }
                ui::served_by(r.source, r.fell_back);
            })
        }
        Commands::Search {
            query,
            limit,
            threshold,
        } => {
            let mut search = SearchOptions::new().with_request(opts);
            search.limit = limit;
            search.threshold = threshold;
            let result = client.search_memories(&query, &search).await?;
            output(json, &result, |r| {
                if r.data.is_empty() {
                    ui::hint("no matches");
                }
                for memory in &r.data {
                    ui::memory_line(memory);
                }
                ui::served_by(r.source, r.fell_back);
            })
        }
        Commands::Update { id, text } => {
            let result = client.update_memory(&id, &text, &opts).await?;
            output(json, &result, |r| {
                ui::check_ok(&format!("updated {}", r.data.id));
                ui::served_by(r.source, r.fell_back);
            })
        }
        Commands::Delete { ids } => {
            let result: SourcedResult<()> = client.delete_memories(&ids, &opts).await?;
            let summary = result.map(|_| ids.clone());
            output(json, &summary, |r| {
                for id in &r.data {
                    ui::check_ok(&format!("deleted {id}"));
                }
                ui::served_by(r.source, r.fell_back);
            })
        }
        Commands::History { id } => {
            let platform = client.platform().ok_or_else(|| MemoryError::UnavailableSource {
                backend: unimem_types::MemorySource::Platform,
                reason: "history needs a configured platform backend".to_string(),
            })?;
            let entries = platform.history(&id).await?;
            output(json, &entries, |e| ui::history(e))
        }
        Commands::Flags => {
            let flags = client.feature_flags();
            let available = client.available_sources();
            output(
                json,
                &serde_json::json!({ "flags": flags, "available_sources": available }),
                |_| {
                    ui::section("Feature flags");
                    ui::kv("Local", &flags.enable_local.to_string());
                    ui::kv("Platform", &flags.enable_platform.to_string());
                    ui::kv("Default", flags.default_source.as_str());
                    ui::kv("Fallback", &flags.enable_auto_fallback.to_string());
                    ui::kv("Caching", &flags.enable_caching.to_string());
                    ui::kv("Telemetry", &flags.enable_telemetry.to_string());
                    let names: Vec<&str> = available.iter().map(|s| s.as_str()).collect();
                    ui::kv("Available", &names.join(", "));
                },
            )
        }
        Commands::Health => {
            let report = client.health_check().await;
            output(json, &report, |report| {
                ui::section("Backends");
                for backend in report {
                    let label = format!(
                        "{}{}",
                        backend.source,
                        if backend.available { "" } else { " (disabled)" }
                    );
                    match &backend.error {
                        None => ui::check_ok(&label),
                        Some(err) => ui::check_fail(&format!("{label}: {err}")),
                    }
                }
            })
        }
    }
}

/// Print `value` as pretty JSON, or hand it to `pretty` for formatted output.
fn output<T: Serialize>(json: bool, value: &T, pretty: impl FnOnce(&T)) -> MemoryResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        pretty(value);
    }
    Ok(())
}
