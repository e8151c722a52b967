use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use console::style;
use genbench_core::{
    BenchConfig, BenchmarkSweep, CancellationToken, ConcurrencyLevelStats, HttpClient, build_client,
};
use genbench_storage::{RunManifest, Storage};
use indicatif::{ProgressBar, ProgressStyle};
use mimalloc::MiMalloc;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod cli;
mod probe;
mod report;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            match tracing_subscriber::EnvFilter::try_from_default_env() {
                Ok(filter) => filter,
                Err(_) => tracing_subscriber::EnvFilter::new("info"),
            },
        )
        .init();

    let args = cli::Args::parse();
    let config = build_config(&args)?;
    config.validate()?;

    info!(
        "{} v{}: {} @ {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        config.model,
        config.endpoint
    );

    let http = build_client(config.max_connections)?;
    if !args.skip_probe {
        probe::wait_server_ready(&http, &config.endpoint, Duration::from_secs(args.wait_ready)).await?;
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight requests");
            ctrl_c.cancel();
        }
    });

    let sweep = BenchmarkSweep::new(config.clone(), Arc::new(HttpClient::from_client(http)))?;

    let pb = if args.output == cli::OutputFormat::Text {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.blue} [{elapsed_precise}] {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Sweeping levels {:?}", config.concurrency_levels));
        Some(pb)
    } else {
        None
    };

    let pb_clone = pb.clone();
    let output_format = args.output.clone();
    let run = sweep
        .run(
            &cancel,
            Some(move |stats: &ConcurrencyLevelStats| match output_format {
                cli::OutputFormat::Text => {
                    if let Some(pb) = &pb_clone {
                        pb.println(report::level_report(stats));
                        pb.set_message(format!("Level {} done", stats.concurrency_level));
                    }
                }
                cli::OutputFormat::Json => match serde_json::to_string(stats) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize level {}: {}", stats.concurrency_level, e),
                },
            }),
        )
        .await;

    if let Some(pb) = pb {
        pb.set_style(ProgressStyle::default_spinner().template("{msg}")?);
        if run.is_empty() {
            pb.finish_with_message(format!("{} No successful benchmarks completed", style("✘").red()));
        } else {
            pb.finish_with_message(format!("{} Sweep finished", style("✔").green()));
        }
    }

    if run.is_empty() {
        bail!("No successful benchmarks completed");
    }

    if args.output == cli::OutputFormat::Text {
        println!("{}", report::summary_table(&run));
    }

    if !args.no_save {
        let run_id = args
            .run_id
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string());
        let storage = Storage::new(&args.results_dir);
        let existing = storage
            .list_runs()
            .with_context(|| format!("Failed to list runs in {}", storage.base_path().display()))?;
        if existing.contains(&run_id) {
            warn!("Run {} already exists in {}, overwriting", run_id, storage.base_path().display());
        }
        let path = storage
            .save_run(&run_id, &RunManifest::new(&config, &run), &run)
            .with_context(|| format!("Failed to save results for run {}", run_id))?;
        info!("Results saved to {}", path.display());
    }

    Ok(())
}

fn build_config(args: &cli::Args) -> anyhow::Result<BenchConfig> {
    if let Some(path) = &args.config {
        return genbench_storage::load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    Ok(BenchConfig {
        endpoint: args.url.clone(),
        model: args.model.clone(),
        concurrency_levels: cli::parse_levels(&args.levels)?,
        requests_per_session: args.requests_per_session,
        cooldown_seconds: args.cooldown,
        max_tokens: args.max_tokens,
        temperature: args.temperature,
        request_timeout_seconds: args.timeout,
        max_connections: args.max_connections,
        ..Default::default()
    })
}
