use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use genbench_core::{
    DEFAULT_COOLDOWN_SECS, DEFAULT_ENDPOINT, DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, DEFAULT_REQUESTS_PER_SESSION, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TEMPERATURE,
};

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base URL of the OpenAI-compatible API
    #[arg(short, long, env = "VLLM_URL", default_value = DEFAULT_ENDPOINT)]
    pub url: String,

    /// Model identifier sent with every request
    #[arg(short, long, env = "VLLM_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Comma-separated concurrency levels (e.g. "1,2,4,8,16")
    #[arg(short, long, default_value = "1,2,4,8,16")]
    pub levels: String,

    /// Requests issued by each simulated session
    #[arg(short, long, default_value_t = DEFAULT_REQUESTS_PER_SESSION)]
    pub requests_per_session: u64,

    /// Pause between concurrency levels in seconds
    #[arg(long, default_value_t = DEFAULT_COOLDOWN_SECS)]
    pub cooldown: f64,

    /// Maximum tokens to generate per request
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Sampling temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Maximum simultaneously open requests
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// YAML or JSON sweep config; replaces all sweep options above
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory results are written to
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Run id, defaults to the current UTC timestamp
    #[arg(long)]
    pub run_id: Option<String>,

    /// Do not write results to disk
    #[arg(long, default_value_t = false)]
    pub no_save: bool,

    /// Skip the reachability check against `<url>/models`
    #[arg(long, default_value_t = false)]
    pub skip_probe: bool,

    /// Keep probing the server for up to this many seconds
    #[arg(long, default_value_t = 0)]
    pub wait_ready: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

pub fn parse_levels(levels: &str) -> anyhow::Result<Vec<u64>> {
    levels
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<u64>()
                .map_err(|e| anyhow::anyhow!("invalid concurrency level '{}': {}", v, e))
        })
        .collect()
}
