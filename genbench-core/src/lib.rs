mod client;
mod config;
mod error;
mod executor;
mod orchestrator;
mod outcome;
mod prompts;
mod stats;
mod sweep;

pub use client::{
    Choice, CompletionRequest, HttpClient, RawResponse, TextGenerationClient, TransportError, Usage,
    build_client,
};
pub use config::*;
pub use error::*;
pub use executor::RequestExecutor;
pub use orchestrator::{Batch, ConcurrencyOrchestrator};
pub use outcome::RequestOutcome;
pub use prompts::PromptSource;
pub use stats::{ConcurrencyLevelStats, aggregate, percentile};
pub use sweep::{BenchmarkRun, BenchmarkSweep};

pub use tokio_util::sync::CancellationToken;
