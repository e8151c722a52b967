use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::batch_size;
use crate::executor::RequestExecutor;
use crate::outcome::RequestOutcome;
use crate::prompts::PromptSource;

/// Everything collected for one concurrency level.
#[derive(Debug, Clone)]
pub struct Batch {
    pub outcomes: Vec<RequestOutcome>,
    pub elapsed_seconds: f64,
}

pub struct ConcurrencyOrchestrator {
    executor: RequestExecutor,
    prompts: PromptSource,
    connections: Arc<Semaphore>,
}

impl ConcurrencyOrchestrator {
    pub fn new(executor: RequestExecutor, prompts: PromptSource, max_connections: usize) -> Self {
        Self {
            executor,
            prompts,
            connections: Arc::new(Semaphore::new(max_connections)),
        }
    }

    /// Fires `concurrency_level * requests_per_session` requests at once and
    /// waits for every one of them. Ids run from 0 within the batch.
    pub async fn run_batch(
        &self,
        concurrency_level: u64,
        requests_per_session: u64,
        cancel: &CancellationToken,
    ) -> Batch {
        let Some(size) = batch_size(concurrency_level, requests_per_session) else {
            warn!(
                "Batch of {} x {} requests is too large, nothing sent",
                concurrency_level, requests_per_session
            );
            return Batch {
                outcomes: Vec::new(),
                elapsed_seconds: 0.0,
            };
        };
        let total = size as u64;
        info!(
            "Running batch: {} concurrent sessions x {} requests = {} total",
            concurrency_level, requests_per_session, total
        );

        let specs: Vec<(u64, String)> = (0..total)
            .map(|request_id| (request_id, self.prompts.prompt_for(request_id).to_owned()))
            .collect();

        let mut set = JoinSet::new();
        let start = Instant::now();
        for (request_id, prompt) in specs {
            let executor = self.executor.clone();
            let connections = self.connections.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                // Latency is measured from the moment a connection slot is held.
                let _permit = match connections.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return RequestOutcome::failure(request_id, &prompt, 0.0, "Connection pool closed");
                    }
                };
                executor.execute(&prompt, request_id, &cancel).await
            });
        }

        let mut outcomes = Vec::with_capacity(size);
        let mut join_errors = Vec::new();
        while let Some(res) = set.join_next().await {
            match res {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Request task failed: {}", e);
                    join_errors.push(e.to_string());
                }
            }
        }
        let elapsed_seconds = start.elapsed().as_secs_f64();

        if !join_errors.is_empty() {
            // A crashed task still owes the batch exactly one outcome.
            let seen: BTreeSet<u64> = outcomes.iter().map(RequestOutcome::request_id).collect();
            let reason = format!("Request task failed: {}", join_errors.join("; "));
            for request_id in (0..total).filter(|id| !seen.contains(id)) {
                outcomes.push(RequestOutcome::failure(
                    request_id,
                    self.prompts.prompt_for(request_id),
                    0.0,
                    reason.clone(),
                ));
            }
        }

        info!(
            "Batch finished: {} outcomes in {:.2}s",
            outcomes.len(),
            elapsed_seconds
        );
        Batch {
            outcomes,
            elapsed_seconds,
        }
    }
}
