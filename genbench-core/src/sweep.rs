use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::TextGenerationClient;
use crate::config::BenchConfig;
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::orchestrator::ConcurrencyOrchestrator;
use crate::stats::{ConcurrencyLevelStats, aggregate};

/// Per-level statistics of one sweep, in ascending level order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub levels: Vec<ConcurrencyLevelStats>,
    /// Set when the sweep was cancelled before every level ran.
    #[serde(default)]
    pub interrupted: bool,
}

impl BenchmarkRun {
    /// True when no level produced a single successful request.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

pub struct BenchmarkSweep {
    config: BenchConfig,
    orchestrator: ConcurrencyOrchestrator,
}

impl BenchmarkSweep {
    /// Validates `config` up front so a bad sweep never starts.
    pub fn new(config: BenchConfig, client: Arc<dyn TextGenerationClient>) -> Result<Self> {
        config.validate()?;
        let executor = RequestExecutor::new(client, &config);
        let orchestrator =
            ConcurrencyOrchestrator::new(executor, config.prompts.clone(), config.max_connections);
        Ok(Self {
            config,
            orchestrator,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Runs every configured level. Levels without a single success are
    /// skipped, they never abort the sweep. `on_level` sees each record as
    /// soon as it is computed.
    pub async fn run<F>(&self, cancel: &CancellationToken, mut on_level: Option<F>) -> BenchmarkRun
    where
        F: FnMut(&ConcurrencyLevelStats),
    {
        let mut run = BenchmarkRun::default();
        let levels = &self.config.concurrency_levels;

        for (idx, &level) in levels.iter().enumerate() {
            info!("Starting level {}/{}: {} concurrent sessions", idx + 1, levels.len(), level);
            let batch = self
                .orchestrator
                .run_batch(level, self.config.requests_per_session, cancel)
                .await;

            match aggregate(&batch.outcomes, level, batch.elapsed_seconds) {
                Some(stats) => {
                    info!(
                        "Level {} -> {}/{} ok, avg {:.3}s, p99 {:.3}s, {:.2} tok/s",
                        level,
                        stats.successful_requests,
                        stats.total_requests,
                        stats.avg_latency,
                        stats.p99_latency,
                        stats.overall_throughput
                    );
                    if let Some(ref mut cb) = on_level {
                        cb(&stats);
                    }
                    run.levels.push(stats);
                }
                None => {
                    warn!(
                        "All {} requests failed at concurrency {}, skipping level",
                        batch.outcomes.len(),
                        level
                    );
                }
            }

            if cancel.is_cancelled() {
                warn!("Sweep cancelled after concurrency level {}", level);
                run.interrupted = true;
                break;
            }

            if idx + 1 < levels.len() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        warn!("Sweep cancelled during cooldown");
                        run.interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.cooldown()) => {}
                }
            }
        }

        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Choice, CompletionRequest, RawResponse, TransportError, Usage};
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Fails the first `fail_first` calls, then succeeds.
    struct FlakyClient {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl FlakyClient {
        fn new(fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail_first,
            })
        }
    }

    #[async_trait]
    impl TextGenerationClient for FlakyClient {
        async fn send(
            &self,
            _request: &CompletionRequest,
            _timeout: Duration,
        ) -> std::result::Result<RawResponse, TransportError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if call < self.fail_first {
                return Err(TransportError::Decode("bad body".into()));
            }
            Ok(RawResponse {
                status: 200,
                usage: Some(Usage {
                    completion_tokens: 12,
                    total_tokens: 20,
                }),
                choices: vec![Choice { text: "ok".into() }],
            })
        }
    }

    fn config(levels: Vec<u64>) -> BenchConfig {
        BenchConfig {
            concurrency_levels: levels,
            cooldown_seconds: 2.0,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fully_failed_level_is_skipped() {
        // Level 1 issues 5 requests, all of which fail.
        let sweep = BenchmarkSweep::new(config(vec![1, 2]), FlakyClient::new(5)).unwrap();

        let run = sweep
            .run(&CancellationToken::new(), None::<fn(&ConcurrencyLevelStats)>)
            .await;

        assert!(!run.is_empty());
        assert!(!run.interrupted);
        assert_eq!(run.levels.len(), 1);
        let level = &run.levels[0];
        assert_eq!(level.concurrency_level, 2);
        assert_eq!(level.total_requests, 10);
        assert_eq!(level.successful_requests, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn all_levels_failing_yields_empty_run() {
        let sweep = BenchmarkSweep::new(config(vec![1, 2]), FlakyClient::new(usize::MAX)).unwrap();
        let run = sweep
            .run(&CancellationToken::new(), None::<fn(&ConcurrencyLevelStats)>)
            .await;
        assert!(run.is_empty());
        assert!(!run.interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_only_between_levels() {
        let sweep = BenchmarkSweep::new(config(vec![1, 2, 4]), FlakyClient::new(0)).unwrap();
        let start = Instant::now();

        let mut seen = Vec::new();
        let run = sweep
            .run(
                &CancellationToken::new(),
                Some(|s: &ConcurrencyLevelStats| seen.push(s.concurrency_level)),
            )
            .await;

        // Three 50ms batches and two 2s pauses.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(4150), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(4200), "elapsed {:?}", elapsed);
        assert_eq!(seen, vec![1, 2, 4]);
        assert_eq!(
            run.levels.iter().map(|l| l.concurrency_level).collect::<Vec<_>>(),
            vec![1, 2, 4]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_sweep() {
        let sweep = BenchmarkSweep::new(config(vec![1, 2, 4]), FlakyClient::new(0)).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let run = sweep
            .run(
                &cancel,
                Some(move |_: &ConcurrencyLevelStats| trigger.cancel()),
            )
            .await;

        assert!(run.interrupted);
        assert_eq!(run.levels.len(), 1);
        assert_eq!(run.levels[0].concurrency_level, 1);
    }

    #[test]
    fn invalid_config_is_rejected_before_running() {
        let result = BenchmarkSweep::new(
            BenchConfig {
                requests_per_session: 0,
                ..Default::default()
            },
            FlakyClient::new(0),
        );
        assert!(matches!(result, Err(Error::Config(_))));

        let result = BenchmarkSweep::new(config(Vec::new()), FlakyClient::new(0));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
