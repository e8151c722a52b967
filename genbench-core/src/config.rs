use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::prompts::PromptSource;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/v1";
pub const DEFAULT_MODEL: &str = "TinyLlama/TinyLlama-1.1B-Chat-v1.0";
pub const DEFAULT_CONCURRENCY_LEVELS: [u64; 5] = [1, 2, 4, 8, 16];
pub const DEFAULT_REQUESTS_PER_SESSION: u64 = 5;
pub const DEFAULT_COOLDOWN_SECS: f64 = 2.0;
pub const DEFAULT_MAX_TOKENS: u32 = 100;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// Everything a sweep needs, passed explicitly instead of read from globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Base URL of the OpenAI-compatible API, e.g. `http://host:8000/v1`.
    pub endpoint: String,
    pub model: String,
    /// Session counts to test, strictly ascending.
    pub concurrency_levels: Vec<u64>,
    pub requests_per_session: u64,
    /// Pause between levels.
    pub cooldown_seconds: f64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_seconds: u64,
    /// Cap on simultaneously open requests, independent of the level.
    pub max_connections: usize,
    pub prompts: PromptSource,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            concurrency_levels: DEFAULT_CONCURRENCY_LEVELS.to_vec(),
            requests_per_session: DEFAULT_REQUESTS_PER_SESSION,
            cooldown_seconds: DEFAULT_COOLDOWN_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            prompts: PromptSource::default(),
        }
    }
}

impl BenchConfig {
    /// Cooldown between levels. Values `validate` would reject fall back to zero.
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.cooldown_seconds).unwrap_or(Duration::ZERO)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_owned()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".to_owned()));
        }
        if self.concurrency_levels.is_empty() {
            return Err(Error::Config("at least one concurrency level is required".to_owned()));
        }
        if self.concurrency_levels.contains(&0) {
            return Err(Error::Config("concurrency levels must be positive".to_owned()));
        }
        if self.concurrency_levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Config(format!(
                "concurrency levels must be strictly ascending, got {:?}",
                self.concurrency_levels
            )));
        }
        if self.requests_per_session == 0 {
            return Err(Error::Config("requests_per_session must be positive".to_owned()));
        }
        if let Some(&level) = self
            .concurrency_levels
            .iter()
            .find(|&&level| batch_size(level, self.requests_per_session).is_none())
        {
            return Err(Error::Config(format!(
                "concurrency level {} x {} requests per session is too large",
                level, self.requests_per_session
            )));
        }
        if Duration::try_from_secs_f64(self.cooldown_seconds).is_err() {
            return Err(Error::Config(format!(
                "cooldown_seconds must be a non-negative number of seconds, got {}",
                self.cooldown_seconds
            )));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::Config(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        if self.request_timeout_seconds == 0 {
            return Err(Error::Config("request_timeout_seconds must be positive".to_owned()));
        }
        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be positive".to_owned()));
        }
        Ok(())
    }
}

/// Number of requests in one batch, `None` when it cannot be addressed in memory.
pub fn batch_size(concurrency_level: u64, requests_per_session: u64) -> Option<usize> {
    concurrency_level
        .checked_mul(requests_per_session)
        .and_then(|total| usize::try_from(total).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rejected(config: BenchConfig, needle: &str) {
        match config.validate() {
            Err(Error::Config(msg)) => assert!(msg.contains(needle), "unexpected message: {msg}"),
            other => panic!("expected config error containing {needle:?}, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        let config = BenchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.concurrency_levels, vec![1, 2, 4, 8, 16]);
        assert_eq!(config.cooldown(), Duration::from_secs(2));
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn rejects_empty_levels() {
        let config = BenchConfig {
            concurrency_levels: Vec::new(),
            ..Default::default()
        };
        assert_rejected(config, "at least one concurrency level");
    }

    #[test]
    fn rejects_zero_level() {
        let config = BenchConfig {
            concurrency_levels: vec![0, 1],
            ..Default::default()
        };
        assert_rejected(config, "positive");
    }

    #[test]
    fn rejects_unsorted_levels() {
        let config = BenchConfig {
            concurrency_levels: vec![4, 2],
            ..Default::default()
        };
        assert_rejected(config, "strictly ascending");

        let config = BenchConfig {
            concurrency_levels: vec![2, 2],
            ..Default::default()
        };
        assert_rejected(config, "strictly ascending");
    }

    #[test]
    fn rejects_zero_requests_per_session() {
        let config = BenchConfig {
            requests_per_session: 0,
            ..Default::default()
        };
        assert_rejected(config, "requests_per_session");
    }

    #[test]
    fn rejects_negative_cooldown_and_zero_connections() {
        let config = BenchConfig {
            cooldown_seconds: -1.0,
            ..Default::default()
        };
        assert_rejected(config, "cooldown_seconds");

        let config = BenchConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert_rejected(config, "max_connections");
    }

    #[test]
    fn rejects_cooldown_beyond_duration_range() {
        let config = BenchConfig {
            cooldown_seconds: 1e30,
            ..Default::default()
        };
        assert_rejected(config, "cooldown_seconds");

        let config = BenchConfig {
            cooldown_seconds: f64::NAN,
            ..Default::default()
        };
        assert_rejected(config, "cooldown_seconds");
    }

    #[test]
    fn rejects_overflowing_batch() {
        let config = BenchConfig {
            concurrency_levels: vec![1, 1 << 33],
            requests_per_session: 1 << 33,
            ..Default::default()
        };
        assert_rejected(config, "too large");
        assert_eq!(batch_size(1 << 33, 1 << 33), None);
        assert_eq!(batch_size(16, 5), Some(80));
    }

    #[test]
    fn deserializes_partial_document() {
        let config: BenchConfig = serde_json::from_str(
            r#"{"model": "m", "concurrency_levels": [2, 4], "prompts": ["hi"]}"#,
        )
        .unwrap();
        assert_eq!(config.model, "m");
        assert_eq!(config.concurrency_levels, vec![2, 4]);
        assert_eq!(config.prompts.prompt_for(7), "hi");
        assert_eq!(config.requests_per_session, DEFAULT_REQUESTS_PER_SESSION);
    }

    #[test]
    fn rejects_empty_prompt_list_on_deserialize() {
        let result: std::result::Result<BenchConfig, _> =
            serde_json::from_str(r#"{"prompts": []}"#);
        assert!(result.is_err());
    }
}
