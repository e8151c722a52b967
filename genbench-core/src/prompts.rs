use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_PROMPTS: [&str; 10] = [
    "What is the capital of France?",
    "Explain quantum computing in simple terms.",
    "Write a short poem about nature.",
    "What are the benefits of exercise?",
    "Describe the water cycle.",
    "What is machine learning?",
    "How does photosynthesis work?",
    "What is the theory of relativity?",
    "Explain blockchain technology.",
    "What are the layers of Earth's atmosphere?",
];

/// Fixed pool of prompts, indexed cyclically by request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PromptSource {
    prompts: Vec<String>,
}

impl PromptSource {
    pub fn new(prompts: Vec<String>) -> Result<Self> {
        if prompts.is_empty() {
            return Err(Error::Config("prompt pool must contain at least one prompt".to_owned()));
        }
        Ok(Self { prompts })
    }

    pub fn prompt_for(&self, index: u64) -> &str {
        let slot = (index % self.prompts.len() as u64) as usize;
        &self.prompts[slot]
    }
}

impl TryFrom<Vec<String>> for PromptSource {
    type Error = Error;

    fn try_from(prompts: Vec<String>) -> Result<Self> {
        Self::new(prompts)
    }
}

impl From<PromptSource> for Vec<String> {
    fn from(source: PromptSource) -> Self {
        source.prompts
    }
}

impl Default for PromptSource {
    fn default() -> Self {
        Self {
            prompts: DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect(),
        }
    }
}
