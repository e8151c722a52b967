const PROMPT_EXCERPT_CHARS: usize = 50;
const RESPONSE_EXCERPT_CHARS: usize = 100;

/// Result of a single request attempt. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    request_id: u64,
    prompt_excerpt: String,
    latency_seconds: f64,
    completion_tokens: u64,
    total_tokens: u64,
    tokens_per_second: f64,
    succeeded: bool,
    error_message: Option<String>,
    response_excerpt: Option<String>,
}

impl RequestOutcome {
    pub fn success(
        request_id: u64,
        prompt: &str,
        latency_seconds: f64,
        completion_tokens: u64,
        total_tokens: u64,
        response_text: &str,
    ) -> Self {
        let latency_seconds = sanitize_latency(latency_seconds);
        let tokens_per_second = if latency_seconds > 0.0 {
            completion_tokens as f64 / latency_seconds
        } else {
            0.0
        };
        Self {
            request_id,
            prompt_excerpt: prompt_excerpt(prompt),
            latency_seconds,
            completion_tokens,
            total_tokens,
            tokens_per_second,
            succeeded: true,
            error_message: None,
            response_excerpt: Some(truncate_chars(response_text, RESPONSE_EXCERPT_CHARS)),
        }
    }

    pub fn failure(request_id: u64, prompt: &str, latency_seconds: f64, error: impl Into<String>) -> Self {
        Self {
            request_id,
            prompt_excerpt: prompt_excerpt(prompt),
            latency_seconds: sanitize_latency(latency_seconds),
            completion_tokens: 0,
            total_tokens: 0,
            tokens_per_second: 0.0,
            succeeded: false,
            error_message: Some(error.into()),
            response_excerpt: None,
        }
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn prompt_excerpt(&self) -> &str {
        &self.prompt_excerpt
    }

    pub fn latency_seconds(&self) -> f64 {
        self.latency_seconds
    }

    pub fn completion_tokens(&self) -> u64 {
        self.completion_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn tokens_per_second(&self) -> f64 {
        self.tokens_per_second
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn response_excerpt(&self) -> Option<&str> {
        self.response_excerpt.as_deref()
    }
}

// Negative or non-finite latencies are stored as zero.
fn sanitize_latency(latency_seconds: f64) -> f64 {
    if latency_seconds.is_finite() && latency_seconds > 0.0 {
        latency_seconds
    } else {
        0.0
    }
}

fn prompt_excerpt(prompt: &str) -> String {
    let mut excerpt = truncate_chars(prompt, PROMPT_EXCERPT_CHARS);
    excerpt.push_str("...");
    excerpt
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_owned(),
        None => text.to_owned(),
    }
}
