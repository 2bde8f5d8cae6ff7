use serde::Deserialize;
use std::fmt;

/// Token counts reported for one API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CallUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Running totals for every successful call made through one oracle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub api_calls: u64,
}

impl TokenUsage {
    /// Counts one successful call. Calls without a usage report add no tokens.
    pub fn record(&mut self, call: Option<CallUsage>) {
        if let Some(call) = call {
            self.prompt_tokens += call.prompt_tokens;
            self.completion_tokens += call.completion_tokens;
            self.total_tokens += call.prompt_tokens + call.completion_tokens;
        }
        self.api_calls += 1;
    }

    pub fn cost(&self, pricing: &Pricing) -> f64 {
        (self.prompt_tokens as f64 * pricing.prompt_per_million
            + self.completion_tokens as f64 * pricing.completion_per_million)
            / 1_000_000.0
    }
}

impl fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} prompt + {} completion = {} tokens over {} API calls",
            self.prompt_tokens, self.completion_tokens, self.total_tokens, self.api_calls
        )
    }
}

/// Price per million tokens, in whatever currency the caller bills in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub prompt_per_million: f64,
    pub completion_per_million: f64,
}
