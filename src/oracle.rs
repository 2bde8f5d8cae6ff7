//! The text-generation oracle that writes each persona's next step.
//!
//! [`Oracle`] wraps a [`ChatBackend`] with retries and token accounting. The backend
//! only knows how to make one request.

pub mod openai;
pub mod usage;

pub use openai::{ClientSettings, OpenAiClient, Provider};
pub use usage::{CallUsage, Pricing, TokenUsage};

use crate::error::{BackendError, OracleError};
use log::{debug, error, info};
use std::cell::Cell;
use std::time::Duration;

pub const SYSTEM_PROMPT: &str = r#"You are participating in a collaborative problem-solving conversation with three distinct personas:

A smart person, who is logical and focused on finding the best solution.
A witty, humorous, and romantic person, who approaches the problem with creativity and charm.
A silly but lovable person, who may appear naive but adds a unique perspective.
The group solves problems by breaking them down into step-by-step tasks, with each person contributing to one step at a time.

You are tasked with role-playing as one of these personas and contributing only your character's response for one step. Here are the guidelines:

Do not respond as the other personas—only speak as the persona assigned for this turn.
Always focus on solving just one step of the problem. Never think or respond beyond a single step.
If, at any point, the information gathered so far is sufficient to directly solve the problem, output the final solution in this format:
"Final answer: [a number]"
Do not include any additional commentary or explanation.
Otherwise, continue contributing to only one step of the solution process based on your persona's unique traits.
"#;

/// One successful response from a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<CallUsage>,
}

///
/// A chat-completion provider that answers a single request.
///
/// Implementations do not retry; [`Oracle`] does.
///
pub trait ChatBackend {
    fn chat(&self, system_prompt: &str, prompt: &str) -> Result<Completion, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

pub struct Oracle {
    backend: Box<dyn ChatBackend>,
    retry: RetryPolicy,
    usage: Cell<TokenUsage>,
}

impl Oracle {
    pub fn new(backend: impl ChatBackend + 'static, retry: RetryPolicy) -> Oracle {
        Oracle {
            backend: Box::new(backend),
            retry,
            usage: Cell::new(TokenUsage::default()),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Completion for `prompt` using the oracle's own retry policy.
    pub fn get_completion(&self, prompt: &str) -> Result<String, OracleError> {
        self.get_completion_with(prompt, self.retry)
    }

    ///
    /// Completion for `prompt`, making up to `retry.max_retries` attempts.
    ///
    /// Waits `retry.retry_delay` between attempts. Token usage is recorded for the
    /// successful attempt only.
    ///
    pub fn get_completion_with(
        &self,
        prompt: &str,
        retry: RetryPolicy,
    ) -> Result<String, OracleError> {
        let max_retries = retry.max_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.backend.chat(SYSTEM_PROMPT, prompt) {
                Ok(completion) => {
                    if let Some(call_usage) = completion.usage {
                        debug!(
                            "API call tokens: {} prompt, {} completion",
                            call_usage.prompt_tokens, call_usage.completion_tokens
                        );
                    }
                    let mut usage = self.usage.get();
                    usage.record(completion.usage);
                    self.usage.set(usage);
                    return Ok(completion.text);
                }
                Err(err) => {
                    error!("Attempt {} failed with error: {}", attempt, err);
                    if attempt >= max_retries {
                        error!("Max retries reached");
                        return Err(OracleError {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    info!("Retrying in {:?}...", retry.retry_delay);
                    std::thread::sleep(retry.retry_delay);
                }
            }
        }
    }

    /// Totals since the oracle was created.
    pub fn token_usage(&self) -> TokenUsage {
        self.usage.get()
    }
}

impl std::fmt::Debug for Oracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracle")
            .field("retry", &self.retry)
            .field("usage", &self.usage.get())
            .finish_non_exhaustive()
    }
}
