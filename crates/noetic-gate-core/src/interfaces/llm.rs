// noetic-gate-core/src/interfaces/llm.rs
// ============================================================================
// Module: LLM Client Contract
// Description: The opaque `complete(system, user) -> text` capability every
//              layer adapter invokes.
// Purpose: Keep the concrete model/provider entirely outside the core (§1);
//          the core only ever depends on this trait.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! §6.1 treats the LLM client as an external collaborator: a
//! `complete(system_prompt, user_message, options) -> text` capability with
//! retry behavior and token-usage telemetry. The core never talks to a
//! concrete provider; it only ever holds a `dyn LlmClient`.

use thiserror::Error;

/// Options controlling a single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmOptions {
    /// Model identifier, interpreted by the concrete client.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens the completion may generate.
    pub max_tokens: u32,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            model: "default".to_owned(),
            temperature: 0.0,
            max_tokens: 2048,
        }
    }
}

/// Token usage reported by a single completion call, used by the ledger to
/// charge the episode's token budget (§6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u64,
    /// Tokens consumed by the completion.
    pub completion_tokens: u64,
    /// `prompt_tokens + completion_tokens`.
    pub total_tokens: u64,
}

/// Retry policy applied around a completion call (§6.1).
///
/// Defaults are host-overridable, not hardwired into the core: `max_retries
/// = 3`, base delay doubling per attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first failure.
    pub max_retries: u32,
    /// Base delay before the first retry; doubles on each subsequent attempt.
    pub base_retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay, in milliseconds, before the given retry attempt
    /// (0-indexed: the delay before the first retry).
    #[must_use]
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        self.base_retry_delay_ms.saturating_mul(1u64 << attempt.min(32))
    }
}

/// Errors raised by an [`LlmClient`] completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The call timed out; retryable.
    #[error("llm completion timed out")]
    Timeout,
    /// The provider rate-limited this call; retryable.
    #[error("llm completion rate limited")]
    RateLimited,
    /// A transient provider-side failure; retryable.
    #[error("llm provider error: {0}")]
    Transient(String),
    /// A non-retryable failure (bad request, auth failure, ...).
    #[error("llm completion failed: {0}")]
    NonRetryable(String),
    /// All retry attempts were exhausted (§4.7: the layer emits zero packets).
    #[error("llm completion exhausted {attempts} retr{ies}")]
    RetriesExhausted {
        /// Number of attempts made, including the first.
        attempts: u32,
        /// Grammar helper so the message reads correctly at `attempts == 1`.
        ies: &'static str,
    },
}

impl LlmError {
    /// Whether this failure is transient and worth retrying (§6.1).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited | Self::Transient(_))
    }
}

/// The opaque LLM completion capability every layer adapter invokes.
///
/// Implementations must retry transient failures with exponential backoff up
/// to a bounded number of attempts, and report token usage via `usage`
/// before returning so the ledger can charge the episode's token budget.
pub trait LlmClient: Send + Sync {
    /// Completes a single prompt.
    ///
    /// # Errors
    /// Returns [`LlmError::RetriesExhausted`] when every retry attempt fails,
    /// or [`LlmError::NonRetryable`] immediately on a non-transient failure.
    fn complete(&self, system_prompt: &str, user_message: &str, options: &LlmOptions, usage: &mut dyn FnMut(TokenUsage)) -> Result<String, LlmError>;
}
